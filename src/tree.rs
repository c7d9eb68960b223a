use std::fmt;

use nalgebra::{Matrix3, Matrix4, Translation3, UnitQuaternion, Vector3};
use serde::Serialize;
use thiserror::Error;

// ─── Local transform ──────────────────────────────────────────────────────────

/// Local translation / rotation / scale of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform {
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl LocalTransform {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn from_translation(translation: Vector3<f32>) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    /// Compose `T * R * S` as a homogeneous matrix.
    pub fn to_matrix(&self) -> Matrix4<f32> {
        let translation_matrix = Translation3::from(self.translation).to_homogeneous();
        let rotation_matrix = self.rotation.to_homogeneous();
        let scale_matrix = Matrix4::new_nonuniform_scaling(&self.scale);
        translation_matrix * rotation_matrix * scale_matrix
    }

    /// Decompose an affine matrix back into TRS.
    ///
    /// Shear cannot be represented and is dropped. A mirrored basis is
    /// expressed as a negative X scale.
    pub fn from_matrix(matrix: &Matrix4<f32>) -> Self {
        let translation = Vector3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);

        let basis_x = Vector3::new(matrix[(0, 0)], matrix[(1, 0)], matrix[(2, 0)]);
        let basis_y = Vector3::new(matrix[(0, 1)], matrix[(1, 1)], matrix[(2, 1)]);
        let basis_z = Vector3::new(matrix[(0, 2)], matrix[(1, 2)], matrix[(2, 2)]);

        let mut scale_x = basis_x.norm();
        let scale_y = basis_y.norm();
        let scale_z = basis_z.norm();

        let mut rot_x = if scale_x > 1e-8 {
            basis_x / scale_x
        } else {
            Vector3::new(1.0, 0.0, 0.0)
        };
        let rot_y = if scale_y > 1e-8 {
            basis_y / scale_y
        } else {
            Vector3::new(0.0, 1.0, 0.0)
        };
        let rot_z = if scale_z > 1e-8 {
            basis_z / scale_z
        } else {
            Vector3::new(0.0, 0.0, 1.0)
        };

        if rot_x.cross(&rot_y).dot(&rot_z) < 0.0 {
            scale_x = -scale_x;
            rot_x = -rot_x;
        }

        let rotation_matrix = Matrix3::from_columns(&[rot_x, rot_y, rot_z]);

        Self {
            translation,
            rotation: UnitQuaternion::from_matrix(&rotation_matrix),
            scale: Vector3::new(scale_x, scale_y, scale_z),
        }
    }
}

// ─── Node arena ───────────────────────────────────────────────────────────────

/// Index of a node inside a [`NodeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("cannot parent node {node} under {parent}: it would create a cycle")]
    Cycle { node: NodeId, parent: NodeId },

    #[error("the tree root {0} cannot be re-parented")]
    RootNotMovable(NodeId),

    #[error("world transform of node {0} is not invertible")]
    SingularTransform(NodeId),
}

#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    local: LocalTransform,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    transform_dirty: bool,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local(&self) -> &LocalTransform {
        &self.local
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// True once the local transform no longer matches what the node was
    /// imported with (created nodes start dirty).
    pub fn is_transform_dirty(&self) -> bool {
        self.transform_dirty
    }
}

/// Position/parent/children tree with a single designated root.
///
/// Nodes are never removed. A node may be detached (no parent while not being
/// the root); detached nodes live in world space.
#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl NodeTree {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node {
                name: root_name.into(),
                local: LocalTransform::identity(),
                parent: None,
                children: Vec::new(),
                transform_dirty: false,
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.nodes.get(id.0).ok_or(TreeError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.nodes.get_mut(id.0).ok_or(TreeError::UnknownNode(id))
    }

    /// Append a node under `parent` with the given local transform.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        local: LocalTransform,
    ) -> Result<NodeId, TreeError> {
        self.node(parent)?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            local,
            parent: Some(parent),
            children: Vec::new(),
            transform_dirty: false,
        });
        self.node_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Add an imported node with no parent (e.g. a glTF node outside the
    /// active scene). Its local transform is taken as-is.
    pub fn add_detached(&mut self, name: impl Into<String>, local: LocalTransform) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            local,
            parent: None,
            children: Vec::new(),
            transform_dirty: false,
        });
        id
    }

    /// Add a node with no parent, placed at `world_position` with identity
    /// rotation and unit scale.
    pub fn create_detached(&mut self, name: impl Into<String>, world_position: Vector3<f32>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            local: LocalTransform::from_translation(world_position),
            parent: None,
            children: Vec::new(),
            transform_dirty: true,
        });
        id
    }

    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), TreeError> {
        self.node_mut(id)?.name = name.into();
        Ok(())
    }

    pub fn world_matrix(&self, id: NodeId) -> Result<Matrix4<f32>, TreeError> {
        let mut node = self.node(id)?;
        let mut world = node.local.to_matrix();
        while let Some(parent) = node.parent {
            node = self.node(parent)?;
            world = node.local.to_matrix() * world;
        }
        Ok(world)
    }

    pub fn world_position(&self, id: NodeId) -> Result<Vector3<f32>, TreeError> {
        let world = self.world_matrix(id)?;
        Ok(Vector3::new(world[(0, 3)], world[(1, 3)], world[(2, 3)]))
    }

    /// True when `ancestor` is `node` itself or lies on its parent chain.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> Result<bool, TreeError> {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return Ok(true);
            }
            current = self.node(id)?.parent;
        }
        Ok(false)
    }

    /// Move `child` under `parent` so that its world transform is unchanged.
    ///
    /// The child is appended as the last sibling. Re-parenting under the
    /// current parent is a no-op and keeps the sibling order.
    pub fn set_parent_keep_world(&mut self, child: NodeId, parent: NodeId) -> Result<(), TreeError> {
        self.node(parent)?;
        if self.node(child)?.parent == Some(parent) {
            return Ok(());
        }
        if child == self.root {
            return Err(TreeError::RootNotMovable(child));
        }
        if self.is_ancestor_or_self(child, parent)? {
            return Err(TreeError::Cycle {
                node: child,
                parent,
            });
        }

        let world = self.world_matrix(child)?;
        let parent_inverse = self
            .world_matrix(parent)?
            .try_inverse()
            .ok_or(TreeError::SingularTransform(parent))?;
        let local = LocalTransform::from_matrix(&(parent_inverse * world));

        if let Some(old_parent) = self.node(child)?.parent {
            self.node_mut(old_parent)?
                .children
                .retain(|sibling| *sibling != child);
        }
        self.node_mut(parent)?.children.push(child);

        let node = self.node_mut(child)?;
        node.parent = Some(parent);
        node.local = local;
        node.transform_dirty = true;
        Ok(())
    }

    /// Move `id` to the first position among its siblings.
    pub fn set_first_sibling(&mut self, id: NodeId) -> Result<(), TreeError> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(());
        };
        let siblings = &mut self.node_mut(parent)?.children;
        siblings.retain(|sibling| *sibling != id);
        siblings.insert(0, id);
        Ok(())
    }

    /// Pre-order depth-first walk starting at (and including) `start`,
    /// children visited in sibling order.
    pub fn depth_first(&self, start: NodeId) -> Result<Vec<NodeId>, TreeError> {
        self.node(start)?;
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id)?.children.iter().rev().copied());
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vector3<f32>, b: Vector3<f32>) {
        assert!((a - b).norm() < 1e-4, "expected {b:?}, got {a:?}");
    }

    fn rotated_parent_tree() -> (NodeTree, NodeId, NodeId) {
        let mut tree = NodeTree::new("Avatar");
        let parent = tree
            .add_child(
                tree.root(),
                "Armature",
                LocalTransform {
                    translation: Vector3::new(1.0, 0.0, 0.0),
                    rotation: UnitQuaternion::from_euler_angles(0.0, 0.0, 0.7),
                    scale: Vector3::new(2.0, 2.0, 2.0),
                },
            )
            .expect("root exists");
        let child = tree
            .add_child(
                parent,
                "Hips",
                LocalTransform::from_translation(Vector3::new(0.0, 0.5, 0.0)),
            )
            .expect("parent exists");
        (tree, parent, child)
    }

    #[test]
    fn given_rotated_and_scaled_parent_when_reparenting_then_world_transform_is_kept() {
        let (mut tree, _, child) = rotated_parent_tree();
        let target = tree.create_detached("Target", Vector3::new(-3.0, 1.0, 2.0));
        tree.set_parent_keep_world(target, tree.root()).expect("attach");

        let before = tree.world_matrix(child).expect("world");
        tree.set_parent_keep_world(child, target).expect("reparent");
        let after = tree.world_matrix(child).expect("world");

        assert!((before - after).norm() < 1e-4);
        assert_eq!(tree.node(child).expect("node").parent(), Some(target));
        assert!(tree.node(child).expect("node").is_transform_dirty());
    }

    #[test]
    fn given_detached_node_when_created_then_world_position_is_requested_position() {
        let mut tree = NodeTree::new("Avatar");
        let node = tree.create_detached("Spine", Vector3::new(0.0, 1.2, 0.1));

        assert_close(
            tree.world_position(node).expect("world"),
            Vector3::new(0.0, 1.2, 0.1),
        );
        assert_eq!(tree.node(node).expect("node").parent(), None);
    }

    #[test]
    fn given_descendant_as_parent_when_reparenting_then_cycle_is_rejected() {
        let (mut tree, parent, child) = rotated_parent_tree();

        let result = tree.set_parent_keep_world(parent, child);

        assert_eq!(
            result,
            Err(TreeError::Cycle {
                node: parent,
                parent: child
            })
        );
    }

    #[test]
    fn given_root_when_reparenting_then_error_is_returned() {
        let (mut tree, parent, _) = rotated_parent_tree();
        let root = tree.root();

        assert_eq!(
            tree.set_parent_keep_world(root, parent),
            Err(TreeError::RootNotMovable(root))
        );
    }

    #[test]
    fn given_same_parent_when_reparenting_then_sibling_order_is_kept() {
        let mut tree = NodeTree::new("Avatar");
        let root = tree.root();
        let a = tree.add_child(root, "A", LocalTransform::identity()).expect("a");
        let b = tree.add_child(root, "B", LocalTransform::identity()).expect("b");

        tree.set_parent_keep_world(a, root).expect("no-op");

        assert_eq!(tree.node(root).expect("root").children(), &[a, b]);
        assert!(!tree.node(a).expect("a").is_transform_dirty());
    }

    #[test]
    fn given_last_child_when_setting_first_sibling_then_it_moves_to_front() {
        let mut tree = NodeTree::new("Avatar");
        let root = tree.root();
        let a = tree.add_child(root, "A", LocalTransform::identity()).expect("a");
        let b = tree.add_child(root, "B", LocalTransform::identity()).expect("b");
        let c = tree.add_child(root, "C", LocalTransform::identity()).expect("c");

        tree.set_first_sibling(c).expect("move");

        assert_eq!(tree.node(root).expect("root").children(), &[c, a, b]);
    }

    #[test]
    fn given_nested_tree_when_walking_depth_first_then_pre_order_is_returned() {
        let mut tree = NodeTree::new("Avatar");
        let root = tree.root();
        let a = tree.add_child(root, "A", LocalTransform::identity()).expect("a");
        let a1 = tree.add_child(a, "A1", LocalTransform::identity()).expect("a1");
        let b = tree.add_child(root, "B", LocalTransform::identity()).expect("b");
        let a2 = tree.add_child(a, "A2", LocalTransform::identity()).expect("a2");

        assert_eq!(
            tree.depth_first(root).expect("walk"),
            vec![root, a, a1, a2, b]
        );
    }

    #[test]
    fn given_mirrored_matrix_when_decomposing_then_round_trip_matches() {
        let source = LocalTransform {
            translation: Vector3::new(0.2, -0.4, 1.0),
            rotation: UnitQuaternion::from_euler_angles(0.3, -0.2, 0.9),
            scale: Vector3::new(-1.5, 0.5, 2.0),
        };

        let rebuilt = LocalTransform::from_matrix(&source.to_matrix());

        assert!((rebuilt.to_matrix() - source.to_matrix()).norm() < 1e-4);
    }
}
