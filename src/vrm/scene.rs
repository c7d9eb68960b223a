use std::collections::{HashMap, VecDeque};

use anyhow::{Result, bail};
use serde_json::Value;

use super::gltf_utils::{
    active_scene_index, child_indices, collect_parent_index_map_from_json, node_local_transform,
    scene_root_indices, set_node_local_transform,
};
use crate::tree::{NodeId, NodeTree};

/// glTF node array mirrored into a [`NodeTree`].
///
/// The tree root stands for the active scene and is the character root; it is
/// never written back as a node.
#[derive(Debug, Clone)]
pub(super) struct SceneTree {
    pub(super) tree: NodeTree,
    scene_index: usize,
    /// Tree node of every glTF node, by glTF index.
    nodes: Vec<NodeId>,
    /// Names as stored in the file; unnamed nodes get a placeholder in the tree.
    source_names: Vec<Option<String>>,
}

fn placeholder_name(index: usize) -> String {
    format!("node_{index}")
}

impl SceneTree {
    pub(super) fn node_id(&self, index: usize) -> Option<NodeId> {
        self.nodes.get(index).copied()
    }

    #[cfg(test)]
    pub(super) fn gltf_index(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|node| *node == id)
    }

    pub(super) fn character_root(&self) -> NodeId {
        self.tree.root()
    }
}

/// Mirror the glTF node hierarchy.
///
/// Nodes reachable from the active scene hang under the tree root in file
/// order. Nodes outside that scene keep their own sub-hierarchies, detached.
pub(super) fn build_scene_tree(json: &Value) -> Result<SceneTree> {
    let empty = Vec::new();
    let gltf_nodes = json
        .get("nodes")
        .and_then(Value::as_array)
        .unwrap_or(&empty);
    let scene_index = active_scene_index(json);
    let Some(scene) = json
        .get("scenes")
        .and_then(Value::as_array)
        .and_then(|scenes| scenes.get(scene_index))
    else {
        bail!("glTF file has no scene {scene_index}");
    };

    let scene_name = scene
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("Scene");
    let mut tree = NodeTree::new(scene_name);
    let root = tree.root();
    let mut nodes: Vec<Option<NodeId>> = vec![None; gltf_nodes.len()];
    let source_names: Vec<Option<String>> = gltf_nodes
        .iter()
        .map(|node| node.get("name").and_then(Value::as_str).map(ToOwned::to_owned))
        .collect();
    let name_of = |index: usize| {
        source_names[index]
            .clone()
            .unwrap_or_else(|| placeholder_name(index))
    };

    let mut queue = VecDeque::<(usize, NodeId)>::new();
    for index in scene_root_indices(scene) {
        if index < gltf_nodes.len() {
            queue.push_back((index, root));
        }
    }

    let parent_map = collect_parent_index_map_from_json(json);
    let mut detached_roots = (0..gltf_nodes.len()).filter(|index| !parent_map.contains_key(index));

    loop {
        while let Some((index, parent)) = queue.pop_front() {
            if nodes[index].is_some() {
                continue;
            }
            let local = node_local_transform(&gltf_nodes[index]);
            let id = tree.add_child(parent, name_of(index), local)?;
            nodes[index] = Some(id);
            for child in child_indices(&gltf_nodes[index]) {
                if child < gltf_nodes.len() {
                    queue.push_back((child, id));
                }
            }
        }

        let Some(index) = detached_roots.by_ref().find(|index| nodes[*index].is_none()) else {
            break;
        };
        let id = tree.add_detached(name_of(index), node_local_transform(&gltf_nodes[index]));
        nodes[index] = Some(id);
        for child in child_indices(&gltf_nodes[index]) {
            if child < gltf_nodes.len() {
                queue.push_back((child, id));
            }
        }
    }

    // Whatever is left sits on a parent cycle and cannot be placed.
    let nodes = nodes
        .into_iter()
        .enumerate()
        .map(|(index, node)| {
            node.unwrap_or_else(|| {
                tree.add_detached(name_of(index), node_local_transform(&gltf_nodes[index]))
            })
        })
        .collect();

    Ok(SceneTree {
        tree,
        scene_index,
        nodes,
        source_names,
    })
}

/// Write `tree` (a restructured copy of `scene.tree`) back into the glTF JSON.
///
/// Existing nodes keep their indices and new nodes are appended. Children
/// lists and the scene's root list are rebuilt from the tree, TRS is written
/// only for nodes whose transform changed. Returns the glTF index of every
/// tree node except the root.
pub(super) fn write_scene_tree(
    json: &mut Value,
    scene: &SceneTree,
    tree: &NodeTree,
) -> Result<HashMap<NodeId, usize>> {
    let mut index_of: HashMap<NodeId, usize> = scene
        .nodes
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index))
        .collect();

    let Some(gltf_nodes) = json.get_mut("nodes").and_then(Value::as_array_mut) else {
        bail!("glTF file has no nodes array");
    };
    for id in tree.ids() {
        if id == tree.root() || index_of.contains_key(&id) {
            continue;
        }
        index_of.insert(id, gltf_nodes.len());
        gltf_nodes.push(serde_json::json!({}));
    }

    for id in tree.ids() {
        let Some(index) = index_of.get(&id).copied() else {
            continue;
        };
        let node = tree.node(id)?;
        let gltf_node = &mut gltf_nodes[index];

        let source_name = scene.source_names.get(index).cloned().flatten();
        let keeps_placeholder = source_name.is_none() && node.name() == placeholder_name(index);
        if source_name.as_deref() != Some(node.name()) && !keeps_placeholder {
            gltf_node["name"] = Value::from(node.name());
        }

        if node.is_transform_dirty() {
            set_node_local_transform(gltf_node, node.local());
        }

        let children = mapped_indices(node.children(), &index_of);
        if let Some(object) = gltf_node.as_object_mut() {
            if children.is_empty() {
                object.remove("children");
            } else {
                object.insert("children".to_string(), Value::from(children));
            }
        }
    }

    let roots = mapped_indices(tree.node(tree.root())?.children(), &index_of);
    let Some(gltf_scene) = json
        .get_mut("scenes")
        .and_then(Value::as_array_mut)
        .and_then(|scenes| scenes.get_mut(scene.scene_index))
    else {
        bail!("glTF file has no scene {}", scene.scene_index);
    };
    gltf_scene["nodes"] = Value::from(roots);

    Ok(index_of)
}

fn mapped_indices(ids: &[NodeId], index_of: &HashMap<NodeId, usize>) -> Vec<usize> {
    ids.iter()
        .filter_map(|id| index_of.get(id).copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample_json() -> Value {
        serde_json::json!({
            "scene": 0,
            "scenes": [{"name": "Scene", "nodes": [0, 3]}],
            "nodes": [
                {"name": "Root", "children": [1]},
                {"name": "J_Bip_C_Hips", "translation": [0.0, 1.0, 0.0], "children": [2]},
                {"name": "J_Bip_C_Spine", "translation": [0.0, 0.1, 0.0]},
                {"name": "Body", "mesh": 0},
                {"children": [5]},
                {"name": "Orphan"}
            ]
        })
    }

    #[test]
    fn given_gltf_nodes_when_building_tree_then_scene_nodes_hang_under_root() {
        let scene = build_scene_tree(&sample_json()).expect("tree");
        let tree = &scene.tree;

        let root_children: Vec<_> = tree
            .node(tree.root())
            .expect("root")
            .children()
            .iter()
            .map(|id| scene.gltf_index(*id))
            .collect();
        assert_eq!(root_children, vec![Some(0), Some(3)]);

        let spine = scene.node_id(2).expect("spine");
        assert!(
            (tree.world_position(spine).expect("world") - Vector3::new(0.0, 1.1, 0.0)).norm()
                < 1e-6
        );

        let orphan_parent = scene.node_id(4).expect("detached");
        assert_eq!(tree.node(orphan_parent).expect("node").parent(), None);
        assert_eq!(tree.node(orphan_parent).expect("node").name(), "node_4");
        assert_eq!(
            tree.node(scene.node_id(5).expect("orphan")).expect("node").parent(),
            Some(orphan_parent)
        );
    }

    #[test]
    fn given_restructured_tree_when_writing_back_then_new_nodes_are_appended() {
        let mut json = sample_json();
        let scene = build_scene_tree(&json).expect("tree");
        let mut tree = scene.tree.clone();
        let root = tree.root();
        let hips = scene.node_id(1).expect("hips");
        let new_root = tree.create_detached("Root", Vector3::zeros());
        tree.set_parent_keep_world(new_root, root).expect("attach");
        tree.set_first_sibling(new_root).expect("order");
        tree.set_parent_keep_world(hips, new_root).expect("move");

        let index_of = write_scene_tree(&mut json, &scene, &tree).expect("write");

        assert_eq!(index_of[&new_root], 6);
        assert_eq!(json["scenes"][0]["nodes"], serde_json::json!([6, 0, 3]));
        assert_eq!(json["nodes"][6]["name"], "Root");
        assert_eq!(json["nodes"][6]["children"], serde_json::json!([1]));
        assert!(json["nodes"][0].get("children").is_none());
        assert!(json["nodes"][1].get("rotation").is_some());
        assert!(json["nodes"][2].get("rotation").is_none());
        assert!(json["nodes"][4].get("name").is_none());
        assert_eq!(json["nodes"][4]["children"], serde_json::json!([5]));
    }
}
