use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::warn;

use crate::error::DenormalizeError;
use crate::tree::{NodeId, NodeTree};

/// One node renamed to stop shadowing a reserved name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rename {
    pub node: NodeId,
    pub old_name: String,
    pub new_name: String,
}

/// Rename every node under `start` whose name shadows one of the `reserved`
/// nodes' names.
///
/// Nodes are visited depth-first in sibling order. The first collision on a
/// name becomes `name.1`, the next `name.2`, with one counter per name.
/// Candidates that are themselves reserved names are skipped, so a second
/// pass over the result renames nothing.
pub fn deduplicate_names(
    tree: &mut NodeTree,
    start: NodeId,
    reserved: &[NodeId],
) -> Result<Vec<Rename>, DenormalizeError> {
    let reserved_nodes: HashSet<NodeId> = reserved.iter().copied().collect();
    let reserved_names = reserved
        .iter()
        .map(|id| Ok(tree.node(*id)?.name().to_string()))
        .collect::<Result<HashSet<String>, DenormalizeError>>()?;

    let mut counters = HashMap::<String, usize>::new();
    let mut renames = Vec::new();

    for id in tree.depth_first(start)? {
        if reserved_nodes.contains(&id) {
            continue;
        }
        let name = tree.node(id)?.name().to_string();
        if !reserved_names.contains(&name) {
            continue;
        }

        let counter = counters.entry(name.clone()).or_insert(0);
        let new_name = loop {
            *counter += 1;
            let candidate = format!("{name}.{counter}");
            if !reserved_names.contains(&candidate) {
                break candidate;
            }
        };

        tree.rename(id, new_name.clone())?;
        renames.push(Rename {
            node: id,
            old_name: name,
            new_name,
        });
    }

    if !renames.is_empty() {
        let listing = renames
            .iter()
            .map(|rename| format!("{} -> {}", rename.old_name, rename.new_name))
            .collect::<Vec<_>>()
            .join(", ");
        warn!(
            count = renames.len(),
            "renamed nodes that collided with the canonical skeleton: {listing}"
        );
    }

    Ok(renames)
}
