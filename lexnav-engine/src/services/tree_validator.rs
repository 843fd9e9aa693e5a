//! Structural validation of the normalised document tree
//!
//! Checks run in a fixed order and report the first violation:
//! root set non-empty, roots present, child references resolve, no
//! duplicate child references, single parent per node, no root with a
//! parent, full reachability (no cycles), depth monotonicity.

use crate::error::EngineError;
use crate::models::DocumentTree;
use std::collections::{HashMap, HashSet, VecDeque};

/// Verify the tree invariants, naming the first violation found.
pub fn validate(tree: &DocumentTree) -> Result<(), EngineError> {
    if tree.root_nodes.is_empty() {
        return Err(EngineError::InvalidTree("no root nodes".to_string()));
    }

    let mut seen_roots = HashSet::new();
    for root in &tree.root_nodes {
        if !tree.nodes.contains_key(root) {
            return Err(EngineError::InvalidTree(format!("missing root: {root}")));
        }
        if !seen_roots.insert(root) {
            return Err(EngineError::InvalidTree(format!("duplicate root: {root}")));
        }
    }

    // Referential integrity and parent counting in one pass
    let mut incoming: HashMap<&str, usize> = HashMap::new();
    for (id, node) in &tree.nodes {
        let mut seen_children = HashSet::new();
        for child in &node.children {
            if !tree.nodes.contains_key(child) {
                return Err(EngineError::InvalidTree(format!(
                    "dangling child reference: {id} -> {child}"
                )));
            }
            if !seen_children.insert(child) {
                return Err(EngineError::InvalidTree(format!(
                    "duplicate child reference: {id} -> {child}"
                )));
            }
            *incoming.entry(child.as_str()).or_insert(0) += 1;
        }
    }

    let root_set: HashSet<&str> = tree.root_nodes.iter().map(String::as_str).collect();
    for (id, count) in &incoming {
        if root_set.contains(id) {
            return Err(EngineError::InvalidTree(format!(
                "root {id} is referenced as a child"
            )));
        }
        if *count > 1 {
            return Err(EngineError::InvalidTree(format!(
                "node {id} has {count} parents"
            )));
        }
    }
    for id in tree.nodes.keys() {
        if !root_set.contains(id.as_str()) && !incoming.contains_key(id.as_str()) {
            return Err(EngineError::InvalidTree(format!(
                "node {id} is neither a root nor any node's child"
            )));
        }
    }

    // Reachability from the roots; with parent counts verified, an
    // unreached node can only sit on a cycle.
    let mut reached: HashSet<&str> = root_set.clone();
    let mut queue: VecDeque<(&str, usize)> = tree
        .root_nodes
        .iter()
        .map(|r| (r.as_str(), 0usize))
        .collect();

    while let Some((id, depth)) = queue.pop_front() {
        let node = &tree.nodes[id];
        if node.level != depth {
            return Err(EngineError::InvalidTree(format!(
                "node {id} has level {} but sits at depth {depth}",
                node.level
            )));
        }
        for child in &node.children {
            if reached.insert(child.as_str()) {
                queue.push_back((child.as_str(), depth + 1));
            }
        }
    }

    if reached.len() != tree.nodes.len() {
        let orphan = tree
            .nodes
            .keys()
            .find(|id| !reached.contains(id.as_str()))
            .map(String::as_str)
            .unwrap_or("<unknown>");
        return Err(EngineError::InvalidTree(format!(
            "cycle detected involving node {orphan}"
        )));
    }

    Ok(())
}
