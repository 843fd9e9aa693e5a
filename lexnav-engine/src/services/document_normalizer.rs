//! Raw-document normalisation
//!
//! Upstream tooling produces statute structure files in several shapes:
//! already-canonical trees, single-root recursive objects, chapter/section
//! nestings, agent-discovery results, and two flat forms. Each shape has a
//! dedicated pure conversion into the canonical [`DocumentTree`]; dispatch
//! picks exactly one based on the top-level structure.
//!
//! Colliding ids are suffixed (`_2`, `_3`, …) and references remapped;
//! content is never dropped. Depths are always recomputed by traversal from
//! the roots, so input `level` values are advisory.

use crate::error::EngineError;
use crate::models::{DocumentTree, LegalNode, NodeMetadata};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};

/// Top-level keys that describe the document rather than a node.
const DOCUMENT_METADATA_KEYS: &[&str] = &[
    "title",
    "document_title",
    "description",
    "version",
    "source",
    "language",
    "jurisdiction",
    "document_type",
    "metadata",
    "last_updated",
];

/// Convert a raw statute JSON document into the canonical tree.
///
/// Fails with [`EngineError::MalformedDocument`] when no input shape
/// matches. Structural invariants are checked separately by the validator.
pub fn normalize(raw: &Value) -> Result<DocumentTree, EngineError> {
    match raw {
        Value::Object(map) if map.contains_key("nodes") && map.contains_key("rootNodes") => {
            from_canonical(raw)
        }
        Value::Object(map) if map.contains_key("structure_discovery") => from_agent_results(map),
        Value::Object(map) if looks_like_recursive_root(map) => from_recursive_root(map),
        Value::Object(map) if looks_like_chapter_nesting(map) => from_chapter_nesting(map),
        Value::Object(map) => from_flat_object(map),
        Value::Array(items) => from_flat_array(items),
        _ => Err(EngineError::MalformedDocument(
            "input is neither a JSON object nor an array".to_string(),
        )),
    }
}

/// Shape (b): a single recursive node object with children keyed by id.
fn looks_like_recursive_root(map: &Map<String, Value>) -> bool {
    map.contains_key("id")
        && map.contains_key("title")
        && map
            .get("children")
            .map_or(true, |children| children.is_object())
}

/// Shape (c): chapters keyed by id, each carrying a `sections` map.
fn looks_like_chapter_nesting(map: &Map<String, Value>) -> bool {
    map.values()
        .any(|value| value.is_object() && value.get("sections").is_some())
}

/// Shape (a): already-canonical tree. Depths are still recomputed so
/// inconsistent input levels are corrected; a consistent canonical tree
/// round-trips unchanged.
fn from_canonical(raw: &Value) -> Result<DocumentTree, EngineError> {
    let mut tree: DocumentTree = serde_json::from_value(raw.clone())
        .map_err(|e| EngineError::MalformedDocument(format!("canonical tree rejected: {e}")))?;

    // The map key is the reference anchor; make the node agree with it.
    for (key, node) in tree.nodes.iter_mut() {
        if node.id != *key {
            node.id = key.clone();
        }
    }

    recompute_depths(&mut tree.nodes, &tree.root_nodes);
    Ok(tree)
}

/// Shape (b): single-root recursive object, children as id → object map.
fn from_recursive_root(map: &Map<String, Value>) -> Result<DocumentTree, EngineError> {
    let mut builder = TreeBuilder::new();
    let root_id = flatten_recursive(&mut builder, None, map)?;
    builder.roots.push(root_id);
    Ok(builder.finish())
}

fn flatten_recursive(
    builder: &mut TreeBuilder,
    id_hint: Option<&str>,
    obj: &Map<String, Value>,
) -> Result<String, EngineError> {
    let node = node_from_object(id_hint, obj)?;
    let id = builder.insert(node);

    if let Some(Value::Object(children)) = obj.get("children") {
        let mut child_ids = Vec::with_capacity(children.len());
        for (child_key, child_value) in children {
            let Value::Object(child_obj) = child_value else {
                return Err(EngineError::MalformedDocument(format!(
                    "child '{child_key}' is not an object"
                )));
            };
            child_ids.push(flatten_recursive(builder, Some(child_key), child_obj)?);
        }
        builder.set_children(&id, child_ids);
    }

    Ok(id)
}

/// Shape (c): chapter/section nesting with composed ids
/// (`chapter_section_subsection`).
fn from_chapter_nesting(map: &Map<String, Value>) -> Result<DocumentTree, EngineError> {
    let mut builder = TreeBuilder::new();

    for (chapter_key, value) in map {
        if DOCUMENT_METADATA_KEYS.contains(&chapter_key.as_str()) {
            continue;
        }
        let Value::Object(chapter) = value else {
            continue;
        };
        let root_id = flatten_numbered_unit(&mut builder, chapter_key, chapter, "sections")?;
        builder.roots.push(root_id);
    }

    if builder.roots.is_empty() {
        return Err(EngineError::MalformedDocument(
            "chapter nesting contains no chapters".to_string(),
        ));
    }
    Ok(builder.finish())
}

fn flatten_numbered_unit(
    builder: &mut TreeBuilder,
    composed_id: &str,
    obj: &Map<String, Value>,
    child_field: &str,
) -> Result<String, EngineError> {
    let mut node = node_from_object(Some(composed_id), obj)?;
    // The composed id is the reference anchor, regardless of any inner id.
    node.id = composed_id.to_string();
    let id = builder.insert(node);

    let nested = obj.get(child_field).or_else(|| obj.get("subsections"));
    if let Some(Value::Object(children)) = nested {
        let mut child_ids = Vec::with_capacity(children.len());
        for (child_key, child_value) in children {
            let Value::Object(child_obj) = child_value else {
                continue;
            };
            let child_composed = format!("{composed_id}_{child_key}");
            child_ids.push(flatten_numbered_unit(
                builder,
                &child_composed,
                child_obj,
                "subsections",
            )?);
        }
        builder.set_children(&id, child_ids);
    }

    Ok(id)
}

/// Shape (d): agent-discovery results; sections carry `children` or
/// `subsections` arrays of nested objects.
fn from_agent_results(map: &Map<String, Value>) -> Result<DocumentTree, EngineError> {
    let root_sections = map
        .get("structure_discovery")
        .and_then(|v| v.get("structure_analysis"))
        .and_then(|v| v.get("document_structure"))
        .and_then(|v| v.get("root_sections"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            EngineError::MalformedDocument(
                "agent results missing structure_discovery.structure_analysis.\
                 document_structure.root_sections"
                    .to_string(),
            )
        })?;

    let mut builder = TreeBuilder::new();
    for section in root_sections {
        let Value::Object(obj) = section else {
            return Err(EngineError::MalformedDocument(
                "root section is not an object".to_string(),
            ));
        };
        let id = flatten_section(&mut builder, obj)?;
        builder.roots.push(id);
    }
    Ok(builder.finish())
}

fn flatten_section(
    builder: &mut TreeBuilder,
    obj: &Map<String, Value>,
) -> Result<String, EngineError> {
    let node = node_from_object(None, obj)?;
    let id = builder.insert(node);

    let nested = obj.get("children").or_else(|| obj.get("subsections"));
    if let Some(Value::Array(children)) = nested {
        let mut child_ids = Vec::with_capacity(children.len());
        for child in children {
            if let Value::Object(child_obj) = child {
                child_ids.push(flatten_section(builder, child_obj)?);
            }
        }
        builder.set_children(&id, child_ids);
    }

    Ok(id)
}

/// Shape (e): flat array of node-like objects in document order.
/// Entries with `level == 0` or no parent reference become roots.
fn from_flat_array(items: &[Value]) -> Result<DocumentTree, EngineError> {
    struct Pending {
        final_id: String,
        parent: Option<String>,
        children: Vec<String>,
        is_root: bool,
    }

    let mut builder = TreeBuilder::new();
    let mut pending = Vec::with_capacity(items.len());
    // Original id → first assigned id; textual references resolve to the
    // first occurrence when duplicates were suffixed.
    let mut first_id: HashMap<String, String> = HashMap::new();

    for item in items {
        let Value::Object(obj) = item else {
            return Err(EngineError::MalformedDocument(
                "array entry is not an object".to_string(),
            ));
        };
        let node = node_from_object(None, obj)?;
        let original = node.id.clone();
        let parent = obj
            .get("parent")
            .or_else(|| obj.get("parent_id"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let children = string_list(obj.get("children"));
        let level = obj.get("level").and_then(Value::as_u64);

        let final_id = builder.insert(node);
        first_id.entry(original).or_insert_with(|| final_id.clone());

        let is_root = parent.is_none() || level == Some(0);
        pending.push(Pending {
            final_id,
            parent,
            children,
            is_root,
        });
    }

    for entry in &pending {
        if !entry.children.is_empty() {
            let resolved = entry
                .children
                .iter()
                .map(|c| first_id.get(c).cloned().unwrap_or_else(|| c.clone()))
                .collect();
            builder.set_children(&entry.final_id, resolved);
        }
        if entry.is_root {
            builder.roots.push(entry.final_id.clone());
        } else if let Some(parent) = &entry.parent {
            let parent_final = first_id.get(parent).cloned().unwrap_or_else(|| parent.clone());
            if !builder.add_child(&parent_final, &entry.final_id) {
                tracing::warn!(
                    node = %entry.final_id,
                    parent = %parent,
                    "Parent reference does not resolve, promoting node to root"
                );
                builder.roots.push(entry.final_id.clone());
            }
        }
    }

    if builder.roots.is_empty() {
        builder.infer_roots();
    }
    Ok(builder.finish())
}

/// Shape (f): flat object keyed by id, skipping document-metadata keys.
/// Roots are inferred as nodes with no incoming child reference.
fn from_flat_object(map: &Map<String, Value>) -> Result<DocumentTree, EngineError> {
    let mut builder = TreeBuilder::new();
    let mut pending: Vec<(String, Vec<String>, Option<String>)> = Vec::new();

    for (key, value) in map {
        if DOCUMENT_METADATA_KEYS.contains(&key.as_str()) {
            continue;
        }
        let Value::Object(obj) = value else {
            continue;
        };
        let mut node = node_from_object(Some(key), obj)?;
        // Other entries reference this node by its map key.
        node.id = key.clone();
        let children = string_list(obj.get("children"));
        let parent = obj.get("parent").and_then(Value::as_str).map(str::to_string);
        let final_id = builder.insert(node);
        pending.push((final_id, children, parent));
    }

    if builder.nodes.is_empty() {
        return Err(EngineError::MalformedDocument(
            "flat object contains no node entries".to_string(),
        ));
    }

    for (final_id, children, parent) in &pending {
        if !children.is_empty() {
            builder.set_children(final_id, children.clone());
        }
        if let Some(parent) = parent {
            builder.add_child(parent, final_id);
        }
    }

    builder.infer_roots();
    Ok(builder.finish())
}

/// Parse node fields out of a JSON object. The id comes from the object's
/// `id` field or, failing that, the map key it was found under.
fn node_from_object(
    id_hint: Option<&str>,
    obj: &Map<String, Value>,
) -> Result<LegalNode, EngineError> {
    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| id_hint.map(str::to_string))
        .ok_or_else(|| EngineError::MalformedDocument("node without an id".to_string()))?;

    let title = obj
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let content = obj
        .get("content")
        .or_else(|| obj.get("text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let level = obj.get("level").and_then(Value::as_u64).unwrap_or(0) as usize;

    // Metadata either nested under "metadata" or spread across the node
    // object itself; parsing is best-effort.
    let metadata: NodeMetadata = match obj.get("metadata") {
        Some(Value::Object(m)) => {
            serde_json::from_value(Value::Object(m.clone())).unwrap_or_default()
        }
        _ => serde_json::from_value(Value::Object(obj.clone())).unwrap_or_default(),
    };

    Ok(LegalNode {
        id,
        title,
        content,
        level,
        children: Vec::new(),
        metadata,
    })
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Recompute node depths by BFS from the roots; traversal-computed depth
/// wins over input levels.
fn recompute_depths(nodes: &mut HashMap<String, LegalNode>, roots: &[String]) {
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    let mut seen: HashSet<String> = HashSet::new();

    for root in roots {
        if seen.insert(root.clone()) {
            queue.push_back((root.clone(), 0));
        }
    }

    while let Some((id, depth)) = queue.pop_front() {
        let children = match nodes.get_mut(&id) {
            Some(node) => {
                node.level = depth;
                node.children.clone()
            }
            None => continue,
        };
        for child in children {
            if seen.insert(child.clone()) {
                queue.push_back((child, depth + 1));
            }
        }
    }
}

/// Accumulates nodes during flattening, suffixing duplicate ids so content
/// is never dropped.
struct TreeBuilder {
    nodes: HashMap<String, LegalNode>,
    insertion_order: Vec<String>,
    roots: Vec<String>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            insertion_order: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Insert a node, assigning a `_2`, `_3`, … suffix on id collision.
    /// Returns the id actually assigned.
    fn insert(&mut self, mut node: LegalNode) -> String {
        if self.nodes.contains_key(&node.id) {
            let base = node.id.clone();
            let mut counter = 2;
            let mut candidate = format!("{base}_{counter}");
            while self.nodes.contains_key(&candidate) {
                counter += 1;
                candidate = format!("{base}_{counter}");
            }
            tracing::debug!(original = %base, assigned = %candidate, "Duplicate node id suffixed");
            node.id = candidate;
        }
        let id = node.id.clone();
        self.insertion_order.push(id.clone());
        self.nodes.insert(id.clone(), node);
        id
    }

    fn set_children(&mut self, id: &str, children: Vec<String>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.children = children;
        }
    }

    /// Append a child reference; returns false when the parent is unknown.
    fn add_child(&mut self, parent_id: &str, child_id: &str) -> bool {
        match self.nodes.get_mut(parent_id) {
            Some(parent) => {
                if !parent.children.iter().any(|c| c == child_id) {
                    parent.children.push(child_id.to_string());
                }
                true
            }
            None => false,
        }
    }

    /// Roots = nodes with no incoming child reference, in insertion order.
    fn infer_roots(&mut self) {
        let referenced: HashSet<&String> = self
            .nodes
            .values()
            .flat_map(|node| node.children.iter())
            .collect();
        self.roots = self
            .insertion_order
            .iter()
            .filter(|id| !referenced.contains(*id))
            .cloned()
            .collect();
    }

    fn finish(mut self) -> DocumentTree {
        recompute_depths(&mut self.nodes, &self.roots);
        DocumentTree {
            nodes: self.nodes,
            root_nodes: self.roots,
        }
    }
}
