//! Canonical legal document tree
//!
//! Nodes reference children by id, never by pointer, so the tree is
//! trivially serialisable and safe to share read-only across a run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Optional descriptive metadata attached to a node by upstream analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeMetadata {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub main_themes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub key_points: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practical_impact: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub legal_references: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_type: Option<String>,
}

impl NodeMetadata {
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
            && self.main_themes.is_empty()
            && self.key_points.is_empty()
            && self.scope.is_none()
            && self.practical_impact.is_none()
            && self.legal_references.is_empty()
            && self.section_number.is_none()
            && self.section_type.is_none()
    }
}

/// One entry in the legal document tree (part, chapter, section,
/// subsection, or leaf provision).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalNode {
    /// Stable identifier, unique after normalisation
    pub id: String,
    /// Short human-readable label
    #[serde(default)]
    pub title: String,
    /// Full text body (empty for pure containers)
    #[serde(default)]
    pub content: String,
    /// Depth in the tree; roots are 0. Recomputed during normalisation.
    #[serde(default)]
    pub level: usize,
    /// Ordered child ids
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "NodeMetadata::is_empty")]
    pub metadata: NodeMetadata,
}

impl LegalNode {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: String::new(),
            level: 0,
            children: Vec::new(),
            metadata: NodeMetadata::default(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Normalised document tree: id-indexed nodes plus the ordered root set.
///
/// Immutable for the duration of a traversal run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentTree {
    pub nodes: HashMap<String, LegalNode>,
    #[serde(rename = "rootNodes")]
    pub root_nodes: Vec<String>,
}

impl DocumentTree {
    pub fn get(&self, id: &str) -> Option<&LegalNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
