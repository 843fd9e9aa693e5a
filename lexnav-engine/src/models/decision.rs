//! Traversal decision records and per-run context

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Reasoning attached to decisions the reconciler could not map back to a
/// requested node id.
pub const UNMAPPED_REASONING: &str = "Could not map to batch evaluation response";

/// One record per node evaluated during a traversal run.
///
/// `visited` is permission to descend into children, not "was scored":
/// a node can be scored above the threshold without descent, and descended
/// into without inclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalDecision {
    pub node_id: String,
    pub depth: usize,
    pub timestamp: DateTime<Utc>,
    /// Relevance in [0, 1]
    pub relevance_score: f64,
    /// Permission to descend into children
    pub visited: bool,
    /// Oracle justification, or a fallback string on failure
    pub reasoning: String,
}

impl TraversalDecision {
    /// Decision emitted when the oracle could not be consulted for a node
    /// (chunk failure or unmappable response entry). Score 0, no descent.
    pub fn fallback(node_id: impl Into<String>, depth: usize, reasoning: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            depth,
            timestamp: Utc::now(),
            relevance_score: 0.0,
            visited: false,
            reasoning: reasoning.into(),
        }
    }
}

/// Per-run mutable scratch state. Created at run start, dropped at run end;
/// never shared across runs.
#[derive(Debug)]
pub struct TraversalContext {
    /// Opaque case-information payload included in every oracle prompt
    pub case_information: serde_json::Value,
    /// Ids already enqueued this run (guards against re-enqueueing)
    pub enqueued: HashSet<String>,
    /// Append-only decision log, depth-major in submission order
    pub decisions: Vec<TraversalDecision>,
    /// Depth of the level currently being evaluated
    pub current_depth: usize,
}

impl TraversalContext {
    pub fn new(case_information: serde_json::Value) -> Self {
        Self {
            case_information,
            enqueued: HashSet::new(),
            decisions: Vec::new(),
            current_depth: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_decision_shape() {
        let decision = TraversalDecision::fallback("s1", 3, UNMAPPED_REASONING);
        assert_eq!(decision.node_id, "s1");
        assert_eq!(decision.depth, 3);
        assert_eq!(decision.relevance_score, 0.0);
        assert!(!decision.visited);
        assert_eq!(decision.reasoning, UNMAPPED_REASONING);
    }

    #[test]
    fn test_decision_serializes_camel_case() {
        let decision = TraversalDecision::fallback("s1", 0, "x");
        let json = serde_json::to_value(&decision).unwrap();
        assert!(json.get("nodeId").is_some());
        assert!(json.get("relevanceScore").is_some());
        assert!(json.get("node_id").is_none());
    }
}
