//! Traversal result object and derived statistics

use crate::models::{LegalNode, NodeMetadata, TraversalDecision};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A node included in the result because its score exceeded the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevantNode {
    pub id: String,
    pub title: String,
    pub level: usize,
    pub content: String,
    #[serde(default, skip_serializing_if = "NodeMetadata::is_empty")]
    pub metadata: NodeMetadata,
    pub relevance_score: f64,
    pub reasoning: String,
}

impl RelevantNode {
    pub fn from_decision(node: &LegalNode, decision: &TraversalDecision) -> Self {
        Self {
            id: node.id.clone(),
            title: node.title.clone(),
            level: node.level,
            content: node.content.clone(),
            metadata: node.metadata.clone(),
            relevance_score: decision.relevance_score,
            reasoning: decision.reasoning.clone(),
        }
    }
}

/// Per-depth evaluation counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthStatistics {
    pub depth: usize,
    /// Nodes evaluated at this depth
    pub total_nodes: usize,
    /// Nodes granted descent at this depth
    pub visited_nodes: usize,
    /// Nodes scoring above the inclusion threshold at this depth
    pub relevant_nodes: usize,
    pub average_score: f64,
}

/// Relevance-band histogram over all decisions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDistribution {
    /// score >= 0.8
    pub high_relevance: usize,
    /// 0.5 <= score < 0.8
    pub medium_relevance: usize,
    /// score < 0.5
    pub low_relevance: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalStatistics {
    pub by_depth: Vec<DepthStatistics>,
    pub score_distribution: ScoreDistribution,
}

impl TraversalStatistics {
    /// Derive statistics from the decision log.
    ///
    /// `threshold` must match the inclusion threshold used by the run so
    /// `relevant_nodes` counts agree with the result's relevant list.
    pub fn from_decisions(decisions: &[TraversalDecision], threshold: f64) -> Self {
        let mut per_depth: BTreeMap<usize, (usize, usize, usize, f64)> = BTreeMap::new();
        let mut distribution = ScoreDistribution::default();

        for decision in decisions {
            let entry = per_depth.entry(decision.depth).or_insert((0, 0, 0, 0.0));
            entry.0 += 1;
            if decision.visited {
                entry.1 += 1;
            }
            if decision.relevance_score > threshold {
                entry.2 += 1;
            }
            entry.3 += decision.relevance_score;

            if decision.relevance_score >= 0.8 {
                distribution.high_relevance += 1;
            } else if decision.relevance_score >= 0.5 {
                distribution.medium_relevance += 1;
            } else {
                distribution.low_relevance += 1;
            }
        }

        let by_depth = per_depth
            .into_iter()
            .map(|(depth, (total, visited, relevant, score_sum))| DepthStatistics {
                depth,
                total_nodes: total,
                visited_nodes: visited,
                relevant_nodes: relevant,
                average_score: score_sum / total as f64,
            })
            .collect();

        Self {
            by_depth,
            score_distribution: distribution,
        }
    }
}

/// Complete result of a traversal run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalResult {
    /// Included nodes, ordered by depth then within-level submission order
    pub relevant_nodes: Vec<RelevantNode>,
    /// Full decision log in evaluation order
    pub traversal_path: Vec<TraversalDecision>,
    pub final_recommendation: String,
    /// The whole normalised tree, for downstream visualisation
    pub document_nodes: HashMap<String, LegalNode>,
    pub statistics: TraversalStatistics,
}
