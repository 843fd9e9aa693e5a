//! Level-synchronous traversal driver
//!
//! Breadth-first walk of the document tree under a strict depth bound.
//! Inclusion in the result (`relevanceScore > threshold`) and permission
//! to descend (`shouldExploreChildren`) are independent axes: a leaf can
//! be included without descent, and a broad parent descended into without
//! inclusion.
//!
//! Oracle failures degrade to fallback decisions and the walk continues;
//! the only aborts are validation failure and cancellation.

use crate::error::EngineError;
use crate::models::{
    DocumentTree, RelevantNode, TraversalContext, TraversalResult, TraversalStatistics,
};
use crate::services::batch_evaluator::BatchEvaluator;
use crate::services::oracle_client::Oracle;
use crate::services::recommendation_synthesizer::RecommendationSynthesizer;
use crate::services::tree_validator;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const DEFAULT_MAX_DEPTH: usize = 8;
/// Permissive default; 0.65 is the supported strict alternative.
pub const DEFAULT_RELEVANCE_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone)]
struct QueueEntry {
    node_id: String,
    depth: usize,
}

/// Traversal driver owning the per-run oracle services.
pub struct TraversalDriver {
    evaluator: BatchEvaluator,
    synthesizer: RecommendationSynthesizer,
    max_depth: usize,
    threshold: f64,
}

impl TraversalDriver {
    pub fn new(oracle: Arc<dyn Oracle>, max_depth: usize, threshold: f64) -> Self {
        Self {
            evaluator: BatchEvaluator::new(oracle.clone()),
            synthesizer: RecommendationSynthesizer::new(oracle),
            max_depth,
            threshold,
        }
    }

    /// Execute a complete traversal run over an immutable tree.
    ///
    /// Decisions are appended depth-major in submission order; relevant
    /// nodes are ordered by depth, then within-level submission order.
    /// Cancellation is honoured between levels and between chunks and
    /// leaves no partial result behind.
    pub async fn run(
        &self,
        run_id: Uuid,
        tree: &DocumentTree,
        case_information: Value,
        cancel: &CancellationToken,
    ) -> Result<TraversalResult, EngineError> {
        tree_validator::validate(tree)?;

        let start_time = std::time::Instant::now();
        tracing::info!(
            run_id = %run_id,
            nodes = tree.len(),
            roots = tree.root_nodes.len(),
            max_depth = self.max_depth,
            threshold = self.threshold,
            "Starting traversal run"
        );

        let mut context = TraversalContext::new(case_information);
        let mut relevant_nodes: Vec<RelevantNode> = Vec::new();
        let mut queue: VecDeque<QueueEntry> = VecDeque::new();

        for root in &tree.root_nodes {
            if context.enqueued.insert(root.clone()) {
                queue.push_back(QueueEntry {
                    node_id: root.clone(),
                    depth: 0,
                });
            }
        }

        for depth in 0..self.max_depth {
            if cancel.is_cancelled() {
                tracing::info!(run_id = %run_id, depth, "Traversal cancelled between levels");
                return Err(EngineError::Cancelled);
            }

            let current_level: Vec<String> = queue
                .iter()
                .filter(|entry| entry.depth == depth)
                .map(|entry| entry.node_id.clone())
                .collect();
            if current_level.is_empty() {
                break;
            }
            context.current_depth = depth;

            tracing::info!(
                run_id = %run_id,
                depth,
                nodes = current_level.len(),
                "Evaluating level"
            );

            let prior_titles: Vec<String> =
                relevant_nodes.iter().map(|n| n.title.clone()).collect();
            let decisions = self
                .evaluator
                .evaluate_batch(
                    &current_level,
                    tree,
                    &context.case_information,
                    &prior_titles,
                    depth,
                    cancel,
                )
                .await?;

            for decision in decisions {
                let node = tree.get(&decision.node_id);

                if decision.relevance_score > self.threshold {
                    if let Some(node) = node {
                        relevant_nodes.push(RelevantNode::from_decision(node, &decision));
                    }
                }

                if decision.visited && depth + 1 < self.max_depth {
                    if let Some(node) = node {
                        for child in &node.children {
                            if context.enqueued.insert(child.clone()) {
                                queue.push_back(QueueEntry {
                                    node_id: child.clone(),
                                    depth: depth + 1,
                                });
                            }
                        }
                    }
                }

                context.enqueued.insert(decision.node_id.clone());
                context.decisions.push(decision);
            }

            queue.retain(|entry| entry.depth != depth);
        }

        tracing::info!(
            run_id = %run_id,
            decisions = context.decisions.len(),
            relevant = relevant_nodes.len(),
            duration_ms = start_time.elapsed().as_millis() as u64,
            "Traversal complete, synthesising recommendation"
        );

        let final_recommendation = self
            .synthesizer
            .synthesize(&relevant_nodes, &context.case_information)
            .await;

        let statistics = TraversalStatistics::from_decisions(&context.decisions, self.threshold);

        Ok(TraversalResult {
            relevant_nodes,
            traversal_path: context.decisions,
            final_recommendation,
            document_nodes: tree.nodes.clone(),
            statistics,
        })
    }
}
