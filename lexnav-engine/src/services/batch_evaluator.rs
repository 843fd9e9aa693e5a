//! Batched relevance evaluation
//!
//! One batch per traversal level. Oversize batches are split into chunks of
//! at most [`MAX_BATCH_SIZE`] ids, processed strictly in order with 1 s
//! pacing between oracle calls. Exactly one decision is produced for every
//! submitted id: mapped oracle evaluations where reconciliation succeeds,
//! fallback decisions for unmappable entries and failed chunks.

use crate::error::EngineError;
use crate::models::decision::UNMAPPED_REASONING;
use crate::models::{DocumentTree, TraversalDecision};
use crate::services::context_builder;
use crate::services::evaluation_matcher;
use crate::services::oracle_client::Oracle;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Maximum ids submitted to the oracle in one call.
pub const MAX_BATCH_SIZE: usize = 5;
/// Pause between consecutive oracle calls.
const CHUNK_PACING_MS: u64 = 1000;

/// One entry of the oracle's batch response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeEvaluation {
    node_id: String,
    /// Carried in the schema for oracle-side clarity; inclusion is decided
    /// by score thresholding only.
    #[serde(default)]
    #[allow(dead_code)]
    is_relevant: bool,
    relevance_score: f64,
    reasoning: String,
    should_explore_children: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchEvaluationResponse {
    node_evaluations: Vec<NodeEvaluation>,
}

/// Enforces the inter-chunk pause (no wait before the first chunk).
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Chunk pacing: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Oracle-backed batch evaluator.
pub struct BatchEvaluator {
    oracle: Arc<dyn Oracle>,
    pacing: RateLimiter,
}

impl BatchEvaluator {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            pacing: RateLimiter::new(CHUNK_PACING_MS),
        }
    }

    /// Evaluate one level's node ids. Returns exactly one decision per id,
    /// in submission order.
    ///
    /// Oracle failures never propagate: a failed chunk degrades to fallback
    /// decisions and later chunks proceed. The only error is cancellation
    /// between chunks, which aborts the run.
    pub async fn evaluate_batch(
        &self,
        ids: &[String],
        tree: &DocumentTree,
        case_information: &Value,
        prior_relevant_titles: &[String],
        depth: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<TraversalDecision>, EngineError> {
        let mut decisions = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_BATCH_SIZE) {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            self.pacing.wait().await;
            decisions.extend(
                self.evaluate_chunk(chunk, tree, case_information, prior_relevant_titles, depth)
                    .await,
            );
        }

        Ok(decisions)
    }

    /// Evaluate a single chunk; infallible by construction (every id gets
    /// a decision even when the oracle call fails).
    async fn evaluate_chunk(
        &self,
        chunk: &[String],
        tree: &DocumentTree,
        case_information: &Value,
        prior_relevant_titles: &[String],
        depth: usize,
    ) -> Vec<TraversalDecision> {
        let prompt = build_prompt(chunk, tree, case_information, prior_relevant_titles);

        let outcome = self.oracle.complete(&prompt, &evaluation_schema()).await;
        let parsed = outcome.and_then(|value| {
            serde_json::from_value::<BatchEvaluationResponse>(value)
                .map_err(|e| crate::services::oracle_client::OracleError::Schema(e.to_string()))
        });

        match parsed {
            Ok(response) => {
                tracing::debug!(
                    depth,
                    submitted = chunk.len(),
                    returned = response.node_evaluations.len(),
                    "Oracle chunk evaluated"
                );
                map_evaluations(chunk, &response.node_evaluations, depth)
            }
            Err(e) => {
                let kind = e.kind();
                tracing::warn!(
                    depth,
                    kind = kind.as_str(),
                    error = %e,
                    nodes = chunk.len(),
                    "Oracle chunk failed, emitting fallback decisions"
                );
                chunk
                    .iter()
                    .map(|id| {
                        TraversalDecision::fallback(
                            id,
                            depth,
                            format!("Oracle evaluation failed ({})", kind.as_str()),
                        )
                    })
                    .collect()
            }
        }
    }
}

/// Reconcile returned evaluations against the requested ids and build one
/// decision per requested id.
fn map_evaluations(
    requested: &[String],
    evaluations: &[NodeEvaluation],
    depth: usize,
) -> Vec<TraversalDecision> {
    let requested_refs: Vec<&str> = requested.iter().map(String::as_str).collect();
    let received_refs: Vec<&str> = evaluations.iter().map(|e| e.node_id.as_str()).collect();
    let assignment = evaluation_matcher::reconcile(&requested_refs, &received_refs);

    requested
        .iter()
        .zip(&assignment)
        .map(|(id, slot)| match slot {
            Some(index) => {
                let evaluation = &evaluations[*index];
                TraversalDecision {
                    node_id: id.clone(),
                    depth,
                    timestamp: Utc::now(),
                    relevance_score: evaluation.relevance_score.clamp(0.0, 1.0),
                    visited: evaluation.should_explore_children,
                    reasoning: evaluation.reasoning.clone(),
                }
            }
            None => {
                tracing::warn!(
                    requested = %id,
                    received = ?received_refs,
                    expected = ?requested_refs,
                    "Evaluation entry could not be reconciled"
                );
                TraversalDecision::fallback(id, depth, UNMAPPED_REASONING)
            }
        })
        .collect()
}

/// Prompt listing the case, continuity titles, and per-node contexts.
fn build_prompt(
    chunk: &[String],
    tree: &DocumentTree,
    case_information: &Value,
    prior_relevant_titles: &[String],
) -> String {
    let mut prompt = String::from(
        "You are assessing which sections of a consumer-rights statute are \
         relevant to a specific case.\n\nCase information:\n",
    );
    prompt.push_str(
        &serde_json::to_string_pretty(case_information)
            .unwrap_or_else(|_| case_information.to_string()),
    );

    if !prior_relevant_titles.is_empty() {
        prompt.push_str("\n\nSections already identified as relevant:\n");
        for title in prior_relevant_titles {
            prompt.push_str(&format!("- {title}\n"));
        }
    }

    prompt.push_str("\n\nNodes to evaluate:\n");
    for (index, id) in chunk.iter().enumerate() {
        let context = tree
            .get(id)
            .map(context_builder::node_context)
            .unwrap_or_else(|| format!("Title: {id}"));
        prompt.push_str(&format!("{}. nodeId: {id}\n   {context}\n", index + 1));
    }

    prompt.push_str(
        "\nFor each node, decide whether its content is relevant to the case \
         (relevanceScore, 0 to 1) and, independently, whether its children \
         are worth exploring (shouldExploreChildren). Return one entry per \
         node, in the order given, repeating each nodeId verbatim.",
    );

    prompt
}

fn evaluation_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "nodeEvaluations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "nodeId": {"type": "string"},
                        "isRelevant": {"type": "boolean"},
                        "relevanceScore": {"type": "number", "minimum": 0.0, "maximum": 1.0},
                        "reasoning": {"type": "string"},
                        "shouldExploreChildren": {"type": "boolean"}
                    },
                    "required": [
                        "nodeId",
                        "isRelevant",
                        "relevanceScore",
                        "reasoning",
                        "shouldExploreChildren"
                    ],
                    "additionalProperties": false
                }
            }
        },
        "required": ["nodeEvaluations"],
        "additionalProperties": false
    })
}
