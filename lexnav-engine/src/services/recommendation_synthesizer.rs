//! Final recommendation synthesis
//!
//! One oracle call over the collected relevant nodes and the case
//! information. Synthesis failure never fails the run: the result falls
//! back to a fixed message and the failure is logged.

use crate::models::RelevantNode;
use crate::services::oracle_client::Oracle;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Recommendation used when the oracle call fails.
pub const FALLBACK_RECOMMENDATION: &str =
    "No recommendation could be generated because the oracle request failed; \
     the relevant sections were still identified normally.";

/// Nodes beyond this many are summarised by title only to keep the prompt
/// within the oracle's budget.
const MAX_DETAILED_NODES: usize = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisResponse {
    recommendation: String,
    confidence: f64,
    #[serde(default)]
    key_findings: Vec<String>,
    #[serde(default)]
    additional_info_needed: Option<Vec<String>>,
}

pub struct RecommendationSynthesizer {
    oracle: Arc<dyn Oracle>,
}

impl RecommendationSynthesizer {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    /// Produce the final human-facing summary over the relevant nodes.
    pub async fn synthesize(
        &self,
        relevant_nodes: &[RelevantNode],
        case_information: &Value,
    ) -> String {
        let prompt = build_prompt(relevant_nodes, case_information);

        let outcome = self.oracle.complete(&prompt, &synthesis_schema()).await;
        let parsed = outcome.and_then(|value| {
            serde_json::from_value::<SynthesisResponse>(value)
                .map_err(|e| crate::services::oracle_client::OracleError::Schema(e.to_string()))
        });

        match parsed {
            Ok(response) => {
                tracing::info!(
                    confidence = response.confidence,
                    key_findings = response.key_findings.len(),
                    additional_info = response
                        .additional_info_needed
                        .as_ref()
                        .map(Vec::len)
                        .unwrap_or(0),
                    "Recommendation synthesised"
                );
                response.recommendation
            }
            Err(e) => {
                tracing::warn!(
                    kind = e.kind().as_str(),
                    error = %e,
                    "Recommendation synthesis failed, using fallback"
                );
                FALLBACK_RECOMMENDATION.to_string()
            }
        }
    }
}

fn build_prompt(relevant_nodes: &[RelevantNode], case_information: &Value) -> String {
    let mut prompt = String::from(
        "Summarise how the statute sections below apply to the case and \
         recommend next steps for the consumer.\n\nCase information:\n",
    );
    prompt.push_str(
        &serde_json::to_string_pretty(case_information)
            .unwrap_or_else(|_| case_information.to_string()),
    );

    if relevant_nodes.is_empty() {
        prompt.push_str(
            "\n\nNo statute sections were found relevant; say so and suggest \
             what further case details would help.",
        );
        return prompt;
    }

    prompt.push_str("\n\nRelevant sections (most relevant levels first):\n");
    for node in relevant_nodes.iter().take(MAX_DETAILED_NODES) {
        prompt.push_str(&format!(
            "- {} (score {:.2}): {}\n",
            node.title, node.relevance_score, node.reasoning
        ));
    }
    if relevant_nodes.len() > MAX_DETAILED_NODES {
        prompt.push_str("\nFurther relevant sections by title:\n");
        for node in relevant_nodes.iter().skip(MAX_DETAILED_NODES) {
            prompt.push_str(&format!("- {}\n", node.title));
        }
    }

    prompt
}

fn synthesis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "recommendation": {"type": "string"},
            "confidence": {"type": "number", "minimum": 0.0, "maximum": 1.0},
            "keyFindings": {"type": "array", "items": {"type": "string"}},
            "additionalInfoNeeded": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["recommendation", "confidence", "keyFindings"],
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::oracle_client::OracleError;
    use async_trait::async_trait;

    struct FixedOracle(Result<Value, &'static str>);

    #[async_trait]
    impl Oracle for FixedOracle {
        async fn complete(&self, _prompt: &str, _schema: &Value) -> Result<Value, OracleError> {
            match &self.0 {
                Ok(value) => Ok(value.clone()),
                Err(message) => Err(OracleError::Network(message.to_string())),
            }
        }
    }

    fn relevant(title: &str) -> RelevantNode {
        RelevantNode {
            id: title.to_string(),
            title: title.to_string(),
            level: 1,
            content: String::new(),
            metadata: Default::default(),
            relevance_score: 0.9,
            reasoning: "applies directly".to_string(),
        }
    }

    #[tokio::test]
    async fn test_synthesis_returns_recommendation() {
        let oracle = Arc::new(FixedOracle(Ok(json!({
            "recommendation": "Pursue a repair or replacement under section 23.",
            "confidence": 0.85,
            "keyFindings": ["Goods were not of satisfactory quality"],
        }))));
        let synthesizer = RecommendationSynthesizer::new(oracle);

        let recommendation = synthesizer
            .synthesize(&[relevant("23 Right to repair or replacement")], &json!({}))
            .await;

        assert_eq!(
            recommendation,
            "Pursue a repair or replacement under section 23."
        );
    }

    #[tokio::test]
    async fn test_synthesis_failure_uses_fallback() {
        let oracle = Arc::new(FixedOracle(Err("connection refused")));
        let synthesizer = RecommendationSynthesizer::new(oracle);

        let recommendation = synthesizer.synthesize(&[], &json!({})).await;
        assert_eq!(recommendation, FALLBACK_RECOMMENDATION);
    }

    #[tokio::test]
    async fn test_schema_violation_uses_fallback() {
        let oracle = Arc::new(FixedOracle(Ok(json!({"wrong": "shape"}))));
        let synthesizer = RecommendationSynthesizer::new(oracle);

        let recommendation = synthesizer.synthesize(&[], &json!({})).await;
        assert_eq!(recommendation, FALLBACK_RECOMMENDATION);
    }

    #[test]
    fn test_prompt_mentions_sections_and_case() {
        let prompt = build_prompt(
            &[relevant("9 Satisfactory quality")],
            &json!({"issue": "cracked screen"}),
        );
        assert!(prompt.contains("cracked screen"));
        assert!(prompt.contains("9 Satisfactory quality"));
        assert!(prompt.contains("score 0.90"));
    }

    #[test]
    fn test_prompt_handles_empty_relevant_set() {
        let prompt = build_prompt(&[], &json!({}));
        assert!(prompt.contains("No statute sections were found relevant"));
    }
}
