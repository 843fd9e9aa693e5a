//! Shared test helpers: scripted oracle and tree construction
#![allow(dead_code)]

use async_trait::async_trait;
use lexnav_engine::models::{DocumentTree, LegalNode};
use lexnav_engine::services::oracle_client::{Oracle, OracleError};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Deterministic oracle: batch evaluation calls consume scripted responses
/// in order; the synthesis call (recognised by its schema) returns a fixed
/// recommendation.
pub struct ScriptedOracle {
    evaluations: Mutex<VecDeque<Result<Value, OracleError>>>,
    synthesis: Value,
    call_sizes: Mutex<Vec<usize>>,
}

impl ScriptedOracle {
    pub fn new(evaluations: Vec<Result<Value, OracleError>>) -> Self {
        Self {
            evaluations: Mutex::new(evaluations.into()),
            synthesis: synthesis_response("Scripted recommendation."),
            call_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_synthesis(mut self, synthesis: Value) -> Self {
        self.synthesis = synthesis;
        self
    }

    /// Node counts of the evaluation calls received so far.
    pub fn call_sizes(&self) -> Vec<usize> {
        self.call_sizes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, prompt: &str, schema: &Value) -> Result<Value, OracleError> {
        if schema.pointer("/properties/recommendation").is_some() {
            return Ok(self.synthesis.clone());
        }

        self.call_sizes
            .lock()
            .unwrap()
            .push(prompt.matches("nodeId:").count());
        self.evaluations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Network("no scripted response left".into())))
    }
}

/// One entry of a batch evaluation response.
pub fn evaluation(id: &str, score: f64, explore: bool) -> Value {
    json!({
        "nodeId": id,
        "isRelevant": score > 0.3,
        "relevanceScore": score,
        "reasoning": format!("scripted evaluation for {id}"),
        "shouldExploreChildren": explore
    })
}

pub fn batch_response(entries: Vec<Value>) -> Value {
    json!({ "nodeEvaluations": entries })
}

pub fn synthesis_response(recommendation: &str) -> Value {
    json!({
        "recommendation": recommendation,
        "confidence": 0.8,
        "keyFindings": ["scripted finding"],
    })
}

/// Build a consistent tree from (id, children) pairs and a root list.
/// Levels are assigned by walk from the roots.
pub fn tree(entries: &[(&str, &[&str])], roots: &[&str]) -> DocumentTree {
    let mut result = DocumentTree::default();
    for (id, children) in entries {
        let mut node = LegalNode::new(*id, format!("Title {id}"));
        node.children = children.iter().map(|c| c.to_string()).collect();
        result.nodes.insert(id.to_string(), node);
    }
    result.root_nodes = roots.iter().map(|r| r.to_string()).collect();

    // Assign depths from the roots
    let mut queue: VecDeque<(String, usize)> = result
        .root_nodes
        .iter()
        .map(|r| (r.clone(), 0))
        .collect();
    while let Some((id, depth)) = queue.pop_front() {
        let children = match result.nodes.get_mut(&id) {
            Some(node) => {
                node.level = depth;
                node.children.clone()
            }
            None => continue,
        };
        for child in children {
            queue.push_back((child, depth + 1));
        }
    }

    result
}
