//! Data model for the traversal engine

pub mod decision;
pub mod node;
pub mod traversal;

pub use decision::{TraversalContext, TraversalDecision};
pub use node::{DocumentTree, LegalNode, NodeMetadata};
pub use traversal::{
    DepthStatistics, RelevantNode, ScoreDistribution, TraversalResult, TraversalStatistics,
};
