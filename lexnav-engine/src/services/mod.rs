//! Engine services

pub mod batch_evaluator;
pub mod context_builder;
pub mod document_normalizer;
pub mod evaluation_matcher;
pub mod oracle_client;
pub mod recommendation_synthesizer;
pub mod result_store;
pub mod traversal_driver;
pub mod tree_validator;

pub use batch_evaluator::BatchEvaluator;
pub use oracle_client::{HttpOracle, Oracle, OracleError, OracleSettings};
pub use recommendation_synthesizer::RecommendationSynthesizer;
pub use result_store::{ResultStore, StoreError};
pub use traversal_driver::TraversalDriver;
