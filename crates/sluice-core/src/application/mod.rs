/// Gateway condition evaluation
pub mod condition;

/// Deployment lookup with a read-through cache
pub mod flow_model_resolver;

/// Graph walk over a flow model
pub mod executor;

/// Request parameters
pub mod param;

/// Response envelopes
pub mod result;

/// History views
pub mod history;

/// Lifecycle coordinator
pub mod runtime_processor;

/// Flow model deployment
pub mod flow_definition_service;

/// Engine facade
pub mod process_engine;
