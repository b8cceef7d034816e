//!
//! Sluice DSL - flow model documents for the Sluice process engine
//!
//! A deployed flow is a directed graph of typed elements: start and end
//! events, user tasks, exclusive gateways and the sequence flows that
//! connect them. This crate owns the element types, turns JSON or YAML
//! model documents into a keyed [`FlowModel`], and checks that a model is
//! structurally sound before it gets deployed.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Error types
pub mod error;

/// Flow elements and the keyed element map
pub mod flow;

/// Model document parsing
pub mod parser;

/// Structural model validation
pub mod validation;

pub use error::DslError;
pub use flow::{FlowElement, FlowElementKind, FlowModel, FlowModelDocument};
pub use parser::{parse, parse_and_validate, parse_flow_model, parse_flow_model_yaml, ModelFormat};
pub use validation::{validate_flow_model, ValidationError};
