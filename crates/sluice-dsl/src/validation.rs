use std::collections::{HashSet, VecDeque};
use std::error::Error;
use std::fmt;

use crate::error::DslError;
use crate::flow::{FlowElementKind, FlowModel};

/// Represents a problem found while validating a flow model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Error code (one of [`error_codes`])
    pub code: &'static str,

    /// Human-readable error message
    pub message: String,

    /// Key of the offending element, if the problem is local to one
    pub path: Option<String>,
}

impl ValidationError {
    /// A model-wide problem
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    /// A problem located at one element
    pub fn at(code: &'static str, message: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(key.into()),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}: {} (at {})", self.code, self.message, path)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl Error for ValidationError {}

/// Validation error codes
pub mod error_codes {
    /// The model has no start event
    pub const MISSING_START_EVENT: &str = "ERR_DSL_VALIDATION_MISSING_START_EVENT";

    /// The model has more than one start event
    pub const MULTIPLE_START_EVENTS: &str = "ERR_DSL_VALIDATION_MULTIPLE_START_EVENTS";

    /// The model has no end event
    pub const MISSING_END_EVENT: &str = "ERR_DSL_VALIDATION_MISSING_END_EVENT";

    /// A sequence flow points at a missing element or at another flow
    pub const INVALID_REFERENCE: &str = "ERR_DSL_VALIDATION_INVALID_REFERENCE";

    /// A node has the wrong number of incoming or outgoing flows
    pub const INVALID_CONNECTION: &str = "ERR_DSL_VALIDATION_INVALID_CONNECTION";

    /// A gateway declares more than one default flow
    pub const MULTIPLE_DEFAULT_FLOWS: &str = "ERR_DSL_VALIDATION_MULTIPLE_DEFAULT_FLOWS";

    /// A node cannot be reached from the start event
    pub const UNREACHABLE_NODE: &str = "ERR_DSL_VALIDATION_UNREACHABLE_NODE";
}

/// A trait for validators that check one aspect of a flow model
pub trait Validator {
    /// Validate the model and return the problems found (if any)
    fn validate(&self, model: &FlowModel) -> Vec<ValidationError>;
}

/// Validate a parsed flow model, collecting every problem found
pub fn validate_flow_model(model: &FlowModel) -> Result<(), DslError> {
    let validators: Vec<Box<dyn Validator>> = vec![
        Box::new(EventValidator),
        Box::new(ConnectionValidator),
        Box::new(ReachabilityValidator),
    ];

    let errors: Vec<ValidationError> = validators
        .iter()
        .flat_map(|validator| validator.validate(model))
        .collect();

    match DslError::from_validation_errors(errors) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Exactly one start event, at least one end event
struct EventValidator;

impl Validator for EventValidator {
    fn validate(&self, model: &FlowModel) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let count = |kind: &FlowElementKind| model.elements().iter().filter(|e| &e.kind == kind).count();

        match count(&FlowElementKind::StartEvent) {
            0 => errors.push(ValidationError::new(
                error_codes::MISSING_START_EVENT,
                "Flow model must contain a start event",
            )),
            1 => {}
            n => errors.push(ValidationError::new(
                error_codes::MULTIPLE_START_EVENTS,
                format!("Flow model must contain exactly one start event, found {}", n),
            )),
        }

        if count(&FlowElementKind::EndEvent) == 0 {
            errors.push(ValidationError::new(
                error_codes::MISSING_END_EVENT,
                "Flow model must contain at least one end event",
            ));
        }

        errors
    }
}

/// Edge endpoints and per-kind fan-in / fan-out rules
struct ConnectionValidator;

impl Validator for ConnectionValidator {
    fn validate(&self, model: &FlowModel) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for element in model.elements() {
            if let Some((source, target)) = element.endpoints() {
                for endpoint in [source, target] {
                    match model.get(endpoint) {
                        Some(node) if node.kind.is_node() => {}
                        Some(_) => errors.push(ValidationError::at(
                            error_codes::INVALID_REFERENCE,
                            format!("Sequence flow endpoint '{}' is itself a sequence flow", endpoint),
                            &element.key,
                        )),
                        None => errors.push(ValidationError::at(
                            error_codes::INVALID_REFERENCE,
                            format!("Sequence flow references unknown element '{}'", endpoint),
                            &element.key,
                        )),
                    }
                }
                continue;
            }

            let incoming = model.incoming(&element.key).count();
            let outgoing: Vec<_> = model.outgoing(&element.key).collect();

            match element.kind {
                FlowElementKind::StartEvent => {
                    if incoming != 0 {
                        errors.push(ValidationError::at(
                            error_codes::INVALID_CONNECTION,
                            "Start event must not have incoming flows",
                            &element.key,
                        ));
                    }
                    if outgoing.len() != 1 {
                        errors.push(ValidationError::at(
                            error_codes::INVALID_CONNECTION,
                            format!("Start event must have exactly one outgoing flow, found {}", outgoing.len()),
                            &element.key,
                        ));
                    }
                }
                FlowElementKind::UserTask => {
                    if outgoing.len() != 1 {
                        errors.push(ValidationError::at(
                            error_codes::INVALID_CONNECTION,
                            format!("User task must have exactly one outgoing flow, found {}", outgoing.len()),
                            &element.key,
                        ));
                    }
                }
                FlowElementKind::EndEvent => {
                    if !outgoing.is_empty() {
                        errors.push(ValidationError::at(
                            error_codes::INVALID_CONNECTION,
                            "End event must not have outgoing flows",
                            &element.key,
                        ));
                    }
                }
                FlowElementKind::ExclusiveGateway => {
                    if outgoing.is_empty() {
                        errors.push(ValidationError::at(
                            error_codes::INVALID_CONNECTION,
                            "Exclusive gateway must have at least one outgoing flow",
                            &element.key,
                        ));
                    }
                    let defaults = outgoing
                        .iter()
                        .filter(|flow| {
                            matches!(flow.kind, FlowElementKind::SequenceFlow { is_default: true, .. })
                        })
                        .count();
                    if defaults > 1 {
                        errors.push(ValidationError::at(
                            error_codes::MULTIPLE_DEFAULT_FLOWS,
                            format!("Exclusive gateway has {} default flows", defaults),
                            &element.key,
                        ));
                    }
                }
                FlowElementKind::SequenceFlow { .. } => {}
            }
        }

        errors
    }
}

/// Every node reachable from the start event
struct ReachabilityValidator;

impl Validator for ReachabilityValidator {
    fn validate(&self, model: &FlowModel) -> Vec<ValidationError> {
        // A missing start event is reported by EventValidator
        let Ok(start) = model.start_event() else {
            return Vec::new();
        };

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        visited.insert(start.key.as_str());
        queue.push_back(start.key.as_str());

        while let Some(current) = queue.pop_front() {
            for flow in model.outgoing(current) {
                if let Some((_, target)) = flow.endpoints() {
                    if model.contains(target) && visited.insert(target) {
                        queue.push_back(target);
                    }
                }
            }
        }

        model
            .elements()
            .iter()
            .filter(|element| element.kind.is_node() && !visited.contains(element.key.as_str()))
            .map(|element| {
                ValidationError::at(
                    error_codes::UNREACHABLE_NODE,
                    "Node is not reachable from the start event",
                    &element.key,
                )
            })
            .collect()
    }
}
