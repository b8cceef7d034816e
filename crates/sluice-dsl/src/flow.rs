use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::DslError;

/// The kind of a flow element, with the data that only some kinds carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FlowElementKind {
    /// Entry point of the flow
    StartEvent,

    /// Terminal node; reaching it completes the process instance
    EndEvent,

    /// Pauses execution until a caller commits data
    UserTask,

    /// Picks exactly one outgoing flow by evaluating conditions
    ExclusiveGateway,

    /// A directed edge between two nodes
    #[serde(rename_all = "camelCase")]
    SequenceFlow {
        /// Key of the upstream node
        source: String,
        /// Key of the downstream node
        target: String,
        /// JMESPath expression evaluated against the instance data
        #[serde(default, skip_serializing_if = "Option::is_none")]
        condition: Option<String>,
        /// Taken by a gateway when no conditional flow matches
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_default: bool,
    },
}

impl FlowElementKind {
    /// Whether this element is an edge
    pub fn is_sequence_flow(&self) -> bool {
        matches!(self, FlowElementKind::SequenceFlow { .. })
    }

    /// Whether this element is a node (anything but an edge)
    pub fn is_node(&self) -> bool {
        !self.is_sequence_flow()
    }

    /// Whether execution may pause at this element awaiting a commit
    pub fn is_suspension_point(&self) -> bool {
        match self {
            FlowElementKind::UserTask => true,
            FlowElementKind::StartEvent
            | FlowElementKind::EndEvent
            | FlowElementKind::ExclusiveGateway
            | FlowElementKind::SequenceFlow { .. } => false,
        }
    }

    /// The serialized tag of this kind
    pub fn type_name(&self) -> &'static str {
        match self {
            FlowElementKind::StartEvent => "startEvent",
            FlowElementKind::EndEvent => "endEvent",
            FlowElementKind::UserTask => "userTask",
            FlowElementKind::ExclusiveGateway => "exclusiveGateway",
            FlowElementKind::SequenceFlow { .. } => "sequenceFlow",
        }
    }
}

/// One node or edge in a flow model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowElement {
    /// Unique key of the element within its model
    pub key: String,

    /// Optional human-readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Element kind
    #[serde(flatten)]
    pub kind: FlowElementKind,

    /// Free-form properties (arbitrary key-value pairs)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl FlowElement {
    /// Create a new element with no name and no properties
    pub fn new(key: impl Into<String>, kind: FlowElementKind) -> Self {
        Self {
            key: key.into(),
            name: None,
            kind,
            properties: Map::new(),
        }
    }

    /// Set the element name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a property
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// The name shown to users: `name`, else the `name` property, else empty
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        self.properties
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Source and target keys, if this is a sequence flow
    pub fn endpoints(&self) -> Option<(&str, &str)> {
        match &self.kind {
            FlowElementKind::SequenceFlow { source, target, .. } => {
                Some((source.as_str(), target.as_str()))
            }
            _ => None,
        }
    }
}

/// The serialized form of a flow model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowModelDocument {
    /// All elements of the model, in declaration order
    #[serde(default)]
    pub flow_element_list: Vec<FlowElement>,
}

/// A parsed flow model: elements keyed for lookup, declaration order preserved
#[derive(Debug, Clone, Default)]
pub struct FlowModel {
    elements: Vec<FlowElement>,
    index: HashMap<String, usize>,
}

impl FlowModel {
    /// Build a model from a list of elements, rejecting duplicate keys
    pub fn new(elements: Vec<FlowElement>) -> Result<Self, DslError> {
        let mut index = HashMap::with_capacity(elements.len());
        for (position, element) in elements.iter().enumerate() {
            if index.insert(element.key.clone(), position).is_some() {
                return Err(DslError::DuplicateElementKey(element.key.clone()));
            }
        }
        Ok(Self { elements, index })
    }

    /// Look up an element, failing if the key is unknown
    pub fn element(&self, key: &str) -> Result<&FlowElement, DslError> {
        self.get(key)
            .ok_or_else(|| DslError::UnknownElementKey(key.to_string()))
    }

    /// Look up an element
    pub fn get(&self, key: &str) -> Option<&FlowElement> {
        self.index.get(key).map(|&position| &self.elements[position])
    }

    /// Whether the model has an element with this key
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// All elements in declaration order
    pub fn elements(&self) -> &[FlowElement] {
        &self.elements
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the model has no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The first start event in declaration order
    pub fn start_event(&self) -> Result<&FlowElement, DslError> {
        self.elements
            .iter()
            .find(|element| element.kind == FlowElementKind::StartEvent)
            .ok_or(DslError::MissingStartEvent)
    }

    /// Sequence flows leaving `node_key`, in declaration order
    pub fn outgoing<'a>(&'a self, node_key: &'a str) -> impl Iterator<Item = &'a FlowElement> + 'a {
        self.elements
            .iter()
            .filter(move |element| matches!(element.endpoints(), Some((source, _)) if source == node_key))
    }

    /// Sequence flows entering `node_key`, in declaration order
    pub fn incoming<'a>(&'a self, node_key: &'a str) -> impl Iterator<Item = &'a FlowElement> + 'a {
        self.elements
            .iter()
            .filter(move |element| matches!(element.endpoints(), Some((_, target)) if target == node_key))
    }

    /// The sequence flow that connects `source` to `target`, if any
    pub fn sequence_flow_between(&self, source: &str, target: &str) -> Option<&FlowElement> {
        self.elements
            .iter()
            .find(|element| element.endpoints() == Some((source, target)))
    }

    /// Convert back into the serialized document form
    pub fn to_document(&self) -> FlowModelDocument {
        FlowModelDocument {
            flow_element_list: self.elements.clone(),
        }
    }

    /// Serialize as a JSON model document
    pub fn to_json(&self) -> Result<String, DslError> {
        Ok(serde_json::to_string(&self.to_document())?)
    }
}

impl TryFrom<FlowModelDocument> for FlowModel {
    type Error = DslError;

    fn try_from(document: FlowModelDocument) -> Result<Self, Self::Error> {
        FlowModel::new(document.flow_element_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn flow(key: &str, source: &str, target: &str) -> FlowElement {
        FlowElement::new(
            key,
            FlowElementKind::SequenceFlow {
                source: source.to_string(),
                target: target.to_string(),
                condition: None,
                is_default: false,
            },
        )
    }

    fn sample_model() -> FlowModel {
        FlowModel::new(vec![
            FlowElement::new("Start", FlowElementKind::StartEvent),
            flow("F1", "Start", "A"),
            FlowElement::new("A", FlowElementKind::UserTask).with_name("Approve"),
            flow("F2", "A", "End"),
            FlowElement::new("End", FlowElementKind::EndEvent),
        ])
        .unwrap()
    }

    #[test]
    fn test_suspension_points() {
        assert!(FlowElementKind::UserTask.is_suspension_point());
        assert!(!FlowElementKind::StartEvent.is_suspension_point());
        assert!(!FlowElementKind::EndEvent.is_suspension_point());
        assert!(!FlowElementKind::ExclusiveGateway.is_suspension_point());
        assert!(!flow("F", "a", "b").kind.is_suspension_point());
        assert!(flow("F", "a", "b").kind.is_sequence_flow());
        assert!(FlowElementKind::UserTask.is_node());
    }

    #[test]
    fn test_lookup_and_navigation() {
        let model = sample_model();

        assert_eq!(model.len(), 5);
        assert_eq!(model.start_event().unwrap().key, "Start");
        assert_eq!(model.element("A").unwrap().display_name(), "Approve");
        assert!(matches!(
            model.element("Missing"),
            Err(DslError::UnknownElementKey(key)) if key == "Missing"
        ));

        let outgoing: Vec<_> = model.outgoing("A").map(|e| e.key.as_str()).collect();
        assert_eq!(outgoing, vec!["F2"]);
        let incoming: Vec<_> = model.incoming("A").map(|e| e.key.as_str()).collect();
        assert_eq!(incoming, vec!["F1"]);
        assert_eq!(model.sequence_flow_between("Start", "A").unwrap().key, "F1");
        assert!(model.sequence_flow_between("A", "Start").is_none());
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let result = FlowModel::new(vec![
            FlowElement::new("A", FlowElementKind::UserTask),
            FlowElement::new("A", FlowElementKind::EndEvent),
        ]);
        assert!(matches!(result, Err(DslError::DuplicateElementKey(key)) if key == "A"));
    }

    #[test]
    fn test_display_name_falls_back_to_property() {
        let element = FlowElement::new("A", FlowElementKind::UserTask)
            .with_property("name", json!("From properties"));
        assert_eq!(element.display_name(), "From properties");
        assert_eq!(FlowElement::new("B", FlowElementKind::UserTask).display_name(), "");
    }

    #[test]
    fn test_element_serialization_shape() {
        let element = FlowElement::new(
            "F1",
            FlowElementKind::SequenceFlow {
                source: "G".to_string(),
                target: "A".to_string(),
                condition: Some("amount > `10`".to_string()),
                is_default: false,
            },
        );
        let value = serde_json::to_value(&element).unwrap();
        assert_eq!(
            value,
            json!({
                "key": "F1",
                "type": "sequenceFlow",
                "source": "G",
                "target": "A",
                "condition": "amount > `10`"
            })
        );
    }
}
