//! Wire form of action lists.
//!
//! ```json
//! [
//!   { "action": "type_change", "parameters": { "column_id": "0001", "new_type": "integer" } },
//!   { "action": "delete_empty", "parameters": { "column_id": "0001" } }
//! ]
//! ```
//!
//! Unknown parameter keys and unknown top-level keys survive a round trip.

use super::{ActionError, ActionScope};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameter name selecting the target column
pub const COLUMN_ID: &str = "column_id";
/// Parameter name selecting the scope
pub const SCOPE: &str = "scope";
/// Parameter name selecting the target row in `line` scope
pub const ROW_ID: &str = "row_id";
/// Parameter name holding a row filter
pub const FILTER: &str = "filter";

/// Action parameters, an arbitrary JSON object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(Map<String, Value>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// String parameter; non-string values are ignored
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Required string parameter
    pub fn require_str(&self, name: &str) -> Result<&str, ActionError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Err(ActionError::MissingParameter(name.to_string())),
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(ActionError::invalid(name, "expected a string")),
        }
    }

    pub fn column_id(&self) -> Option<&str> {
        self.get_str(COLUMN_ID).filter(|s| !s.is_empty())
    }

    /// Requested scope, if any
    pub fn scope(&self) -> Result<Option<ActionScope>, ActionError> {
        match self.get_str(SCOPE) {
            None => Ok(None),
            Some(s) => ActionScope::from_name(s)
                .map(Some)
                .ok_or_else(|| ActionError::UnsupportedScope(s.to_string())),
        }
    }

    /// Target row id; accepts a JSON number or a numeric string
    pub fn row_id(&self) -> Result<Option<u64>, ActionError> {
        match self.0.get(ROW_ID) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| ActionError::invalid(ROW_ID, "expected a non-negative integer")),
            Some(Value::String(s)) => s
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| ActionError::invalid(ROW_ID, format!("'{}' is not a row id", s))),
            Some(_) => Err(ActionError::invalid(ROW_ID, "expected a row id")),
        }
    }
}

impl From<Map<String, Value>> for Parameters {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// One entry of an action list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionStep {
    /// Registry name of the action
    pub action: String,

    #[serde(default)]
    pub parameters: Parameters,

    /// Unknown top-level keys, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ActionStep {
    pub fn new(action: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            action: action.into(),
            parameters,
            extra: Map::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StepList {
    Plain(Vec<ActionStep>),
    Wrapped { actions: Vec<ActionStep> },
}

/// Parse an action list, either a bare array or `{ "actions": [...] }`
pub fn parse_steps(json: &str) -> serde_json::Result<Vec<ActionStep>> {
    Ok(match serde_json::from_str::<StepList>(json)? {
        StepList::Plain(steps) => steps,
        StepList::Wrapped { actions } => actions,
    })
}

/// Serialize an action list as a bare JSON array
pub fn steps_to_json(steps: &[ActionStep]) -> serde_json::Result<String> {
    serde_json::to_string(steps)
}
