//! Opaque circuit payload.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientResult;

/// A serialized circuit as the server expects it.
///
/// The client never inspects the contents. JSON documents (Qibo's raw circuit
/// representation) are sent as is; any other text, such as OpenQASM, is sent
/// as a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CircuitPayload(Value);

impl CircuitPayload {
    /// Wrap an already serialized circuit.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Interpret `source` as JSON, falling back to a plain string.
    pub fn parse(source: &str) -> Self {
        serde_json::from_str(source).map_or_else(|_| Self(Value::String(source.to_string())), Self)
    }

    /// Read a circuit from a file.
    pub fn from_file(path: impl AsRef<Path>) -> ClientResult<Self> {
        let source = fs::read_to_string(path)?;
        Ok(Self::parse(&source))
    }

    /// The serialized form.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume the payload, returning the serialized form.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for CircuitPayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
