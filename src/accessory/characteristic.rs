use crate::error::BridgeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// The host characteristics that a lightbulb service can carry
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum CharacteristicKind {
    On,
    Brightness,
    ColorTemperature,
    Hue,
    Saturation,
}

/// A characteristic value as exchanged with the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl CharacteristicValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(0) => Some(false),
            Self::Int(1) => Some(true),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Bool(_) => None,
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
        }
    }

    /// Returns the value if it is numeric, rejecting booleans
    pub fn numeric(self, kind: CharacteristicKind) -> Result<Self, BridgeError> {
        match self {
            Self::Int(_) | Self::Float(_) => Ok(self),
            Self::Bool(_) => Err(BridgeError::invalid_value(kind, "expected a number")),
        }
    }

    /// Converts a JSON number without losing integer-ness
    pub fn from_number(n: &serde_json::Number) -> Option<Self> {
        n.as_i64()
            .map(Self::Int)
            .or_else(|| n.as_f64().map(Self::Float))
    }
}

impl std::str::FromStr for CharacteristicValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("on") {
            return Ok(Self::Bool(true));
        }
        if s.eq_ignore_ascii_case("false") || s.eq_ignore_ascii_case("off") {
            return Ok(Self::Bool(false));
        }
        if let Ok(i) = s.parse::<i64>() {
            return Ok(Self::Int(i));
        }
        match s.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Self::Float(f)),
            _ => Err(format!("'{s}' is not a boolean or a number")),
        }
    }
}

impl std::fmt::Display for CharacteristicValue {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Bool(b) => b.fmt(fmt),
            Self::Int(i) => i.fmt(fmt),
            Self::Float(f) => f.fmt(fmt),
        }
    }
}

impl From<bool> for CharacteristicValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for CharacteristicValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for CharacteristicValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<CharacteristicValue> for JsonValue {
    fn from(value: CharacteristicValue) -> JsonValue {
        match value {
            CharacteristicValue::Bool(b) => b.into(),
            CharacteristicValue::Int(i) => i.into(),
            CharacteristicValue::Float(f) => f.into(),
        }
    }
}

/// The get/set pair that the host invokes for a bound characteristic
#[async_trait]
pub trait CharacteristicHandler: Send + Sync {
    async fn get(&self) -> Result<CharacteristicValue, BridgeError>;

    /// Applies the value and returns the value that the host
    /// should now consider current.
    async fn set(&self, value: CharacteristicValue) -> Result<CharacteristicValue, BridgeError>;
}

#[derive(Clone)]
pub struct Characteristic {
    pub kind: CharacteristicKind,
    handler: Arc<dyn CharacteristicHandler + Send + Sync + 'static>,
}

impl std::fmt::Debug for Characteristic {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("Characteristic")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Characteristic {
    pub fn new<H: CharacteristicHandler + Send + Sync + 'static>(
        kind: CharacteristicKind,
        handler: H,
    ) -> Self {
        Self {
            kind,
            handler: Arc::new(handler),
        }
    }

    pub async fn get(&self) -> Result<CharacteristicValue, BridgeError> {
        self.handler.get().await
    }

    pub async fn set(&self, value: CharacteristicValue) -> Result<CharacteristicValue, BridgeError> {
        self.handler.set(value).await
    }
}
