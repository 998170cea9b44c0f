use crate::error::BridgeError;
use crate::iot_api::{CapabilityState, DeviceCapability, DeviceCapabilityKind};
use crate::temperature::TemperatureRange;
use serde_json::{Number as JsonNumber, Value as JsonValue};

pub const INSTANCE_ON: &str = "on";
pub const INSTANCE_BRIGHTNESS: &str = "brightness";
pub const INSTANCE_TEMPERATURE_K: &str = "temperature_k";
pub const INSTANCE_COLOR_MODEL: &str = "color_model";

/// A vendor capability that the lightbulb knows how to expose,
/// decoded from the raw descriptor list.
#[derive(Debug, Clone, PartialEq)]
pub enum Capability {
    OnOff {
        on: Option<bool>,
    },
    Brightness {
        value: Option<JsonNumber>,
    },
    ColorTemperature {
        range: TemperatureRange,
        kelvin: Option<f64>,
    },
    ColorModel {
        hue: Option<JsonNumber>,
    },
}

/// Identifies a `Capability` variant without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityTag {
    OnOff,
    Brightness,
    ColorTemperature,
    ColorModel,
}

impl CapabilityTag {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OnOff => "on_off",
            Self::Brightness => "brightness range",
            Self::ColorTemperature => "color temperature",
            Self::ColorModel => "color model",
        }
    }
}

impl Capability {
    pub fn tag(&self) -> CapabilityTag {
        match self {
            Self::OnOff { .. } => CapabilityTag::OnOff,
            Self::Brightness { .. } => CapabilityTag::Brightness,
            Self::ColorTemperature { .. } => CapabilityTag::ColorTemperature,
            Self::ColorModel { .. } => CapabilityTag::ColorModel,
        }
    }

    /// Decodes a single raw descriptor. A color_setting descriptor
    /// can yield both a temperature and a color model capability.
    pub fn decode(raw: &DeviceCapability) -> Vec<Capability> {
        let state = raw.state.as_ref();
        match raw.kind {
            DeviceCapabilityKind::OnOff => vec![Self::OnOff {
                on: state.and_then(|s| s.value.as_bool()),
            }],
            DeviceCapabilityKind::Range
                if raw.parameters.instance.as_deref() == Some(INSTANCE_BRIGHTNESS) =>
            {
                vec![Self::Brightness {
                    value: state.and_then(|s| number(&s.value)),
                }]
            }
            DeviceCapabilityKind::ColorSetting => {
                let mut result = vec![];
                if let Some(range) = raw.parameters.temperature_k {
                    if range.is_valid() {
                        result.push(Self::ColorTemperature {
                            range,
                            kelvin: state.and_then(kelvin_from_state),
                        });
                    } else {
                        log::warn!("ignoring color temperature with unusable range {range}");
                    }
                }
                if raw.parameters.color_model.is_some() {
                    result.push(Self::ColorModel {
                        hue: state.and_then(hue_from_state),
                    });
                }
                result
            }
            _ => vec![],
        }
    }
}

/// The decoded capabilities of one device snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilitySet {
    caps: Vec<Capability>,
}

impl CapabilitySet {
    pub fn decode(raw: &[DeviceCapability]) -> Self {
        Self {
            caps: raw.iter().flat_map(Capability::decode).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.caps.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }

    pub fn find(&self, tag: CapabilityTag) -> Result<&Capability, BridgeError> {
        self.caps
            .iter()
            .find(|c| c.tag() == tag)
            .ok_or(BridgeError::CapabilityNotFound(tag.name()))
    }
}

fn number(value: &JsonValue) -> Option<JsonNumber> {
    match value {
        JsonValue::Number(n) => Some(n.clone()),
        _ => None,
    }
}

fn kelvin_from_state(state: &CapabilityState) -> Option<f64> {
    if state.instance != INSTANCE_TEMPERATURE_K {
        return None;
    }
    state.value.as_f64()
}

/// The hue is the `h` member of an hsv color, or the bare value
/// for any instance that is not some other color representation.
fn hue_from_state(state: &CapabilityState) -> Option<JsonNumber> {
    match (state.instance.as_str(), &state.value) {
        (INSTANCE_TEMPERATURE_K | "rgb", _) => None,
        (_, JsonValue::Object(hsv)) => hsv.get("h").and_then(number),
        (_, value) => number(value),
    }
}
