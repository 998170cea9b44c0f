use crate::accessory::characteristic::CharacteristicKind;
use thiserror::Error;

/// Errors produced while talking to the Yandex IoT API or while
/// servicing a characteristic get/set on behalf of the host.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The request never produced a response: DNS, connect, timeout.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request {url} status {status}. Response body: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The API answered with `"status": "error"`
    #[error("Yandex IoT API error (request_id {request_id}): {message}")]
    Api { request_id: String, message: String },

    #[error("device {device_id} rejected the action: {code}: {message}")]
    ActionRejected {
        device_id: String,
        code: String,
        message: String,
    },

    #[error("device does not report a {0} capability")]
    CapabilityNotFound(&'static str),

    #[error("color temperature range is unknown; the temperature capability was never read")]
    TemperatureRangeUnknown,

    #[error("invalid value for {kind}: {reason}")]
    InvalidValue {
        kind: CharacteristicKind,
        reason: String,
    },

    #[error("characteristic {0} is not bound on this accessory")]
    NotBound(CharacteristicKind),
}

impl BridgeError {
    pub fn invalid_value<R: Into<String>>(kind: CharacteristicKind, reason: R) -> Self {
        Self::InvalidValue {
            kind,
            reason: reason.into(),
        }
    }
}
