use crate::error::BridgeError;
use crate::temperature::TemperatureRange;
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use uuid::Uuid;

// This file implements the subset of the Yandex Smart Home IoT API that
// is needed to drive a single light:
// <https://yandex.ru/dev/dialogs/smart-home/doc/concepts/platform-protocol.html>

pub const SERVER: &str = "https://api.iot.yandex.net/v1.0";
const TIMEOUT: Duration = Duration::from_secs(60);

/// The operations the accessory needs from the vendor API.
/// The lightbulb only ever talks to the cloud through this trait.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Fetch the device descriptor, including the current state
    /// of each of its capabilities.
    async fn get_device_info(&self, device_id: &str) -> Result<DeviceInfo, BridgeError>;

    /// Apply a single capability action to the device
    async fn send_action(
        &self,
        device_id: &str,
        action: CapabilityAction,
    ) -> Result<(), BridgeError>;
}

#[derive(Clone)]
pub struct YandexIotClient {
    base_url: String,
    authorization: String,
}

impl std::fmt::Debug for YandexIotClient {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("YandexIotClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl YandexIotClient {
    pub fn with_base_url<B: Into<String>, A: Into<String>>(base_url: B, authorization: A) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            authorization: authorization.into(),
        }
    }

    fn endpoint(&self, url: &str) -> String {
        format!("{}{url}", self.base_url)
    }

    /// Returns the household information for the account that owns
    /// the token, including every device it can see.
    pub async fn get_user_info(&self) -> Result<UserInfo, BridgeError> {
        let url = self.endpoint("/user/info");
        self.request_with_json_response::<(), _>(Method::GET, url, None)
            .await
    }
}

#[async_trait]
impl DeviceClient for YandexIotClient {
    async fn get_device_info(&self, device_id: &str) -> Result<DeviceInfo, BridgeError> {
        let url = self.endpoint(&format!("/devices/{device_id}"));
        let info: DeviceInfo = self
            .request_with_json_response::<(), _>(Method::GET, url, None)
            .await?;
        log::trace!("get_device_info {device_id}: {info:#?}");
        Ok(info)
    }

    async fn send_action(
        &self,
        device_id: &str,
        action: CapabilityAction,
    ) -> Result<(), BridgeError> {
        let url = self.endpoint("/devices/actions");
        let request = DeviceActionsRequest {
            devices: vec![DeviceActions {
                id: device_id.to_string(),
                actions: vec![action],
            }],
        };

        let resp: DeviceActionsResponse = self
            .request_with_json_response(Method::POST, url, Some(&request))
            .await?;

        resp.check_action_results()
    }
}

#[derive(Serialize, Debug)]
struct DeviceActionsRequest {
    pub devices: Vec<DeviceActions>,
}

#[derive(Serialize, Debug)]
struct DeviceActions {
    pub id: String,
    pub actions: Vec<CapabilityAction>,
}

/// A single `{type, state: {instance, value}}` action
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CapabilityAction {
    #[serde(rename = "type")]
    pub kind: DeviceCapabilityKind,
    pub state: CapabilityState,
}

impl CapabilityAction {
    pub fn new<I: Into<String>, V: Into<JsonValue>>(
        kind: DeviceCapabilityKind,
        instance: I,
        value: V,
    ) -> Self {
        Self {
            kind,
            state: CapabilityState {
                instance: instance.into(),
                value: value.into(),
            },
        }
    }
}

#[derive(Deserialize, Debug)]
struct DeviceActionsResponse {
    #[serde(default)]
    pub devices: Vec<DeviceActionsResult>,
}

#[derive(Deserialize, Debug)]
struct DeviceActionsResult {
    pub id: String,
    #[serde(default)]
    pub capabilities: Vec<CapabilityActionResult>,
}

#[derive(Deserialize, Debug)]
struct CapabilityActionResult {
    pub state: ActionResultState,
}

#[derive(Deserialize, Debug)]
struct ActionResultState {
    #[serde(default)]
    pub action_result: Option<ActionResult>,
}

#[derive(Deserialize, Debug)]
struct ActionResult {
    pub status: String,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl DeviceActionsResponse {
    fn check_action_results(&self) -> Result<(), BridgeError> {
        for device in &self.devices {
            for cap in &device.capabilities {
                if let Some(result) = &cap.state.action_result {
                    if result.status.eq_ignore_ascii_case("ERROR") {
                        return Err(BridgeError::ActionRejected {
                            device_id: device.id.clone(),
                            code: result.error_code.clone().unwrap_or_default(),
                            message: result.error_message.clone().unwrap_or_default(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// The fields common to every response body
#[derive(Deserialize, Debug)]
struct ResponseEnvelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct UserInfo {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub devices: Vec<DeviceInfo>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DeviceInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub device_type: DeviceType,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<DeviceCapability>,
}

#[derive(
    Deserialize, Serialize, Debug, Default, Clone, Copy, PartialEq, Eq, strum_macros::Display,
)]
pub enum DeviceType {
    #[serde(rename = "devices.types.light")]
    #[strum(serialize = "devices.types.light")]
    #[default]
    Light,
    #[serde(rename = "devices.types.socket")]
    #[strum(serialize = "devices.types.socket")]
    Socket,
    #[serde(rename = "devices.types.switch")]
    #[strum(serialize = "devices.types.switch")]
    Switch,
    #[serde(other)]
    #[strum(serialize = "other")]
    Other,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum DeviceCapabilityKind {
    #[serde(rename = "devices.capabilities.on_off")]
    #[strum(serialize = "on_off")]
    OnOff,
    #[serde(rename = "devices.capabilities.range")]
    #[strum(serialize = "range")]
    Range,
    #[serde(rename = "devices.capabilities.color_setting")]
    #[strum(serialize = "color_setting")]
    ColorSetting,
    #[serde(rename = "devices.capabilities.mode")]
    #[strum(serialize = "mode")]
    Mode,
    #[serde(rename = "devices.capabilities.toggle")]
    #[strum(serialize = "toggle")]
    Toggle,
    #[serde(other)]
    #[strum(serialize = "other")]
    Other,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DeviceCapability {
    #[serde(rename = "type")]
    pub kind: DeviceCapabilityKind,
    #[serde(default)]
    pub retrievable: bool,
    #[serde(default)]
    pub parameters: CapabilityParameters,
    #[serde(default)]
    pub state: Option<CapabilityState>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct CapabilityParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<NumberRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_k: Option<TemperatureRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_model: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct NumberRange {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub precision: Option<f64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CapabilityState {
    pub instance: String,
    pub value: JsonValue,
}

pub fn from_json<T: serde::de::DeserializeOwned, S: AsRef<[u8]>>(text: S) -> Result<T, BridgeError> {
    let text = text.as_ref();
    serde_json_path_to_error::from_slice(text).map_err(|err| {
        BridgeError::MalformedResponse(format!(
            "{err}. Input: {}",
            String::from_utf8_lossy(text)
        ))
    })
}

/// Decodes a successful response body, surfacing an in-band
/// `"status": "error"` as an error of its own.
fn api_body<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T, BridgeError> {
    let envelope: ResponseEnvelope = from_json(data)?;
    if envelope
        .status
        .as_deref()
        .map(|s| s.eq_ignore_ascii_case("error"))
        .unwrap_or(false)
    {
        return Err(BridgeError::Api {
            request_id: envelope.request_id.unwrap_or_default(),
            message: envelope.message.unwrap_or_default(),
        });
    }
    from_json(data)
}

async fn http_response_body<R: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<R, BridgeError> {
    let url = response.url().to_string();

    let status = response.status();
    let body_bytes = response
        .bytes()
        .await
        .map_err(|source| BridgeError::Transport {
            url: url.clone(),
            source,
        })?;

    if !status.is_success() {
        return Err(BridgeError::Status {
            url,
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body_bytes).to_string(),
        });
    }

    api_body(&body_bytes)
}

impl YandexIotClient {
    async fn request_with_json_response<B: serde::Serialize, R: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        url: String,
        body: Option<&B>,
    ) -> Result<R, BridgeError> {
        let transport = |source| BridgeError::Transport {
            url: url.clone(),
            source,
        };

        let mut request = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(transport)?
            .request(method, &url)
            .header("Authorization", &self.authorization)
            .header("X-Request-Id", Uuid::new_v4().to_string());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(transport)?;

        http_response_body(response).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DEVICE_INFO: &str = include_str!("../test-data/device_info.json");
    const USER_INFO: &str = include_str!("../test-data/user_info.json");

    #[test]
    fn parse_device_info() {
        let info: DeviceInfo = from_json(DEVICE_INFO).unwrap();
        k9::assert_equal!(info.device_type, DeviceType::Light);
        assert_eq!(info.name, "Лампа");
        let kinds: Vec<_> = info.capabilities.iter().map(|c| c.kind).collect();
        k9::assert_equal!(
            kinds,
            vec![
                DeviceCapabilityKind::OnOff,
                DeviceCapabilityKind::ColorSetting,
                DeviceCapabilityKind::Range,
                DeviceCapabilityKind::Other,
            ]
        );
        let color = &info.capabilities[1].parameters;
        k9::assert_equal!(
            color.temperature_k,
            Some(TemperatureRange::new(2700, 6500).unwrap())
        );
        k9::assert_equal!(color.color_model.as_deref(), Some("hsv"));
    }

    #[test]
    fn parse_user_info() {
        let info: UserInfo = from_json(USER_INFO).unwrap();
        k9::assert_equal!(info.devices.len(), 2);
        k9::assert_equal!(info.devices[1].device_type, DeviceType::Other);
        k9::assert_equal!(info.devices[0].room.as_deref(), Some("kitchen-room-id"));
    }

    #[test]
    fn malformed_body_reports_path() {
        let err =
            from_json::<DeviceInfo, _>(r#"{"id": "x", "capabilities": "nope"}"#).unwrap_err();
        match err {
            BridgeError::MalformedResponse(msg) => {
                assert!(msg.contains("capabilities"), "{msg}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn in_band_error_status() {
        let err = api_body::<DeviceInfo>(
            br#"{"status": "error", "request_id": "r1", "message": "DEVICE_NOT_FOUND"}"#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Yandex IoT API error (request_id r1): DEVICE_NOT_FOUND"
        );
    }

    #[test]
    fn action_envelope() {
        let request = DeviceActionsRequest {
            devices: vec![DeviceActions {
                id: "lamp".to_string(),
                actions: vec![CapabilityAction::new(
                    DeviceCapabilityKind::Range,
                    "brightness",
                    75,
                )],
            }],
        };
        k9::assert_equal!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "devices": [{
                    "id": "lamp",
                    "actions": [{
                        "type": "devices.capabilities.range",
                        "state": {"instance": "brightness", "value": 75},
                    }],
                }],
            })
        );
    }

    #[tokio::test]
    async fn get_device_info_sends_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/devices/lamp-1"))
            .and(header("Authorization", "Bearer secret"))
            .and(header_exists("X-Request-Id"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DEVICE_INFO))
            .expect(1)
            .mount(&server)
            .await;

        let client = YandexIotClient::with_base_url(server.uri(), "Bearer secret");
        let info = client.get_device_info("lamp-1").await.unwrap();
        k9::assert_equal!(info.capabilities.len(), 4);
    }

    #[tokio::test]
    async fn send_action_posts_single_action() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/devices/actions"))
            .and(header("Authorization", "token"))
            .and(body_json(json!({
                "devices": [{
                    "id": "lamp-1",
                    "actions": [{
                        "type": "devices.capabilities.on_off",
                        "state": {"instance": "on", "value": true},
                    }],
                }],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "request_id": "abc",
                "devices": [{
                    "id": "lamp-1",
                    "capabilities": [{
                        "type": "devices.capabilities.on_off",
                        "state": {
                            "instance": "on",
                            "action_result": {"status": "DONE"},
                        },
                    }],
                }],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = YandexIotClient::with_base_url(format!("{}/", server.uri()), "token");
        client
            .send_action(
                "lamp-1",
                CapabilityAction::new(DeviceCapabilityKind::OnOff, "on", true),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn send_action_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/devices/actions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "request_id": "abc",
                "devices": [{
                    "id": "lamp-1",
                    "capabilities": [{
                        "type": "devices.capabilities.range",
                        "state": {
                            "instance": "brightness",
                            "action_result": {
                                "status": "ERROR",
                                "error_code": "DEVICE_UNREACHABLE",
                                "error_message": "lamp is offline",
                            },
                        },
                    }],
                }],
            })))
            .mount(&server)
            .await;

        let client = YandexIotClient::with_base_url(server.uri(), "token");
        let err = client
            .send_action(
                "lamp-1",
                CapabilityAction::new(DeviceCapabilityKind::Range, "brightness", 10),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "device lamp-1 rejected the action: DEVICE_UNREACHABLE: lamp is offline"
        );
    }

    #[tokio::test]
    async fn http_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/devices/lamp-1"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let client = YandexIotClient::with_base_url(server.uri(), "bad");
        match client.get_device_info("lamp-1").await.unwrap_err() {
            BridgeError::Status { status, body, .. } => {
                k9::assert_equal!(status, 401);
                assert_eq!(body, "unauthorized");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/devices/lamp-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = YandexIotClient::with_base_url(server.uri(), "token");
        assert!(matches!(
            client.get_device_info("lamp-1").await.unwrap_err(),
            BridgeError::MalformedResponse(_)
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        // Nothing listens on port 9 on the loopback interface
        let client = YandexIotClient::with_base_url("http://127.0.0.1:9", "token");
        assert!(matches!(
            client.get_device_info("lamp-1").await.unwrap_err(),
            BridgeError::Transport { .. }
        ));
    }
}
