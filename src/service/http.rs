use crate::accessory::characteristic::{CharacteristicKind, CharacteristicValue};
use crate::accessory::lightbulb::LightbulbState;
use crate::accessory::service::{InformationProperties, ServiceKind};
use crate::accessory::AccessoryHandle;
use crate::error::BridgeError;
use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

pub type StateHandle = AccessoryHandle;

fn response_with_code<T: ToString + std::fmt::Display>(code: StatusCode, err: T) -> Response {
    if !code.is_success() {
        log::error!("err: {err:#}");
    }

    let mut response = Json(serde_json::json!({
        "code": code.as_u16(),
        "msg": format!("{err:#}")
    }))
    .into_response();
    *response.status_mut() = code;
    response
}

fn not_found<T: ToString + std::fmt::Display>(err: T) -> Response {
    response_with_code(StatusCode::NOT_FOUND, err)
}

fn bad_request<T: ToString + std::fmt::Display>(err: T) -> Response {
    response_with_code(StatusCode::BAD_REQUEST, err)
}

/// Maps a failed characteristic operation onto an HTTP status
fn bridge_error(err: BridgeError) -> Response {
    let code = match &err {
        BridgeError::NotBound(_) | BridgeError::CapabilityNotFound(_) => StatusCode::NOT_FOUND,
        BridgeError::InvalidValue { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    };
    response_with_code(code, err)
}

fn parse_kind(kind: &str) -> Result<CharacteristicKind, Response> {
    kind.parse()
        .map_err(|_| not_found(format!("unknown characteristic '{kind}'")))
}

#[derive(Serialize)]
struct ServiceItem {
    kind: ServiceKind,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    information: Option<InformationProperties>,
    characteristics: Vec<CharacteristicKind>,
}

#[derive(Serialize)]
struct AccessoryItem {
    name: String,
    device_id: Option<String>,
    services: Vec<ServiceItem>,
    state: Option<LightbulbState>,
}

/// Returns the services and characteristics the accessory exposes,
/// along with the last-known lightbulb state
async fn accessory_info(State(state): State<StateHandle>) -> Result<Response, Response> {
    let services = state
        .services()
        .iter()
        .map(|s| ServiceItem {
            kind: s.kind,
            name: s.name.clone(),
            information: s.information.clone(),
            characteristics: s.characteristic_kinds(),
        })
        .collect();

    Ok(Json(AccessoryItem {
        name: state.name().to_string(),
        device_id: state.lightbulb().map(|b| b.device_id().to_string()),
        services,
        state: state.lightbulb().map(|b| b.state()),
    })
    .into_response())
}

#[derive(Serialize)]
struct CharacteristicItem {
    kind: CharacteristicKind,
    value: CharacteristicValue,
}

/// Reads a characteristic, querying the device
async fn characteristic_get(
    State(state): State<StateHandle>,
    Path(kind): Path<String>,
) -> Result<Response, Response> {
    let kind = parse_kind(&kind)?;
    let value = state.get(kind).await.map_err(bridge_error)?;
    Ok(Json(CharacteristicItem { kind, value }).into_response())
}

/// Writes a characteristic and returns the value the host should record
async fn characteristic_set(
    State(state): State<StateHandle>,
    Path((kind, value)): Path<(String, String)>,
) -> Result<Response, Response> {
    let kind = parse_kind(&kind)?;
    let value: CharacteristicValue = value.parse().map_err(bad_request)?;
    let value = state.set(kind, value).await.map_err(bridge_error)?;
    Ok(Json(CharacteristicItem { kind, value }).into_response())
}

fn build_router(state: StateHandle) -> Router {
    Router::new()
        .route("/api/accessory", get(accessory_info))
        .route("/api/characteristic/{kind}", get(characteristic_get))
        .route(
            "/api/characteristic/{kind}/set/{value}",
            get(characteristic_set),
        )
        .with_state(state)
}

pub async fn run_http_server(state: StateHandle, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("run_http_server: binding to port {port}"))?;
    let addr = listener.local_addr()?;
    log::info!("http server addr is {addr:?}");
    if let Err(err) = axum::serve(listener, app).await {
        log::error!("http server stopped: {err:#}");
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::accessory::fake::FakeClient;
    use crate::accessory::Accessory;
    use crate::config::AccessoryConfig;
    use serde_json::{json, Value as JsonValue};
    use std::sync::Arc;

    fn config() -> AccessoryConfig {
        AccessoryConfig {
            id: "lamp-1".to_string(),
            authorization: "token".to_string(),
            name: "Desk Lamp".to_string(),
            default_volume: 10,
            base_url: None,
        }
    }

    async fn lamp() -> (Arc<FakeClient>, StateHandle) {
        let client = FakeClient::with_capabilities(json!([
            {"type": "devices.capabilities.on_off",
             "state": {"instance": "on", "value": true}},
            {"type": "devices.capabilities.range",
             "parameters": {"instance": "brightness"},
             "state": {"instance": "brightness", "value": 40}},
        ]));
        let accessory = Accessory::create(&config(), client.clone()).await;
        (client, Arc::new(accessory))
    }

    async fn body(response: Response) -> (StatusCode, JsonValue) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn either(result: Result<Response, Response>) -> Response {
        match result {
            Ok(r) | Err(r) => r,
        }
    }

    #[tokio::test]
    async fn test_build_router() {
        // axum changes its path syntax from time to time and only
        // reports a bad route at runtime, when the router is built.
        let (_client, state) = lamp().await;
        let _ = build_router(state);
    }

    #[tokio::test]
    async fn accessory_lists_services() {
        let (_client, state) = lamp().await;
        let (status, body) = body(either(accessory_info(State(state)).await)).await;
        k9::assert_equal!(status, StatusCode::OK);
        k9::assert_equal!(body["device_id"], json!("lamp-1"));
        k9::assert_equal!(body["services"][0]["kind"], json!("AccessoryInformation"));
        k9::assert_equal!(
            body["services"][1]["characteristics"],
            json!(["On", "Brightness"])
        );
        k9::assert_equal!(body["state"]["brightness"], json!(40));
    }

    #[tokio::test]
    async fn get_and_set() {
        let (client, state) = lamp().await;

        let (status, body_json) = body(either(
            characteristic_get(State(state.clone()), Path("brightness".to_string())).await,
        ))
        .await;
        k9::assert_equal!(status, StatusCode::OK);
        k9::assert_equal!(body_json, json!({"kind": "Brightness", "value": 40}));

        let (status, body_json) = body(either(
            characteristic_set(
                State(state.clone()),
                Path(("on".to_string(), "false".to_string())),
            )
            .await,
        ))
        .await;
        k9::assert_equal!(status, StatusCode::OK);
        k9::assert_equal!(body_json, json!({"kind": "On", "value": false}));
        k9::assert_equal!(client.actions().len(), 1);
    }

    #[tokio::test]
    async fn error_statuses() {
        let (client, state) = lamp().await;

        let response = either(
            characteristic_get(State(state.clone()), Path("volume".to_string())).await,
        );
        k9::assert_equal!(response.status(), StatusCode::NOT_FOUND);

        let response = either(
            characteristic_get(State(state.clone()), Path("hue".to_string())).await,
        );
        k9::assert_equal!(response.status(), StatusCode::NOT_FOUND);

        let (status, body_json) = body(either(
            characteristic_set(
                State(state.clone()),
                Path(("brightness".to_string(), "bright".to_string())),
            )
            .await,
        ))
        .await;
        k9::assert_equal!(status, StatusCode::BAD_REQUEST);
        k9::assert_equal!(body_json["code"], json!(400));

        let response = either(
            characteristic_set(
                State(state.clone()),
                Path(("on".to_string(), "42".to_string())),
            )
            .await,
        );
        k9::assert_equal!(response.status(), StatusCode::BAD_REQUEST);

        client.set_offline(true);
        let response = either(
            characteristic_get(State(state.clone()), Path("on".to_string())).await,
        );
        k9::assert_equal!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
