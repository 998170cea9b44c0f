//! An in-memory stand-in for the Yandex IoT API that echoes applied
//! actions back into the device state it reports.

use crate::error::BridgeError;
use crate::iot_api::{
    from_json, CapabilityAction, DeviceCapability, DeviceCapabilityKind, DeviceClient, DeviceInfo,
    DeviceType,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub struct FakeClient {
    device: Mutex<DeviceInfo>,
    offline: Mutex<bool>,
    actions: Mutex<Vec<CapabilityAction>>,
    fetches: Mutex<usize>,
}

impl FakeClient {
    pub fn with_capabilities(capabilities: JsonValue) -> Arc<Self> {
        Arc::new(Self {
            device: Mutex::new(DeviceInfo {
                id: "lamp-1".to_string(),
                name: "Lamp".to_string(),
                device_type: DeviceType::Light,
                room: None,
                capabilities: parse(capabilities),
            }),
            offline: Mutex::new(false),
            actions: Mutex::new(vec![]),
            fetches: Mutex::new(0),
        })
    }

    pub fn offline() -> Arc<Self> {
        let client = Self::with_capabilities(JsonValue::Array(vec![]));
        client.set_offline(true);
        client
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock() = offline;
    }

    pub fn replace_capabilities(&self, capabilities: JsonValue) {
        self.device.lock().capabilities = parse(capabilities);
    }

    pub fn actions(&self) -> Vec<CapabilityAction> {
        self.actions.lock().clone()
    }

    pub fn fetches(&self) -> usize {
        *self.fetches.lock()
    }

    fn check_online(&self) -> Result<(), BridgeError> {
        if *self.offline.lock() {
            return Err(BridgeError::Status {
                url: "fake://devices".to_string(),
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

fn parse(capabilities: JsonValue) -> Vec<DeviceCapability> {
    from_json(capabilities.to_string()).expect("valid capabilities")
}

#[async_trait]
impl DeviceClient for FakeClient {
    async fn get_device_info(&self, _device_id: &str) -> Result<DeviceInfo, BridgeError> {
        *self.fetches.lock() += 1;
        self.check_online()?;
        Ok(self.device.lock().clone())
    }

    async fn send_action(
        &self,
        _device_id: &str,
        action: CapabilityAction,
    ) -> Result<(), BridgeError> {
        self.check_online()?;

        let mut device = self.device.lock();
        for cap in device.capabilities.iter_mut() {
            let matches = cap.kind == action.kind
                && match action.kind {
                    DeviceCapabilityKind::Range => {
                        cap.parameters.instance.as_deref() == Some(action.state.instance.as_str())
                    }
                    _ => true,
                };
            if matches {
                cap.state.replace(action.state.clone());
            }
        }
        self.actions.lock().push(action);
        Ok(())
    }
}
