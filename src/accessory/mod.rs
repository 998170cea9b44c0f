use crate::accessory::characteristic::{CharacteristicKind, CharacteristicValue};
use crate::accessory::lightbulb::{Discovery, Lightbulb};
use crate::accessory::service::{InformationProperties, Service, ServiceKind};
use crate::config::AccessoryConfig;
use crate::error::BridgeError;
use crate::iot_api::DeviceClient;
use crate::version_info::bridge_version;
use std::sync::Arc;

pub mod characteristic;
#[cfg(test)]
pub mod fake;
pub mod lightbulb;
pub mod service;

const MANUFACTURER: &str = "Yandex";

/// A bridged accessory wrapping a single Yandex IoT light
#[derive(Debug)]
pub struct Accessory {
    name: String,
    lightbulb: Option<Arc<Lightbulb>>,
    services: Vec<Service>,
}

pub type AccessoryHandle = Arc<Accessory>;

impl Accessory {
    /// Creates the accessory and probes the device for its capabilities.
    /// If the device cannot be probed, the accessory is still created
    /// but exposes no services.
    pub async fn create(config: &AccessoryConfig, client: Arc<dyn DeviceClient>) -> Self {
        let lightbulb = Lightbulb::new(&config.id, client);

        match lightbulb.discover_and_bind(&config.name).await {
            Ok(Discovery { info, service }) => {
                let information = Service::information(InformationProperties {
                    manufacturer: MANUFACTURER.to_string(),
                    model: info.device_type.to_string(),
                    name: config.name.clone(),
                    serial_number: config.id.clone(),
                    firmware_revision: bridge_version().to_string(),
                });
                Self {
                    name: config.name.clone(),
                    lightbulb: Some(lightbulb),
                    services: vec![information, service],
                }
            }
            Err(err) => {
                log::error!(
                    "Unable to discover the capabilities of {id}; \
                     no characteristics will be available: {err}",
                    id = config.id
                );
                Self {
                    name: config.name.clone(),
                    lightbulb: None,
                    services: vec![],
                }
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn lightbulb(&self) -> Option<&Arc<Lightbulb>> {
        self.lightbulb.as_ref()
    }

    pub fn lightbulb_service(&self) -> Option<&Service> {
        self.services
            .iter()
            .find(|s| s.kind == ServiceKind::Lightbulb)
    }

    pub async fn get(&self, kind: CharacteristicKind) -> Result<CharacteristicValue, BridgeError> {
        self.lightbulb_service()
            .ok_or(BridgeError::NotBound(kind))?
            .get(kind)
            .await
    }

    pub async fn set(
        &self,
        kind: CharacteristicKind,
        value: CharacteristicValue,
    ) -> Result<CharacteristicValue, BridgeError> {
        self.lightbulb_service()
            .ok_or(BridgeError::NotBound(kind))?
            .set(kind, value)
            .await
    }
}
