use crate::accessory::characteristic::{
    CharacteristicHandler, CharacteristicKind, CharacteristicValue,
};
use crate::accessory::service::Service;
use crate::capability::{
    Capability, CapabilitySet, CapabilityTag, INSTANCE_BRIGHTNESS, INSTANCE_COLOR_MODEL,
    INSTANCE_ON, INSTANCE_TEMPERATURE_K,
};
use crate::error::BridgeError;
use crate::iot_api::{CapabilityAction, DeviceCapabilityKind, DeviceClient, DeviceInfo};
use crate::temperature::{TemperatureRange, HOST_MIN};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Last-known values, kept so that set operations and the
/// stubbed characteristics have something to work with.
/// Updates are last-write-wins.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LightbulbState {
    pub brightness: CharacteristicValue,
    /// In host units, 140-500
    pub temperature: CharacteristicValue,
    pub hue: CharacteristicValue,
    pub saturation: CharacteristicValue,
    /// The `temperature_k` bounds needed to convert a host temperature
    /// back into Kelvin.
    pub temperature_range: Option<TemperatureRange>,
    pub discovered_at: Option<DateTime<Utc>>,
}

impl Default for LightbulbState {
    fn default() -> Self {
        Self {
            brightness: CharacteristicValue::Int(50),
            temperature: CharacteristicValue::Int(HOST_MIN as i64),
            hue: CharacteristicValue::Int(250),
            saturation: CharacteristicValue::Int(50),
            temperature_range: None,
            discovered_at: None,
        }
    }
}

/// The result of a successful capability discovery
#[derive(Debug)]
pub struct Discovery {
    pub info: DeviceInfo,
    pub service: Service,
}

/// Maps the capabilities of a single Yandex IoT device onto the
/// characteristics of a lightbulb service.
pub struct Lightbulb {
    device_id: String,
    client: Arc<dyn DeviceClient>,
    state: Mutex<LightbulbState>,
}

impl std::fmt::Debug for Lightbulb {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("Lightbulb")
            .field("device_id", &self.device_id)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl Lightbulb {
    pub fn new<I: Into<String>>(device_id: I, client: Arc<dyn DeviceClient>) -> Arc<Self> {
        Arc::new(Self {
            device_id: device_id.into(),
            client,
            state: Mutex::new(LightbulbState::default()),
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns a copy of the cached state
    pub fn state(&self) -> LightbulbState {
        self.state.lock().clone()
    }

    /// Fetches the device once and binds a characteristic for each
    /// capability it reports. The resulting set of characteristics
    /// is fixed for the lifetime of the service.
    pub async fn discover_and_bind(self: &Arc<Self>, name: &str) -> Result<Discovery, BridgeError> {
        let info = self.client.get_device_info(&self.device_id).await?;
        let caps = CapabilitySet::decode(&info.capabilities);
        if caps.is_empty() {
            log::warn!(
                "{name} ({id}) reports no capability that a lightbulb can use",
                id = self.device_id
            );
        }
        let mut service = Service::lightbulb(name);

        {
            let mut state = self.state.lock();
            for cap in caps.iter() {
                match cap {
                    Capability::OnOff { .. } => {
                        service.bind(CharacteristicKind::On, self.accessor(CharacteristicKind::On));
                    }
                    Capability::Brightness { value } => {
                        if let Some(value) = value.as_ref().and_then(CharacteristicValue::from_number)
                        {
                            state.brightness = value;
                        }
                        service.bind(
                            CharacteristicKind::Brightness,
                            self.accessor(CharacteristicKind::Brightness),
                        );
                    }
                    Capability::ColorTemperature { range, kelvin } => {
                        state.temperature_range.replace(*range);
                        if let Some(kelvin) = kelvin {
                            state.temperature = range.to_host(*kelvin).into();
                        }
                        service.bind(
                            CharacteristicKind::ColorTemperature,
                            self.accessor(CharacteristicKind::ColorTemperature),
                        );
                    }
                    Capability::ColorModel { hue } => {
                        if let Some(hue) = hue.as_ref().and_then(CharacteristicValue::from_number) {
                            state.hue = hue;
                        }
                        service.bind(CharacteristicKind::Hue, self.accessor(CharacteristicKind::Hue));
                        service.bind(
                            CharacteristicKind::Saturation,
                            self.accessor(CharacteristicKind::Saturation),
                        );
                    }
                }
            }
            state.discovered_at.replace(Utc::now());
        }

        log::info!(
            "{name} ({id}): bound {kinds:?}",
            id = self.device_id,
            kinds = service.characteristic_kinds()
        );

        Ok(Discovery { info, service })
    }

    fn accessor(self: &Arc<Self>, kind: CharacteristicKind) -> Accessor {
        Accessor {
            bulb: self.clone(),
            kind,
        }
    }

    async fn fetch_capabilities(&self) -> Result<CapabilitySet, BridgeError> {
        let info = self
            .client
            .get_device_info(&self.device_id)
            .await
            .map_err(|err| {
                log::error!("fetching {}: {err}", self.device_id);
                err
            })?;
        Ok(CapabilitySet::decode(&info.capabilities))
    }

    async fn send<V: Into<JsonValue> + Send>(
        &self,
        kind: DeviceCapabilityKind,
        instance: &str,
        value: V,
    ) -> Result<(), BridgeError> {
        let action = CapabilityAction::new(kind, instance, value);
        log::debug!("{}: {action:?}", self.device_id);
        self.client
            .send_action(&self.device_id, action)
            .await
            .map_err(|err| {
                log::error!("{} {kind}/{instance}: {err}", self.device_id);
                err
            })
    }

    pub async fn get_power(&self) -> Result<bool, BridgeError> {
        let caps = self.fetch_capabilities().await?;
        match caps.find(CapabilityTag::OnOff)? {
            Capability::OnOff { on: Some(on) } => Ok(*on),
            _ => Err(missing_state(CapabilityTag::OnOff)),
        }
    }

    pub async fn set_power(&self, on: bool) -> Result<bool, BridgeError> {
        self.send(DeviceCapabilityKind::OnOff, INSTANCE_ON, on)
            .await?;
        Ok(on)
    }

    pub async fn get_brightness(&self) -> Result<CharacteristicValue, BridgeError> {
        let caps = self.fetch_capabilities().await?;
        let value = match caps.find(CapabilityTag::Brightness)? {
            Capability::Brightness { value: Some(n) } => CharacteristicValue::from_number(n),
            _ => None,
        }
        .ok_or_else(|| missing_state(CapabilityTag::Brightness))?;
        self.state.lock().brightness = value;
        Ok(value)
    }

    pub async fn set_brightness(
        &self,
        value: CharacteristicValue,
    ) -> Result<CharacteristicValue, BridgeError> {
        let value = value.numeric(CharacteristicKind::Brightness)?;
        self.send(DeviceCapabilityKind::Range, INSTANCE_BRIGHTNESS, value)
            .await?;
        self.state.lock().brightness = value;
        Ok(value)
    }

    /// Reads the color temperature in host units, refreshing the
    /// cached Kelvin range as a side effect.
    pub async fn get_temperature(&self) -> Result<CharacteristicValue, BridgeError> {
        let caps = self.fetch_capabilities().await?;
        match caps.find(CapabilityTag::ColorTemperature)? {
            Capability::ColorTemperature {
                range,
                kelvin: Some(kelvin),
            } => {
                let value = CharacteristicValue::Int(range.to_host(*kelvin));
                let mut state = self.state.lock();
                state.temperature_range.replace(*range);
                state.temperature = value;
                Ok(value)
            }
            _ => Err(missing_state(CapabilityTag::ColorTemperature)),
        }
    }

    pub async fn set_temperature(
        &self,
        value: CharacteristicValue,
    ) -> Result<CharacteristicValue, BridgeError> {
        let host = value
            .numeric(CharacteristicKind::ColorTemperature)?
            .as_f64()
            .unwrap_or_default();
        let range = self
            .state
            .lock()
            .temperature_range
            .ok_or(BridgeError::TemperatureRangeUnknown)?;
        let kelvin = range.to_vendor(host);
        self.send(
            DeviceCapabilityKind::ColorSetting,
            INSTANCE_TEMPERATURE_K,
            kelvin,
        )
        .await?;
        self.state.lock().temperature = value;
        Ok(value)
    }

    pub async fn get_hue(&self) -> Result<CharacteristicValue, BridgeError> {
        let caps = self.fetch_capabilities().await?;
        let value = match caps.find(CapabilityTag::ColorModel)? {
            Capability::ColorModel { hue: Some(n) } => CharacteristicValue::from_number(n),
            _ => None,
        }
        .ok_or_else(|| missing_state(CapabilityTag::ColorModel))?;
        self.state.lock().hue = value;
        Ok(value)
    }

    /// Hue passes through to the device unconverted, 0-360
    pub async fn set_hue(
        &self,
        value: CharacteristicValue,
    ) -> Result<CharacteristicValue, BridgeError> {
        let value = value.numeric(CharacteristicKind::Hue)?;
        self.send(DeviceCapabilityKind::ColorSetting, INSTANCE_COLOR_MODEL, value)
            .await?;
        self.state.lock().hue = value;
        Ok(value)
    }

    // The device has no separate saturation control that we can
    // drive, so saturation lives only in the local cache.

    pub fn get_saturation(&self) -> CharacteristicValue {
        self.state.lock().saturation
    }

    pub fn set_saturation(
        &self,
        value: CharacteristicValue,
    ) -> Result<CharacteristicValue, BridgeError> {
        let value = value.numeric(CharacteristicKind::Saturation)?;
        self.state.lock().saturation = value;
        Ok(value)
    }
}

fn missing_state(tag: CapabilityTag) -> BridgeError {
    BridgeError::MalformedResponse(format!("{} capability has no usable state", tag.name()))
}

/// Routes host get/set calls for one characteristic to the lightbulb
struct Accessor {
    bulb: Arc<Lightbulb>,
    kind: CharacteristicKind,
}

#[async_trait]
impl CharacteristicHandler for Accessor {
    async fn get(&self) -> Result<CharacteristicValue, BridgeError> {
        match self.kind {
            CharacteristicKind::On => self.bulb.get_power().await.map(Into::into),
            CharacteristicKind::Brightness => self.bulb.get_brightness().await,
            CharacteristicKind::ColorTemperature => self.bulb.get_temperature().await,
            CharacteristicKind::Hue => self.bulb.get_hue().await,
            CharacteristicKind::Saturation => Ok(self.bulb.get_saturation()),
        }
    }

    async fn set(&self, value: CharacteristicValue) -> Result<CharacteristicValue, BridgeError> {
        match self.kind {
            CharacteristicKind::On => {
                let on = value.as_bool().ok_or_else(|| {
                    BridgeError::invalid_value(CharacteristicKind::On, "expected a boolean")
                })?;
                self.bulb.set_power(on).await.map(Into::into)
            }
            CharacteristicKind::Brightness => self.bulb.set_brightness(value).await,
            CharacteristicKind::ColorTemperature => self.bulb.set_temperature(value).await,
            CharacteristicKind::Hue => self.bulb.set_hue(value).await,
            CharacteristicKind::Saturation => self.bulb.set_saturation(value),
        }
    }
}
