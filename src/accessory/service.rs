use crate::accessory::characteristic::{
    Characteristic, CharacteristicHandler, CharacteristicKind, CharacteristicValue,
};
use crate::error::BridgeError;
use serde::Serialize;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ServiceKind {
    AccessoryInformation,
    Lightbulb,
}

/// Static descriptive properties of the accessory information service
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct InformationProperties {
    pub manufacturer: String,
    pub model: String,
    pub name: String,
    pub serial_number: String,
    pub firmware_revision: String,
}

#[derive(Debug, Clone)]
pub struct Service {
    pub kind: ServiceKind,
    pub name: String,
    pub information: Option<InformationProperties>,
    characteristics: Vec<Characteristic>,
}

impl Service {
    pub fn lightbulb<N: Into<String>>(name: N) -> Self {
        Self {
            kind: ServiceKind::Lightbulb,
            name: name.into(),
            information: None,
            characteristics: vec![],
        }
    }

    pub fn information(props: InformationProperties) -> Self {
        Self {
            kind: ServiceKind::AccessoryInformation,
            name: props.name.clone(),
            information: Some(props),
            characteristics: vec![],
        }
    }

    /// Registers the handler for a characteristic, replacing any
    /// previous registration for the same kind.
    pub fn bind<H: CharacteristicHandler + Send + Sync + 'static>(
        &mut self,
        kind: CharacteristicKind,
        handler: H,
    ) {
        self.characteristics.retain(|c| c.kind != kind);
        self.characteristics.push(Characteristic::new(kind, handler));
    }

    pub fn characteristic(&self, kind: CharacteristicKind) -> Option<&Characteristic> {
        self.characteristics.iter().find(|c| c.kind == kind)
    }

    /// The bound characteristics, in the order they were bound
    pub fn characteristic_kinds(&self) -> Vec<CharacteristicKind> {
        self.characteristics.iter().map(|c| c.kind).collect()
    }

    pub async fn get(&self, kind: CharacteristicKind) -> Result<CharacteristicValue, BridgeError> {
        self.characteristic(kind)
            .ok_or(BridgeError::NotBound(kind))?
            .get()
            .await
    }

    pub async fn set(
        &self,
        kind: CharacteristicKind,
        value: CharacteristicValue,
    ) -> Result<CharacteristicValue, BridgeError> {
        self.characteristic(kind)
            .ok_or(BridgeError::NotBound(kind))?
            .set(value)
            .await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use async_trait::async_trait;

    struct Fixed(i64);

    #[async_trait]
    impl CharacteristicHandler for Fixed {
        async fn get(&self) -> Result<CharacteristicValue, BridgeError> {
            Ok(CharacteristicValue::Int(self.0))
        }

        async fn set(
            &self,
            value: CharacteristicValue,
        ) -> Result<CharacteristicValue, BridgeError> {
            Ok(value)
        }
    }

    #[tokio::test]
    async fn bind_replaces_and_dispatches() {
        let mut service = Service::lightbulb("Desk");
        service.bind(CharacteristicKind::Brightness, Fixed(1));
        service.bind(CharacteristicKind::Hue, Fixed(2));
        service.bind(CharacteristicKind::Brightness, Fixed(3));

        k9::assert_equal!(
            service.characteristic_kinds(),
            vec![CharacteristicKind::Hue, CharacteristicKind::Brightness]
        );
        k9::assert_equal!(
            service.get(CharacteristicKind::Brightness).await.unwrap(),
            CharacteristicValue::Int(3)
        );
        k9::assert_equal!(
            service
                .set(CharacteristicKind::Hue, CharacteristicValue::Float(12.5))
                .await
                .unwrap(),
            CharacteristicValue::Float(12.5)
        );
    }

    #[tokio::test]
    async fn unbound_characteristic() {
        let service = Service::lightbulb("Desk");
        assert!(matches!(
            service.get(CharacteristicKind::On).await,
            Err(BridgeError::NotBound(CharacteristicKind::On))
        ));
    }
}
