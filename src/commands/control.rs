use crate::accessory::characteristic::{CharacteristicKind, CharacteristicValue};
use crate::accessory::Accessory;
use std::sync::Arc;

#[derive(clap::Parser, Debug)]
pub struct ControlCommand {
    /// One of on, brightness, colortemperature, hue or saturation.
    /// Use "color" to set the hue from a CSS color.
    characteristic: String,

    /// The value to set. The current value is printed when omitted.
    value: Option<String>,
}

const COLOR: &str = "color";

/// The hue of a color in whole degrees, 0 for greys
fn css_hue(color: &csscolorparser::Color) -> i64 {
    let [h, _s, _v, _a] = color.to_hsva();
    if h.is_nan() {
        return 0;
    }
    (h.round() as i64).rem_euclid(360)
}

/// Sends the hue of a CSS color to the device. Saturation is not
/// part of the device's color model, so it is left alone.
async fn apply_color(accessory: &Accessory, color: &str) -> anyhow::Result<CharacteristicValue> {
    let parsed: csscolorparser::Color = color
        .parse()
        .map_err(|err| anyhow::anyhow!("error parsing color '{color}': {err}"))?;
    let hue = accessory
        .set(CharacteristicKind::Hue, css_hue(&parsed).into())
        .await?;
    Ok(hue)
}

impl ControlCommand {
    pub async fn run(&self, args: &crate::Args) -> anyhow::Result<()> {
        let config = args.accessory_args.accessory_config()?;
        let accessory = Accessory::create(&config, Arc::new(config.api_client())).await;
        if accessory.services().is_empty() {
            anyhow::bail!("device {} could not be probed", config.id);
        }

        if self.characteristic.eq_ignore_ascii_case(COLOR) {
            let color = self
                .value
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("color requires a CSS color value"))?;
            let hue = apply_color(&accessory, color).await?;
            println!("{}={hue}", CharacteristicKind::Hue);
            return Ok(());
        }

        let kind: CharacteristicKind = self.characteristic.parse().map_err(|_| {
            anyhow::anyhow!("unknown characteristic '{}'", self.characteristic)
        })?;

        let value = match &self.value {
            Some(value) => {
                let value: CharacteristicValue =
                    value.parse().map_err(|err| anyhow::anyhow!("{err}"))?;
                accessory.set(kind, value).await?
            }
            None => accessory.get(kind).await?,
        };
        println!("{kind}={value}");
        Ok(())
    }
}
