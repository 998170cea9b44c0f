use crate::iot_api::{from_json, YandexIotClient, SERVER};
use crate::opt_env_var;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_NAME: &str = "Lightbulb";

/// The accessory entry, in the same shape as it appears in the
/// host's accessory list:
///
/// ```json
/// {"accessory": "homebridge-yandex-iot", "name": "Desk Lamp",
///  "id": "<device id>", "authorization": "Bearer <token>"}
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AccessoryConfig {
    pub id: String,
    pub authorization: String,
    #[serde(default = "default_name")]
    pub name: String,
    /// Accepted for compatibility with existing configuration files;
    /// nothing uses it.
    #[serde(default = "default_volume", rename = "defaultVolume")]
    pub default_volume: u32,
    #[serde(default, rename = "baseUrl", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_volume() -> u32 {
    10
}

impl AccessoryConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        from_json(&data).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn api_client(&self) -> YandexIotClient {
        YandexIotClient::with_base_url(
            self.base_url.as_deref().unwrap_or(SERVER),
            &self.authorization,
        )
    }
}

#[derive(clap::Parser, Debug, Default)]
pub struct AccessoryArguments {
    /// Path to a JSON file holding the accessory entry.
    /// You may also set this via the YANDEX_IOT_CONFIG environment variable.
    /// Any of the other options override the values from the file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The id of the device to expose.
    /// You may also set this via the YANDEX_IOT_DEVICE_ID environment variable.
    #[arg(long, global = true)]
    pub device_id: Option<String>,

    /// The value of the Authorization header, usually "Bearer <token>".
    /// You may also set this via the YANDEX_IOT_TOKEN environment variable.
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// The display name of the lightbulb.
    /// You may also set this via the YANDEX_IOT_NAME environment variable.
    #[arg(long, global = true)]
    pub name: Option<String>,

    /// Override the API endpoint.
    /// You may also set this via the YANDEX_IOT_BASE_URL environment variable.
    #[arg(long, global = true)]
    pub base_url: Option<String>,
}

/// Resolves a setting from its flag, then its environment variable,
/// then the configuration file.
fn resolve(
    flag: &Option<String>,
    env_name: &str,
    file: Option<&String>,
) -> anyhow::Result<Option<String>> {
    if let Some(value) = flag {
        return Ok(Some(value.to_string()));
    }
    if let Some(value) = opt_env_var(env_name)? {
        return Ok(Some(value));
    }
    Ok(file.cloned())
}

impl AccessoryArguments {
    fn config_file(&self) -> anyhow::Result<Option<AccessoryConfig>> {
        let path = match &self.config {
            Some(path) => Some(path.clone()),
            None => opt_env_var::<PathBuf>("YANDEX_IOT_CONFIG")?,
        };
        path.map(|path| AccessoryConfig::load(&path)).transpose()
    }

    fn token_from(&self, file: Option<&AccessoryConfig>) -> anyhow::Result<String> {
        resolve(
            &self.token,
            "YANDEX_IOT_TOKEN",
            file.map(|f| &f.authorization),
        )?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Please specify the authorization token either via the \
                --token parameter, by setting $YANDEX_IOT_TOKEN, or in \
                the --config file"
            )
        })
    }

    fn base_url_from(&self, file: Option<&AccessoryConfig>) -> anyhow::Result<Option<String>> {
        resolve(
            &self.base_url,
            "YANDEX_IOT_BASE_URL",
            file.and_then(|f| f.base_url.as_ref()),
        )
    }

    /// A client that only needs the token; it is not tied to a device
    pub fn api_client(&self) -> anyhow::Result<YandexIotClient> {
        let file = self.config_file()?;
        let token = self.token_from(file.as_ref())?;
        let base_url = self.base_url_from(file.as_ref())?;
        Ok(YandexIotClient::with_base_url(
            base_url.as_deref().unwrap_or(SERVER),
            token,
        ))
    }

    pub fn accessory_config(&self) -> anyhow::Result<AccessoryConfig> {
        let file = self.config_file()?;
        let file = file.as_ref();

        let id = resolve(&self.device_id, "YANDEX_IOT_DEVICE_ID", file.map(|f| &f.id))?
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Please specify the device id either via the \
                    --device-id parameter, by setting $YANDEX_IOT_DEVICE_ID, \
                    or in the --config file. The list subcommand shows the \
                    devices available to your token."
                )
            })?;
        let name = resolve(&self.name, "YANDEX_IOT_NAME", file.map(|f| &f.name))?
            .unwrap_or_else(default_name);

        Ok(AccessoryConfig {
            id,
            authorization: self.token_from(file)?,
            name,
            default_volume: file.map(|f| f.default_volume).unwrap_or_else(default_volume),
            base_url: self.base_url_from(file)?,
        })
    }
}
