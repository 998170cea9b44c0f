use crate::accessory::characteristic::CharacteristicKind;
use crate::accessory::Accessory;
use crate::service::http::run_http_server;
use crate::version_info::bridge_version;
use std::sync::Arc;
use strum::IntoEnumIterator;

#[derive(clap::Parser, Debug)]
pub struct ServeCommand {
    /// The port on which the HTTP API will listen
    #[arg(long, default_value_t = 8057)]
    http_port: u16,
}

impl ServeCommand {
    pub async fn run(&self, args: &crate::Args) -> anyhow::Result<()> {
        log::info!("Starting service. version {}", bridge_version());
        let config = args.accessory_args.accessory_config()?;
        let client = Arc::new(config.api_client());

        log::info!("Probing {} for its capabilities", config.id);
        let accessory = Arc::new(Accessory::create(&config, client).await);

        match accessory.lightbulb_service() {
            Some(service) => {
                let bound = service.characteristic_kinds();
                for kind in CharacteristicKind::iter() {
                    if bound.contains(&kind) {
                        log::info!("  {kind}: available");
                    } else {
                        log::info!("  {kind}: not reported by the device");
                    }
                }
            }
            None => {
                log::warn!(
                    "{} exposes no services. Check the device id and \
                     token, then restart to probe the device again.",
                    accessory.name()
                );
            }
        }

        run_http_server(accessory, self.http_port).await
    }
}
