#[derive(clap::Parser, Debug)]
pub struct ListCommand {}

impl ListCommand {
    pub async fn run(&self, args: &crate::Args) -> anyhow::Result<()> {
        let client = args.accessory_args.api_client()?;
        let info = client.get_user_info().await?;
        log::debug!("user/info request_id {}", info.request_id);

        for d in info.devices {
            println!(
                "{id} {kind:<22} {name}",
                id = d.id,
                kind = d.device_type.to_string(),
                name = d.name
            );
            for cap in &d.capabilities {
                let instance = cap.parameters.instance.as_deref().unwrap_or("-");
                println!("    {kind:<13} {instance}", kind = cap.kind.to_string());
            }
        }
        Ok(())
    }
}
