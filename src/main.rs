use clap::Parser;
use std::str::FromStr;

mod accessory;
mod capability;
mod commands;
mod config;
mod error;
mod iot_api;
mod service;
mod temperature;
mod version_info;

#[derive(clap::Parser, Debug)]
#[command(version = version_info::bridge_version(), propagate_version = true)]
pub struct Args {
    #[command(flatten)]
    accessory_args: config::AccessoryArguments,

    #[command(subcommand)]
    cmd: SubCommand,
}

#[derive(clap::Parser, Debug)]
enum SubCommand {
    /// Show the devices available to the configured token
    List(commands::list::ListCommand),
    /// Read or write a single characteristic of the lightbulb
    Control(commands::control::ControlCommand),
    /// Run the accessory and its HTTP API
    Serve(commands::serve::ServeCommand),
}

pub fn opt_env_var<T: FromStr>(name: &str) -> anyhow::Result<Option<T>>
where
    <T as FromStr>::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(p) => Ok(Some(
            p.parse()
                .map_err(|err| anyhow::anyhow!("error parsing ${name}: {err:#}"))?,
        )),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => anyhow::bail!("${name} is invalid: {err:#}"),
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    color_backtrace::install();
    if let Ok(path) = dotenvy::dotenv() {
        eprintln!("Loading environment overrides from {path:?}");
    }

    env_logger::Builder::from_env(
        env_logger::Env::new().default_filter_or("yandex_lightbulb=info"),
    )
    .init();

    let args = Args::parse();
    match &args.cmd {
        SubCommand::List(cmd) => cmd.run(&args).await,
        SubCommand::Control(cmd) => cmd.run(&args).await,
        SubCommand::Serve(cmd) => cmd.run(&args).await,
    }
}
