use std::process::ExitCode;

use env_logger::Env;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use prometheus_ping::{
    agent::Agent,
    configuration::{Configuration, Parser},
    error::Result,
    metrics::{self as exporter},
    registry::TargetRegistry,
};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let conf = Configuration::parse();

    match run(conf).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(conf: Configuration) -> Result<()> {
    conf.validate()?;

    log::info!("Starting prometheus-ping {}", env!("CARGO_PKG_VERSION"));
    log::info!("Source: {}", conf.source);

    let registry = TargetRegistry::resolve(&conf.targets, conf.probe_addr()).await?;
    registry.log_targets();

    let agent = Agent::bind(
        conf.source.clone(),
        registry,
        conf.echo_addr(),
        conf.probe_addr(),
    )
    .await?;

    let recorder = exporter::install_recorder()?;
    let cancel = CancellationToken::new();
    let server = exporter::init(
        conf.metrics_addr(),
        agent.stats(),
        Some(recorder),
        cancel.clone(),
    )
    .await?;

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                log::info!("Shutting down");
                cancel.cancel();
            }
        });
    }

    let result = agent.run(cancel.clone()).await;
    cancel.cancel();
    server.join().await;
    result
}
