//! `bearerbox` binary: identify to a gateway and send one sms.

mod cli;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use bearerbox::{Client, DefaultSessionHandler, SessionConfig, Sms};
use clap::Parser;

fn load_config(cli: &cli::Cli) -> bearerbox::Result<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    if let Some(host) = &cli.host {
        config = config.host(host.clone());
    }
    if let Some(port) = cli.port {
        config = config.port(port);
    }
    if let Some(client_id) = &cli.client_id {
        config = config.client_id(client_id.clone());
    }
    Ok(config)
}

#[cfg(feature = "metrics")]
fn install_metrics(addr: Option<SocketAddr>) {
    let Some(addr) = addr else {
        return;
    };
    if let Err(error) = metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        tracing::warn!(%error, "failed to install metrics exporter");
    }
}

#[cfg(not(feature = "metrics"))]
fn install_metrics(addr: Option<SocketAddr>) {
    if addr.is_some() {
        tracing::warn!("built without metrics support; ignoring --metrics-addr");
    }
}

#[tokio::main]
async fn main() -> bearerbox::Result<()> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    install_metrics(cli.metrics_addr);
    let config = load_config(&cli)?;

    let session = Client::new(config)
        .identify(Arc::new(DefaultSessionHandler))
        .await?;
    let sms = Sms::new(cli.from, cli.to, cli.text);
    let result = session
        .send_request_and_wait(sms, Duration::from_secs(cli.timeout))
        .await;
    session.destroy().await;

    let ack = result?;
    println!("{} {:?}", ack.id, ack.response);
    Ok(())
}
