//! Intern dashboard service

use actix_web::{App, HttpServer};
use clap::Parser;
use color_eyre::Result;
use dashboard::auth::directory::password_digest;
use std::io::read_to_string;
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::config::{Config, LogFormat};
use crate::model::Model;
use crate::opt::{Command, Opt};

mod config;
pub mod model;
mod opt;
mod service;

/// Initializes tracing collection
fn setup_tracing(config: config::Logging) {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let fmt_layer = match config.format {
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let filter_layer = config
        .filters
        .into_iter()
        .fold(filter_layer, |layer, filter| layer.add_directive(filter));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let Opt {
        config: mut config_file,
        command,
    } = Opt::parse();

    if let Some(Command::Digest { username, password }) = command {
        println!("{}", password_digest(&username, &password));
        return Ok(());
    }

    let config = match &mut config_file {
        Some(input) => toml::from_str(&read_to_string(input)?)?,
        None => Config::default(),
    };

    setup_tracing(config.logging.clone());
    color_eyre::install()?;

    info!(
        config = ?config_file.as_ref().map(|input| input.path().path()),
        assets = ?config.assets,
        "Tracing initialized, setting up a service"
    );

    let model = Model::with_config(&config);
    let service_config = service::configure(model, config.assets.clone());
    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .configure(service_config.clone())
    })
    .bind(config.host)?
    .run()
    .await?;

    info!("Service stopped, tearing down");
    Ok(())
}
