use std::sync::Arc;

use color_eyre::Result;
use eyre::WrapErr;
use log::info;

use crate::{
    polling::{discover_thermostats, start_poll_loop},
    protocols::mqtt::MqttConnector,
    settings::Settings,
    tcc::{SessionProvider, TccApi},
};

/// Log filter for `settings`, used when `RUST_LOG` is not set.
pub fn log_filter(settings: &Settings) -> &str {
    if settings.debug {
        "debug"
    } else {
        &settings.log_level
    }
}

/// Installs the error report handler and the logger.
pub fn init(settings: &Settings) -> Result<()> {
    color_eyre::install()?;
    init_logger(settings)
}

/// Configures `pretty_env_logger`, honouring `RUST_LOG` when set.
pub fn init_logger(settings: &Settings) -> Result<()> {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    match std::env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.parse_filters(log_filter(settings)),
    };
    builder.try_init()?;

    Ok(())
}

/// Logs in, discovers thermostats and keeps them in sync with the broker
/// until interrupted.
pub async fn run(settings: Settings, api: Arc<dyn TccApi>) -> Result<()> {
    let sessions = SessionProvider::login(api, &settings.tcc.username, &settings.tcc.password)
        .await
        .wrap_err("Could not log into TCC")?;

    let connector = MqttConnector::new(&settings.mqtt);
    let thermostats = discover_thermostats(&settings, &sessions, &connector)
        .await
        .wrap_err("Could not set up thermostats")?;

    info!(
        "Bridging {} thermostat(s) to {}:{}",
        thermostats.len(),
        settings.mqtt.host,
        settings.mqtt.port
    );

    start_poll_loop(&settings, &sessions, thermostats);

    tokio::signal::ctrl_c().await?;

    Ok(())
}
