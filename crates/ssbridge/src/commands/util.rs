//! Shared helpers for command handlers.

use std::sync::Arc;

use tracing::debug;

use ssbridge_config::SystemSecrets;
use ssbridge_core::Station;

use crate::cli::GlobalOpts;
use crate::config;
use crate::console::ConsoleThing;
use crate::error::CliError;

/// Log in for a one-shot command.
///
/// Nothing is polled: both station intervals are zeroed and no channel
/// is linked.
pub async fn connect(global: &GlobalOpts) -> Result<Station, CliError> {
    let resolved = config::resolve(global, &SystemSecrets)?;
    let mut station_config = resolved.station;
    station_config.home_mode_interval_secs = 0;
    station_config.event_interval_secs = 0;
    station_config.validate()?;

    let station = Station::new(station_config, Arc::new(ConsoleThing::detached("station")))?;
    debug!(profile = %resolved.profile_name, station = station.label(), "connecting");
    station.reconnect(true).await?;
    Ok(station)
}

/// End the session, then hand back the command's result.
pub async fn finish<T>(station: &Station, result: Result<T, CliError>) -> Result<T, CliError> {
    station.dispose().await;
    result
}
