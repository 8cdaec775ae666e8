//! Long-running bridge: station plus cameras until Ctrl-C.

use std::sync::Arc;

use tracing::{info, warn};

use ssbridge_config::SystemSecrets;
use ssbridge_core::{Camera, CameraConfig, Station};

use crate::cli::{GlobalOpts, RunArgs};
use crate::config;
use crate::console::ConsoleThing;
use crate::error::CliError;

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global, &SystemSecrets)?;

    let mut camera_configs = resolved.cameras;
    for id in args.cameras {
        if !camera_configs.iter().any(|c| c.camera_id == id) {
            camera_configs.push(CameraConfig::new(id));
        }
    }

    let thing = |label: String| Arc::new(ConsoleThing::new(label, &args.channels, global.output, global.quiet));

    let station = Station::new(resolved.station, thing("station".into()))?;
    station.initialize().await?;

    let mut cameras = Vec::with_capacity(camera_configs.len());
    for camera_config in camera_configs {
        let label = format!("camera {}", camera_config.camera_id);
        let camera = Camera::new(&station, camera_config, thing(label));
        if let Err(err) = camera.initialize().await {
            shutdown(&station, &cameras).await;
            return Err(err.into());
        }
        cameras.push(camera);
    }

    info!(
        profile = %resolved.profile_name,
        station = station.label(),
        cameras = cameras.len(),
        "running, press Ctrl-C to stop"
    );

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for Ctrl-C, stopping");
    }
    info!("shutting down");
    shutdown(&station, &cameras).await;
    Ok(())
}

async fn shutdown(station: &Station, cameras: &[Camera]) {
    for camera in cameras {
        camera.dispose().await;
    }
    station.dispose().await;
}
