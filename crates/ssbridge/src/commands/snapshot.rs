//! Single snapshot to a file.

use std::path::PathBuf;

use ssbridge_core::{Station, StreamProfile};

use crate::cli::{GlobalOpts, SnapshotArgs, StreamArg};
use crate::error::CliError;

impl From<StreamArg> for StreamProfile {
    fn from(arg: StreamArg) -> Self {
        match arg {
            StreamArg::HighQuality => Self::HighQuality,
            StreamArg::Balanced => Self::Balanced,
            StreamArg::LowBandwidth => Self::LowBandwidth,
        }
    }
}

fn default_path(camera_id: u32) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    PathBuf::from(format!("camera-{camera_id}-{stamp}.jpg"))
}

pub async fn handle(station: &Station, args: SnapshotArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let image = station.snapshot(args.camera, args.stream.into()).await?;
    let path = args.out.unwrap_or_else(|| default_path(args.camera));
    tokio::fs::write(&path, &image).await?;
    if !global.quiet {
        eprintln!("Saved {} bytes to {}", image.len(), path.display());
    }
    Ok(())
}
