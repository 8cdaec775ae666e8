//! Camera listing.

use tabled::Tabled;

use ssbridge_core::{CameraInfo, Station};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct CameraRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Enabled")]
    enabled: &'static str,
    #[tabled(rename = "PTZ")]
    ptz: &'static str,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "IP")]
    ip: String,
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn to_row(camera: &CameraInfo) -> CameraRow {
    let model = [camera.vendor.as_deref(), camera.model.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    CameraRow {
        id: camera.id,
        name: camera.display_name().to_owned(),
        status: camera.status_text(),
        enabled: yes_no(camera.enabled),
        ptz: yes_no(camera.has_ptz()),
        model,
        ip: camera.ip.clone().unwrap_or_default(),
    }
}

pub async fn handle(station: &Station, global: &GlobalOpts) -> Result<(), CliError> {
    let cameras = station.list_cameras().await?;
    let out = output::render_list(global.output, &cameras, to_row, |c| c.id.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
