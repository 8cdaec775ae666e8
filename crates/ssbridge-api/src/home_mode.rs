// Home mode endpoints (`SYNO.SurveillanceStation.HomeMode`)

use tracing::debug;

use crate::client::{Endpoint, SurveillanceClient};
use crate::error::Error;
use crate::models::HomeModeInfo;

const HOME_MODE_API: &str = "SYNO.SurveillanceStation.HomeMode";

const GET_INFO: Endpoint = Endpoint::entry(HOME_MODE_API, "GetInfo", 1);
const SWITCH: Endpoint = Endpoint::entry(HOME_MODE_API, "Switch", 1);

impl SurveillanceClient {
    /// Whether home mode is currently active.
    pub async fn home_mode(&self) -> Result<bool, Error> {
        let info: HomeModeInfo = self.call(GET_INFO, &[]).await?;
        Ok(info.on)
    }

    pub async fn set_home_mode(&self, on: bool) -> Result<(), Error> {
        debug!(on, "switching home mode");
        self.call_unit(SWITCH, &[("on", on.to_string())]).await
    }
}
