// PTZ endpoints (`SYNO.SurveillanceStation.PTZ`)

use tracing::debug;

use crate::client::{Endpoint, SurveillanceClient};
use crate::error::Error;
use crate::models::PtzDirection;

const MOVE: Endpoint = Endpoint::entry("SYNO.SurveillanceStation.PTZ", "Move", 5);

/// Speed sent with every move; the station accepts 1 (slow) through 5.
const DEFAULT_SPEED: u8 = 3;

impl SurveillanceClient {
    /// Start continuous movement in `direction`. Runs until [`ptz_stop`]
    /// is called for the same direction.
    ///
    /// [`ptz_stop`]: SurveillanceClient::ptz_stop
    pub async fn ptz_start(&self, camera_id: u32, direction: PtzDirection) -> Result<(), Error> {
        debug!(camera_id, direction = direction.as_str(), "PTZ start");
        self.ptz_move(camera_id, direction, "Start").await
    }

    pub async fn ptz_stop(&self, camera_id: u32, direction: PtzDirection) -> Result<(), Error> {
        debug!(camera_id, direction = direction.as_str(), "PTZ stop");
        self.ptz_move(camera_id, direction, "Stop").await
    }

    async fn ptz_move(
        &self,
        camera_id: u32,
        direction: PtzDirection,
        move_type: &str,
    ) -> Result<(), Error> {
        self.call_unit(
            MOVE,
            &[
                ("cameraId", camera_id.to_string()),
                ("direction", direction.as_str().to_owned()),
                ("speed", DEFAULT_SPEED.to_string()),
                ("moveType", move_type.to_owned()),
            ],
        )
        .await
    }
}
