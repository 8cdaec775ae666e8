// Camera endpoints
//
// Listing, per-camera info, enable/disable, snapshots and live-view URIs,
// all under `SYNO.SurveillanceStation.Camera`.

use bytes::Bytes;
use tracing::debug;

use crate::client::{Endpoint, SurveillanceClient};
use crate::error::Error;
use crate::models::{CameraInfo, CameraList, LiveUri, StreamProfile};

const CAMERA_API: &str = "SYNO.SurveillanceStation.Camera";
const CAMERA_VERSION: u32 = 9;

const LIST: Endpoint = Endpoint::entry(CAMERA_API, "List", CAMERA_VERSION);
const GET_INFO: Endpoint = Endpoint::entry(CAMERA_API, "GetInfo", CAMERA_VERSION);
const ENABLE: Endpoint = Endpoint::entry(CAMERA_API, "Enable", CAMERA_VERSION);
const DISABLE: Endpoint = Endpoint::entry(CAMERA_API, "Disable", CAMERA_VERSION);
const GET_SNAPSHOT: Endpoint = Endpoint::entry(CAMERA_API, "GetSnapshot", CAMERA_VERSION);
const GET_LIVE_VIEW_PATH: Endpoint = Endpoint::entry(CAMERA_API, "GetLiveViewPath", CAMERA_VERSION);

impl SurveillanceClient {
    /// List every camera configured on the station.
    pub async fn list_cameras(&self) -> Result<Vec<CameraInfo>, Error> {
        debug!("listing cameras");
        let list: CameraList = self.call(LIST, &[("basic", "true".to_owned())]).await?;
        Ok(list.cameras)
    }

    /// Fetch the current info for one camera.
    pub async fn camera_info(&self, camera_id: u32) -> Result<CameraInfo, Error> {
        let list: CameraList = self
            .call(GET_INFO, &[("cameraIds", camera_id.to_string())])
            .await?;
        list.cameras
            .into_iter()
            .find(|c| c.id == camera_id)
            .ok_or(Error::MissingData {
                api: GET_INFO.api,
                method: GET_INFO.method,
            })
    }

    pub async fn enable_camera(&self, camera_id: u32) -> Result<(), Error> {
        debug!(camera_id, "enabling camera");
        self.call_unit(ENABLE, &[("idList", camera_id.to_string())])
            .await
    }

    pub async fn disable_camera(&self, camera_id: u32) -> Result<(), Error> {
        debug!(camera_id, "disabling camera");
        self.call_unit(DISABLE, &[("idList", camera_id.to_string())])
            .await
    }

    /// Grab a JPEG snapshot from the given stream profile.
    pub async fn snapshot(&self, camera_id: u32, profile: StreamProfile) -> Result<Bytes, Error> {
        self.call_binary(
            GET_SNAPSHOT,
            &[
                ("cameraId", camera_id.to_string()),
                ("profileType", profile.code().to_string()),
            ],
        )
        .await
    }

    /// Resolve the live-view stream URIs for one camera.
    pub async fn live_uri(&self, camera_id: u32) -> Result<LiveUri, Error> {
        let uris: Vec<LiveUri> = self
            .call(GET_LIVE_VIEW_PATH, &[("idList", camera_id.to_string())])
            .await?;
        uris.into_iter()
            .find(|u| u.id == camera_id)
            .ok_or(Error::MissingData {
                api: GET_LIVE_VIEW_PATH.api,
                method: GET_LIVE_VIEW_PATH.method,
            })
    }
}
