// ssbridge-api: Async Rust client for the Synology Surveillance Station web API

pub mod auth;
pub mod camera;
pub mod client;
pub mod error;
pub mod events;
pub mod home_mode;
pub mod models;
pub mod ptz;
pub mod session;
pub mod transport;

pub use client::{Credentials, SurveillanceClient};
pub use error::Error;
pub use events::EventQuery;
pub use models::{CameraInfo, EventList, EventRecord, LiveUri, PtzDirection, StreamProfile};
pub use session::{Session, SessionStore};
pub use transport::{TlsMode, TransportConfig};
