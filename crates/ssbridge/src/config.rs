//! Resolves the station and camera configs for one invocation.
//!
//! The profile comes from the TOML file; `--url`, `--username`,
//! `--insecure` and `--timeout` override it. Without a matching profile,
//! `--url` alone is enough as long as credentials come from the
//! environment or keyring.

use std::path::PathBuf;

use ssbridge_config::{self as cfg, Config, Profile, SecretSource};
use ssbridge_core::{CameraConfig, StationConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Everything a command needs to talk to one station.
#[derive(Debug)]
pub struct Resolved {
    pub profile_name: String,
    pub station: StationConfig,
    pub cameras: Vec<CameraConfig>,
}

pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(cfg::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(cfg::load_config_from(&config_file(global))?)
}

/// Pick the profile and apply command-line overrides.
pub fn resolve(global: &GlobalOpts, secrets: &impl SecretSource) -> Result<Resolved, CliError> {
    let config = load(global)?;

    let (profile_name, mut profile) = match config.profile(global.profile.as_deref()) {
        Ok((name, profile)) => (name, profile.clone()),
        // An ad-hoc station given entirely on the command line
        Err(_) if global.profile.is_none() && global.url.is_some() => {
            ("default".to_owned(), Profile::default())
        }
        Err(e) => return Err(e.into()),
    };

    apply_overrides(&mut profile, global);

    let station = cfg::profile_to_station_config(&profile, &profile_name, &config.defaults, secrets)?;
    let cameras = cfg::camera_configs(&profile)?;
    Ok(Resolved {
        profile_name,
        station,
        cameras,
    })
}

fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref url) = global.url {
        profile.url.clone_from(url);
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
}
