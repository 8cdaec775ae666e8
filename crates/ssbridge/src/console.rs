//! Console host: prints every channel update and status change.

use std::collections::BTreeSet;

use serde_json::json;
use tracing::{info, warn};

use ssbridge_core::{State, ThingCallback, ThingStatus};

use crate::cli::OutputFormat;

/// Receives updates for one thing (the station or a camera).
#[derive(Debug)]
pub struct ConsoleThing {
    label: String,
    /// Linked channels; `None` links everything.
    channels: Option<BTreeSet<String>>,
    format: OutputFormat,
    quiet: bool,
}

impl ConsoleThing {
    pub fn new(label: impl Into<String>, channels: &[String], format: OutputFormat, quiet: bool) -> Self {
        Self {
            label: label.into(),
            channels: (!channels.is_empty()).then(|| channels.iter().cloned().collect()),
            format,
            quiet,
        }
    }

    /// A thing with nothing linked, for one-shot commands.
    pub fn detached(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            channels: Some(BTreeSet::new()),
            format: OutputFormat::Plain,
            quiet: true,
        }
    }

    fn emit(&self, channel: &str, value: &str) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Json => println!(
                "{}",
                json!({
                    "time": chrono::Utc::now().to_rfc3339(),
                    "thing": self.label,
                    "channel": channel,
                    "value": value,
                })
            ),
            OutputFormat::Table => println!(
                "{}  {:<12} {:<20} {value}",
                chrono::Local::now().format("%H:%M:%S"),
                self.label,
                channel
            ),
            OutputFormat::Plain => println!("{}\t{channel}\t{value}", self.label),
        }
    }
}

impl ThingCallback for ConsoleThing {
    fn is_linked(&self, channel: &str) -> bool {
        self.channels.as_ref().is_none_or(|set| set.contains(channel))
    }

    fn update_state(&self, channel: &str, state: State) {
        info!(thing = %self.label, channel, %state, "state update");
        self.emit(channel, &state.to_string());
    }

    fn update_status(&self, status: ThingStatus) {
        if status.is_online() {
            info!(thing = %self.label, %status, "status");
        } else {
            warn!(thing = %self.label, %status, "status");
        }
        self.emit("thing-status", &status.to_string());
    }
}
