//! Command dispatch: bridges CLI args -> station calls -> output formatting.

pub mod cameras;
pub mod config_cmd;
pub mod home_mode;
pub mod run;
pub mod snapshot;
pub mod trigger;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command to its handler.
///
/// One-shot commands share a short-lived session that is logged out
/// whether or not the command succeeds.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        // Config commands don't need a station connection
        Command::Config(args) => config_cmd::handle(args, global),

        Command::Run(args) => run::handle(args, global).await,

        Command::Cameras => {
            let station = util::connect(global).await?;
            util::finish(&station, cameras::handle(&station, global).await).await
        }
        Command::Snapshot(args) => {
            let station = util::connect(global).await?;
            util::finish(&station, snapshot::handle(&station, args, global).await).await
        }
        Command::Trigger(args) => {
            let station = util::connect(global).await?;
            util::finish(&station, trigger::handle(&station, &args, global).await).await
        }
        Command::HomeMode(args) => {
            let station = util::connect(global).await?;
            util::finish(&station, home_mode::handle(&station, &args, global).await).await
        }
    }
}
