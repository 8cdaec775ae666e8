//! External event trigger.

use ssbridge_core::{ChannelCommand, Station, channel};

use crate::cli::{GlobalOpts, TriggerArgs};
use crate::error::CliError;

pub async fn handle(station: &Station, args: &TriggerArgs, global: &GlobalOpts) -> Result<(), CliError> {
    station
        .handle_command(channel::EXTERNAL_EVENT, ChannelCommand::Number(args.event))
        .await?;
    if !global.quiet {
        eprintln!("External event {} triggered", args.event);
    }
    Ok(())
}
