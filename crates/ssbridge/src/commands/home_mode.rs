//! Home mode query and switch.

use ssbridge_core::{ChannelCommand, Station, channel};

use crate::cli::{GlobalOpts, HomeModeArgs, Switch};
use crate::error::CliError;
use crate::output;

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

pub async fn handle(station: &Station, args: &HomeModeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let on = match args.state {
        Some(state) => {
            let on = state == Switch::On;
            station
                .handle_command(channel::HOME_MODE, ChannelCommand::OnOff(on))
                .await?;
            on
        }
        None => station.home_mode().await?,
    };
    output::print_output(on_off(on), global.quiet);
    Ok(())
}
