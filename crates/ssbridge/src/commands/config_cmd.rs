//! Config subcommand handlers.

use std::io::BufRead;

use serde::Serialize;
use tabled::Tabled;

use ssbridge_config::KEYRING_SERVICE;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct ProfileSummary {
    name: String,
    url: String,
    default: bool,
    cameras: usize,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "Cameras")]
    cameras: usize,
    #[tabled(rename = "Default")]
    default: &'static str,
}

fn to_row(p: &ProfileSummary) -> ProfileRow {
    ProfileRow {
        name: p.name.clone(),
        url: p.url.clone(),
        cameras: p.cameras,
        default: if p.default { "*" } else { "" },
    }
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            output::print_output(cfg.to_redacted_toml()?.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_file(global).display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load(global)?;
            let summaries: Vec<ProfileSummary> = cfg
                .profiles
                .iter()
                .map(|(name, profile)| ProfileSummary {
                    name: name.clone(),
                    url: profile.url.clone(),
                    default: cfg.default_profile.as_deref() == Some(name.as_str()),
                    cameras: profile.cameras.len(),
                })
                .collect();
            let out = output::render_list(global.output, &summaries, to_row, |p| p.name.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let cfg = config::load(global)?;
            let profile = global
                .profile
                .clone()
                .or(cfg.default_profile)
                .unwrap_or_else(|| "default".into());

            if !global.quiet {
                eprintln!("Password for profile '{profile}' (one line on stdin):");
            }
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            let password = line.trim_end_matches(['\r', '\n']);
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "must not be empty".into(),
                });
            }

            keyring::Entry::new(KEYRING_SERVICE, &format!("{profile}/password"))?
                .set_password(password)?;
            if !global.quiet {
                eprintln!("Password stored in the system keyring");
            }
            Ok(())
        }
    }
}
