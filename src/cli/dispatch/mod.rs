use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::{anyhow, Context, Result};
use reqwest::Method;
use secrecy::SecretString;
use serde_json::Value;
use std::{path::PathBuf, time::Duration};

/// # Errors
/// Returns an error if required arguments are missing or malformed.
pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let base_url = matches
        .get_one::<String>("base-url")
        .cloned()
        .context("missing required argument: --base-url")?;

    let mut globals = GlobalArgs::new(base_url);
    if let Some(store) = matches.get_one::<String>("store") {
        globals.store_path = PathBuf::from(store);
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        globals.timeout = Duration::from_secs(*timeout);
    }

    let action = match matches.subcommand() {
        Some(("login", sub_m)) => Action::Login {
            username: required(sub_m, "username")?,
            password: SecretString::from(required(sub_m, "password")?),
        },
        Some(("register", sub_m)) => Action::Register {
            username: required(sub_m, "username")?,
            email: required(sub_m, "email")?,
            password: SecretString::from(required(sub_m, "password")?),
        },
        Some(("request-otp", sub_m)) => Action::RequestOtp {
            email: sub_m.get_one::<String>("email").cloned(),
        },
        Some(("activate", sub_m)) => Action::Activate {
            email: sub_m.get_one::<String>("email").cloned(),
            otp_code: SecretString::from(required(sub_m, "otp-code")?),
        },
        Some(("verify-otp", sub_m)) => Action::VerifyOtp {
            email: sub_m.get_one::<String>("email").cloned(),
            otp_code: SecretString::from(required(sub_m, "otp-code")?),
        },
        Some(("logout", _)) => Action::Logout,
        Some(("status", _)) => Action::Status,
        Some(("refresh", _)) => Action::Refresh,
        Some(("whoami", _)) => Action::Whoami,
        Some(("request", sub_m)) => {
            let method = required(sub_m, "method")?.to_uppercase();
            let method = Method::from_bytes(method.as_bytes())
                .map_err(|_| anyhow!("invalid HTTP method: {method}"))?;
            let body = sub_m
                .get_one::<String>("data")
                .map(|raw| serde_json::from_str::<Value>(raw))
                .transpose()
                .context("--data must be valid JSON")?;

            Action::Request {
                method,
                path: required(sub_m, "path")?,
                body,
            }
        }
        Some((name, _)) => return Err(anyhow!("unknown command: {name}")),
        None => return Err(anyhow!("missing command, see --help")),
    };

    Ok((action, globals))
}

fn required(matches: &clap::ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: --{name}"))
}
