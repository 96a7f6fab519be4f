use clap::{Arg, Command};

fn username() -> Arg {
    Arg::new("username")
        .long("username")
        .help("Account username")
        .env("OPAL_USERNAME")
        .required(true)
}

fn password() -> Arg {
    Arg::new("password")
        .long("password")
        .help("Account password")
        .env("OPAL_PASSWORD")
        .hide_env_values(true)
        .required(true)
}

fn email() -> Arg {
    Arg::new("email")
        .long("email")
        .help("Account email address")
        .env("OPAL_EMAIL")
        .required(true)
}

/// Defaults to the address remembered by `register`.
fn registered_email() -> Arg {
    Arg::new("email")
        .long("email")
        .help("Account email address (default: the one used to register)")
        .env("OPAL_EMAIL")
}

fn otp_code() -> Arg {
    Arg::new("otp-code")
        .long("otp-code")
        .help("One-time activation code")
        .required(true)
}

pub fn with_subcommands(command: Command) -> Command {
    command
        .subcommand(
            Command::new("login")
                .about("Log in and store the token pair")
                .arg(username())
                .arg(password()),
        )
        .subcommand(
            Command::new("register")
                .about("Create an account (activation required before login)")
                .arg(username())
                .arg(email())
                .arg(password()),
        )
        .subcommand(
            Command::new("request-otp")
                .about("Send an activation code to the account email")
                .arg(registered_email()),
        )
        .subcommand(
            Command::new("activate")
                .about("Activate an account with a one-time code")
                .arg(registered_email())
                .arg(otp_code()),
        )
        .subcommand(
            Command::new("verify-otp")
                .about("Verify a one-time code and log in with the issued tokens")
                .arg(registered_email())
                .arg(otp_code()),
        )
        .subcommand(Command::new("logout").about("Clear the stored session"))
        .subcommand(Command::new("status").about("Show the current session state"))
        .subcommand(Command::new("refresh").about("Exchange the refresh token for a new pair"))
        .subcommand(Command::new("whoami").about("Ask the auth service to validate the token"))
        .subcommand(
            Command::new("request")
                .about("Send an authorized request and print the JSON response")
                .arg(
                    Arg::new("method")
                        .short('X')
                        .long("method")
                        .help("HTTP method")
                        .default_value("GET")
                        .value_parser(["GET", "POST", "PUT", "PATCH", "DELETE"])
                        .ignore_case(true),
                )
                .arg(
                    Arg::new("data")
                        .short('d')
                        .long("data")
                        .help("JSON request body"),
                )
                .arg(
                    Arg::new("path")
                        .help("Path relative to the base URL, or an absolute URL")
                        .required(true),
                ),
        )
}
