use crate::cli::{
    actions::{session, Action},
    globals::GlobalArgs,
};
use anyhow::Result;
use tracing::debug;

/// Execute the provided action.
// This is the single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action, globals: &GlobalArgs) -> Result<()> {
    let manager = globals.session_manager()?;
    debug!(store = %globals.store_path.display(), base_url = %globals.base_url, "session ready");

    let output = match action {
        Action::Login { username, password } => {
            session::login(&manager, &username, &password).await?
        }
        Action::Register {
            username,
            email,
            password,
        } => session::register(&manager, &username, &email, &password).await?,
        Action::RequestOtp { email } => {
            session::request_otp(&manager, email.as_deref()).await?
        }
        Action::Activate { email, otp_code } => {
            session::activate(&manager, email.as_deref(), &otp_code).await?
        }
        Action::VerifyOtp { email, otp_code } => {
            session::verify_otp(&manager, email.as_deref(), &otp_code).await?
        }
        Action::Logout => session::logout(&manager),
        Action::Status => session::status(&manager),
        Action::Refresh => session::refresh(&manager).await?,
        Action::Whoami => session::whoami(&manager).await?,
        Action::Request { method, path, body } => {
            session::request(&manager, method, &path, body.as_ref()).await?
        }
    };

    println!("{output}");

    Ok(())
}
