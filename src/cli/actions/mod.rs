pub mod session;

// Internal "interpreter" for `Action`.
mod run;

use crate::cli::globals::GlobalArgs;
use reqwest::Method;
use secrecy::SecretString;
use serde_json::Value;

#[derive(Debug)]
pub enum Action {
    Login {
        username: String,
        password: SecretString,
    },
    Register {
        username: String,
        email: String,
        password: SecretString,
    },
    RequestOtp {
        email: Option<String>,
    },
    Activate {
        email: Option<String>,
        otp_code: SecretString,
    },
    VerifyOtp {
        email: Option<String>,
        otp_code: SecretString,
    },
    Logout,
    Status,
    Refresh,
    Whoami,
    Request {
        method: Method,
        path: String,
        body: Option<Value>,
    },
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self, globals: &GlobalArgs) -> anyhow::Result<()> {
        run::execute(self, globals).await
    }
}
