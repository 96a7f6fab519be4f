use crate::session::{
    claims::SUPER_USER_ROLE, DecodedClaims, Error, Method, SessionManager, SessionState,
};
use anyhow::{anyhow, Result};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

/// Log in; an inactive account is turned into activation instructions.
/// # Errors
/// Returns an error if the login is rejected or the issued token is unusable.
pub async fn login(
    manager: &SessionManager,
    username: &str,
    password: &SecretString,
) -> Result<String> {
    match manager.login(username, password.expose_secret()).await {
        Ok(_) => Ok(format!(
            "Login successful!\n{}",
            describe(&manager.current_state(), manager.claims().as_ref())
        )),
        Err(err @ Error::ActivationRequired { .. }) => Err(anyhow!(
            "{err}\nRequest a code with `opal-session request-otp --email <email>`, \
             then run `opal-session activate --email <email> --otp-code <code>`."
        )),
        Err(err) => Err(err.into()),
    }
}

/// # Errors
/// Returns an error if the server rejects the registration.
pub async fn register(
    manager: &SessionManager,
    username: &str,
    email: &str,
    password: &SecretString,
) -> Result<String> {
    let pending = manager
        .register(username, email, password.expose_secret())
        .await?;
    let email = manager.registered_email().unwrap_or(pending.email);
    Ok(format!(
        "Registration successful! Activate the account before logging in:\n  \
         opal-session request-otp --email {email}\n  \
         opal-session activate --email {email} --otp-code <code>"
    ))
}

/// # Errors
/// Returns an error if no email is known or the server refuses to send the code.
pub async fn request_otp(manager: &SessionManager, email: Option<&str>) -> Result<String> {
    let email = resolve_email(manager, email)?;
    manager.request_otp(&email).await?;
    Ok(format!("Activation code sent to {email}."))
}

/// # Errors
/// Returns an error if no email is known or the code is rejected.
pub async fn activate(
    manager: &SessionManager,
    email: Option<&str>,
    otp_code: &SecretString,
) -> Result<String> {
    let email = resolve_email(manager, email)?;
    manager
        .activate_account(&email, otp_code.expose_secret())
        .await?;
    Ok("Account activated. You can now log in.".to_string())
}

/// # Errors
/// Returns an error if no email is known, the code is rejected, or the issued
/// token is unusable.
pub async fn verify_otp(
    manager: &SessionManager,
    email: Option<&str>,
    otp_code: &SecretString,
) -> Result<String> {
    let email = resolve_email(manager, email)?;
    manager.verify_otp(&email, otp_code.expose_secret()).await?;
    Ok(format!(
        "Code verified, logged in.\n{}",
        describe(&manager.current_state(), manager.claims().as_ref())
    ))
}

#[must_use]
pub fn logout(manager: &SessionManager) -> String {
    manager.logout();
    "Logged out.".to_string()
}

#[must_use]
pub fn status(manager: &SessionManager) -> String {
    describe(&manager.current_state(), manager.claims().as_ref())
}

/// # Errors
/// Returns an error if there is no session or the server rejects the refresh token.
pub async fn refresh(manager: &SessionManager) -> Result<String> {
    manager.refresh().await?;
    Ok(format!(
        "Tokens refreshed.\n{}",
        describe(&manager.current_state(), manager.claims().as_ref())
    ))
}

/// # Errors
/// Returns an error if the token is rejected.
pub async fn whoami(manager: &SessionManager) -> Result<String> {
    let validation = manager.validate().await?;
    Ok(format!(
        "{} (roles: {})",
        validation.username,
        join_or_none(validation.roles.iter().map(String::as_str))
    ))
}

/// # Errors
/// Returns an error if the request fails or the session was invalidated.
pub async fn request(
    manager: &SessionManager,
    method: Method,
    path: &str,
    body: Option<&Value>,
) -> Result<String> {
    let value = manager.authorized_request(method, path, body).await?;
    Ok(serde_json::to_string_pretty(&value)?)
}

/// The explicit `--email`, or the one remembered from registration.
fn resolve_email(manager: &SessionManager, email: Option<&str>) -> Result<String> {
    email
        .map(ToString::to_string)
        .or_else(|| manager.registered_email())
        .ok_or_else(|| anyhow!("no registered email found, pass --email"))
}

fn describe(state: &SessionState, claims: Option<&DecodedClaims>) -> String {
    match state {
        SessionState::Anonymous => "Not logged in.".to_string(),
        SessionState::Authenticated { roles } => {
            let mut lines = vec![format!(
                "Logged in as {}",
                claims
                    .and_then(|c| c.subject.as_deref())
                    .unwrap_or("<unknown>")
            )];
            lines.push(format!(
                "Roles: {}",
                join_or_none(roles.iter().map(String::as_str))
            ));
            if roles.contains(SUPER_USER_ROLE) {
                lines.push("User management: enabled".to_string());
            }
            if let Some(exp) = claims.and_then(|c| c.expiry) {
                lines.push(format!("Access token expires at (unix): {exp}"));
            }
            lines.join("\n")
        }
    }
}

fn join_or_none<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let joined = items.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "none".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn roles(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn describe_anonymous() {
        assert_eq!(describe(&SessionState::Anonymous, None), "Not logged in.");
    }

    #[test]
    fn describe_super_user() {
        let claims = DecodedClaims {
            subject: Some("root".to_string()),
            roles: roles(&["super_user", "user"]),
            expiry: Some(1_900_000_000),
        };
        let state = SessionState::Authenticated {
            roles: claims.roles.clone(),
        };

        let text = describe(&state, Some(&claims));

        assert!(text.starts_with("Logged in as root"));
        assert!(text.contains("Roles: super_user, user"));
        assert!(text.contains("User management: enabled"));
        assert!(text.contains("1900000000"));
    }

    #[test]
    fn describe_without_roles() {
        let state = SessionState::Authenticated {
            roles: BTreeSet::new(),
        };
        let text = describe(&state, None);
        assert!(text.contains("Logged in as <unknown>"));
        assert!(text.contains("Roles: none"));
        assert!(!text.contains("User management"));
    }
}
