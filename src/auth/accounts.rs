//! Registration, login and logout.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

use super::TokenGenerator;
use super::password::{MIN_PASSWORD_LEN, hash_password, verify_password};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{NewUser, Role, Token, User};

const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 254;
const TOKEN_ISSUE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Accounts created with exactly this email get the admin role.
    pub admin_email: String,
    pub token_ttl: Duration,
}

/// A freshly issued session. The raw token is only ever returned here.
#[derive(Debug, Serialize)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

pub fn validate_registration(name: &str, email: &str, password: &str) -> Result<()> {
    if name.trim().is_empty() || email.is_empty() || password.is_empty() {
        return Err(Error::invalid("name, email and password are required"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::invalid(format!(
            "name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    if email.len() > MAX_EMAIL_LEN || !email.contains('@') || email.contains(char::is_whitespace) {
        return Err(Error::invalid("email is not valid"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::invalid(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Creates a user with a hashed password. Callers decide the role.
pub fn create_user(
    store: &dyn Store,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<User> {
    validate_registration(name, email, password)?;

    if store.get_user_by_email(email)?.is_some() {
        return Err(Error::AlreadyExists("email"));
    }

    let user = store.create_user(&NewUser {
        name: name.trim().to_string(),
        email: email.to_string(),
        password_hash: hash_password(password)?,
        role,
    })?;

    info!("Created {} account {} ({})", user.role, user.id, user.email);
    Ok(user)
}

/// Self-service signup. The role comes from the configured admin email.
pub fn register(
    store: &dyn Store,
    settings: &AuthSettings,
    name: &str,
    email: &str,
    password: &str,
) -> Result<Session> {
    let role = Role::for_new_account(email, &settings.admin_email);
    let user = create_user(store, name, email, password, role)?;
    start_session(store, settings, user)
}

/// Unknown email and wrong password fail identically.
pub fn login(
    store: &dyn Store,
    settings: &AuthSettings,
    email: &str,
    password: &str,
) -> Result<Session> {
    let user = store
        .get_user_by_email(email)?
        .ok_or(Error::Unauthorized)?;

    if !verify_password(password, &user.password_hash)? {
        return Err(Error::Unauthorized);
    }

    start_session(store, settings, user)
}

pub fn logout(store: &dyn Store, token: &Token) -> Result<()> {
    store.delete_token(&token.id)?;
    Ok(())
}

fn start_session(store: &dyn Store, settings: &AuthSettings, user: User) -> Result<Session> {
    let generator = TokenGenerator::new();

    for _ in 0..TOKEN_ISSUE_ATTEMPTS {
        let (token, raw_token) = generator.issue(user.id, settings.token_ttl)?;
        match store.create_token(&token) {
            Ok(()) => {
                return Ok(Session {
                    token: raw_token,
                    expires_at: token.expires_at,
                    user,
                });
            }
            Err(Error::TokenLookupCollision) => continue,
            Err(e) => return Err(e),
        }
    }

    Err(Error::TokenLookupCollision)
}
