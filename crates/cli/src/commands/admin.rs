//! Admin user bootstrap commands.
//!
//! The HTTP API can only grant admin to callers who are already admins, so
//! the first admin is created here.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `SHOPDESK_ADMIN_PASSWORD` - Password for `admin create` when `-p` is omitted

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use shopdesk_core::Email;
use shopdesk_server::db::{self, RepositoryError, UserRepository, UserStore};
use shopdesk_server::models::NewUser;

use super::{DATABASE_URL_VAR, database_url};

/// Minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 12;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository error.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Password too weak.
    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,

    /// Password hashing failed.
    #[error("Failed to hash password")]
    PasswordHash,

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    /// No user with that email.
    #[error("No user with email: {0}")]
    UserNotFound(String),
}

/// Create a new admin user.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns `AdminError` for invalid input, an existing email or a database failure.
pub async fn create_user(
    email: &str,
    name: &str,
    password: SecretString,
) -> Result<i32, AdminError> {
    let email = Email::parse(email).map_err(|e| AdminError::InvalidEmail(e.to_string()))?;
    let password_hash = hash_password(&password)?;

    let url = database_url().ok_or(AdminError::MissingEnvVar(DATABASE_URL_VAR))?;
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&url).await?;
    let users = UserRepository::new(&pool);

    let email_text = email.to_string();
    if users.get_by_email(&email).await?.is_some() {
        return Err(AdminError::UserExists(email_text));
    }

    let user = users
        .create(NewUser {
            name: name.trim().to_owned(),
            email,
            password_hash,
            is_admin: true,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::UserExists(email_text),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );

    Ok(user.id.as_i32())
}

/// Grant admin to an existing user.
///
/// # Errors
///
/// Returns `AdminError` if the user does not exist or the update fails.
pub async fn promote_user(email: &str) -> Result<(), AdminError> {
    let email = Email::parse(email).map_err(|e| AdminError::InvalidEmail(e.to_string()))?;

    let url = database_url().ok_or(AdminError::MissingEnvVar(DATABASE_URL_VAR))?;
    let pool = db::create_pool(&url).await?;
    let users = UserRepository::new(&pool);

    let user = users
        .get_by_email(&email)
        .await?
        .ok_or_else(|| AdminError::UserNotFound(email.to_string()))?;

    if user.is_admin {
        tracing::info!("{} is already an admin", user.email);
        return Ok(());
    }

    users.set_admin(user.id, true).await?;
    tracing::info!("Granted admin to {} (ID: {})", user.email, user.id);
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &SecretString) -> Result<String, AdminError> {
    let password = password.expose_secret();
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AdminError::WeakPassword);
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AdminError::PasswordHash)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use argon2::password_hash::{PasswordHash, PasswordVerifier};

    use super::*;

    #[test]
    fn test_hash_password_round_trips_through_verify() {
        let secret = SecretString::from("correct horse battery");
        let hash = hash_password(&secret).unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"correct horse battery", &parsed)
                .is_ok()
        );
        assert!(
            Argon2::default()
                .verify_password(b"wrong horse battery", &parsed)
                .is_err()
        );
    }

    #[test]
    fn test_hash_password_rejects_short_passwords() {
        let err = hash_password(&SecretString::from("short")).unwrap_err();
        assert!(matches!(err, AdminError::WeakPassword));
    }
}
