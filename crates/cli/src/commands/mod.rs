//! CLI subcommands.

pub mod admin;
pub mod migrate;

use secrecy::SecretString;

/// Environment variable holding the `PostgreSQL` connection string.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Read `DATABASE_URL` after loading `.env`.
fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();
    std::env::var(DATABASE_URL_VAR).ok().map(SecretString::from)
}
