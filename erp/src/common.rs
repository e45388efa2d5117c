use std::sync::LazyLock;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{self, SaltString, rand_core::OsRng},
};
use regex::Regex;

use crate::server::ServerError;

pub const MIN_LEN_PASSWORD: usize = 6;
pub const SESSION_KEY: &str = "ssid";

pub const LOGIN_PATH: &str = "/login";
pub const ADMIN_HOME: &str = "/dashboard";
pub const PORTAL_HOME: &str = "/portal";

static EMAIL_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$"));

/// PHC string (`$argon2id$...`) stored in `credentials.password`.
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

/// A stored hash that does not parse is an error, a wrong password is `false`.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, password_hash::Error> {
    let stored = PasswordHash::new(stored)?;
    match Argon2::default().verify_password(password.as_bytes(), &stored) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_LEN_PASSWORD
}

pub fn is_valid_email(email: &str) -> Result<bool, ServerError> {
    EMAIL_PATTERN
        .as_ref()
        .map(|pattern| pattern.is_match(email))
        .map_err(|e| ServerError::InternalServerError(e.to_string()))
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Local, same-origin path. Rejects scheme-relative (`//host`) and
/// backslash tricks browsers normalise into another origin.
pub fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(char::is_control)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sales_team_addresses_are_accepted() {
        for email in [
            "representante@farmacia.com.br",
            "ana.souza+sul@pharma.com",
            "admin@erp-pharma.com.br",
            "r2@pharma.io",
        ] {
            assert!(is_valid_email(email).unwrap(), "{email} should be accepted");
        }
    }

    #[test]
    fn malformed_addresses_are_rejected() {
        for email in [
            "representante@farmacia",
            "representante.farmacia.com.br",
            "ana souza@pharma.com",
            "@pharma.com",
            "rep@pharma.c",
            "",
        ] {
            assert!(!is_valid_email(email).unwrap(), "{email} should be rejected");
        }
    }

    #[test]
    fn password_length() {
        assert!(is_valid_password("anaksfdb3434bbc"));
        assert!(!is_valid_password("anak3"));
    }

    #[test]
    fn hashed_passwords_verify() {
        let hash = hash_password("segredo123").unwrap();
        assert!(verify_password("segredo123", &hash).unwrap());
        assert!(!verify_password("segredo124", &hash).unwrap());
    }

    #[test]
    fn unparseable_hashes_are_errors() {
        assert!(verify_password("segredo123", "segredo123").is_err());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Rep@Pharma.COM "), "rep@pharma.com");
    }

    #[test]
    fn only_same_origin_paths_are_local() {
        assert!(is_local_path("/portal/vendas?from=2024-01-01"));
        assert!(!is_local_path("//evil.example/portal"));
        assert!(!is_local_path("/\\evil.example"));
        assert!(!is_local_path("https://evil.example"));
        assert!(!is_local_path("portal"));
    }
}
