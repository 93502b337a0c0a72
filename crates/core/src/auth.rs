use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

/// Parse an `Authorization: Basic <base64(user:pass)>` header value.
pub fn parse_basic(value: &str) -> Option<BasicCredentials> {
    let mut parts = value.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let encoded = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("basic") || encoded.is_empty() {
        return None;
    }
    let decoded = STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

pub fn hash_secret(raw: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hasher.finalize().into()
}

/// Constant-time check. Both sides are hashed first so the comparison does
/// not leak the expected length.
pub fn verify_credentials(given: &BasicCredentials, username: &str, password: &str) -> bool {
    let (given_user, expected_user) = (hash_secret(&given.username), hash_secret(username));
    let (given_pass, expected_pass) = (hash_secret(&given.password), hash_secret(password));
    let user_ok = given_user[..].ct_eq(&expected_user[..]);
    let pass_ok = given_pass[..].ct_eq(&expected_pass[..]);
    (user_ok & pass_ok).into()
}
