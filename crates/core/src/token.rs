use std::fmt;

use nanoid::nanoid;
use serde::Serialize;

pub const MAX_TOKEN_LEN: usize = 64;

const HEX: [char; 16] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f',
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidToken {
    #[error("token is empty")]
    Empty,
    #[error("token is longer than {MAX_TOKEN_LEN} characters")]
    TooLong,
    #[error("token contains invalid character {0:?}")]
    BadChar(char),
}

/// Validated channel token. Tokens end up in photo filenames and URL paths,
/// so only `[A-Za-z0-9_-]` is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChannelToken(String);

impl ChannelToken {
    pub fn parse(raw: &str) -> Result<Self, InvalidToken> {
        validate_name(raw)?;
        Ok(Self(raw.to_string()))
    }

    pub fn generate() -> Self {
        Self(nanoid!(8, &HEX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChannelToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Shared by channel tokens and mailbox names.
pub fn validate_name(raw: &str) -> Result<(), InvalidToken> {
    if raw.is_empty() {
        return Err(InvalidToken::Empty);
    }
    if raw.len() > MAX_TOKEN_LEN {
        return Err(InvalidToken::TooLong);
    }
    match raw
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        Some(bad) => Err(InvalidToken::BadChar(bad)),
        None => Ok(()),
    }
}

pub fn hit_id() -> String {
    nanoid!(8, &HEX)
}

pub fn session_id() -> String {
    format!("sess_{}", nanoid!(16))
}

pub fn photo_suffix() -> String {
    nanoid!(8, &HEX)
}
