//! # Channel Tokens
//!
//! A token names exactly one channel for one client/helper pair. It is the
//! only secret the two sides share, so it is drawn from 128 random bits and
//! never reused.

use std::fmt;
use std::str::FromStr;

const PREFIX: &str = "archbridge-";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelToken(String);

impl ChannelToken {
    /// A fresh, unguessable token.
    pub fn generate() -> Self {
        Self(format!("{}{:032x}", PREFIX, rand::random::<u128>()))
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

/// A string that cannot name a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidToken(pub String);

impl fmt::Display for InvalidToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid channel token {:?}", self.0)
    }
}

impl std::error::Error for InvalidToken {}

impl FromStr for ChannelToken {
    type Err = InvalidToken;

    /// Accepts only `[A-Za-z0-9_-]+`, so a token is always a safe file name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if valid {
            Ok(Self(s.to_owned()))
        } else {
            Err(InvalidToken(s.to_owned()))
        }
    }
}
