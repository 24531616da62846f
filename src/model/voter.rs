use std::fmt::{Display, Formatter};
use std::ops::Deref;

use argon2::Config;
use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::vote_status::Votes;

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// A voter's identity: a trimmed, lower-cased email address.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Email(String);

impl Email {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = Error;

    /// Normalise and check an email address. Only the `local@domain.tld`
    /// shape is checked; deliverability is not our concern.
    fn try_from(raw: String) -> Result<Self> {
        let email = raw.trim().to_lowercase();
        let invalid = || Error::BadRequest(format!("Invalid email address '{}'", raw.trim()));
        let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
        let (host, tld) = domain.rsplit_once('.').ok_or_else(invalid)?;
        if local.is_empty()
            || host.is_empty()
            || tld.len() < 2
            || domain.contains('@')
            || email.chars().any(char::is_whitespace)
        {
            return Err(invalid());
        }
        Ok(Self(email))
    }
}

impl TryFrom<&str> for Email {
    type Error = Error;

    fn try_from(raw: &str) -> Result<Self> {
        Self::try_from(raw.to_string())
    }
}

impl Deref for Email {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A voter record, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voter {
    pub email: Email,
    pub password_hash: String,
    pub is_active: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub registered_at: DateTime<Utc>,
    #[serde(default)]
    pub votes: Votes,
}

impl Voter {
    /// Create an active voter with every role unvoted.
    pub fn new(email: Email, password_hash: String) -> Self {
        Self {
            email,
            password_hash,
            is_active: true,
            registered_at: super::bson::now(),
            votes: Votes::default(),
        }
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> Result<bool> {
        Ok(argon2::verify_encoded(&self.password_hash, password.as_ref())?)
    }
}

/// Raw voter credentials, received from a user. These are never stored
/// directly, since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl TryFrom<Credentials> for Voter {
    type Error = Error;

    /// Convert [`Credentials`] to a new [`Voter`] by hashing the password.
    /// This enforces a valid email and the minimum password length.
    fn try_from(cred: Credentials) -> Result<Self> {
        let email = Email::try_from(cred.email)?;
        if cred.password.len() < MIN_PASSWORD_LENGTH {
            return Err(Error::BadRequest(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
            )));
        }

        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(cred.password.as_bytes(), &salt, &Config::default())?;
        Ok(Self::new(email, password_hash))
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Credentials {
        pub fn example() -> Self {
            Self {
                email: "Voter@Example.com".into(),
                password: "ballot-box-1".into(),
            }
        }
    }

    impl Voter {
        /// An active voter with an unusable password hash, for tests that
        /// never log in.
        pub fn example(email: &str) -> Self {
            Self::new(Email::try_from(email).unwrap(), String::new())
        }
    }
}
