use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::fmt;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w.+-]+@[\w-]+\.[\w.-]+$").expect("email regex is valid")
});

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.-]{2,20}$").expect("username regex is valid"));

/// Width of the `users.email` column.
pub const MAX_EMAIL_LEN: usize = 120;

pub fn looks_like_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email(String);

impl TryFrom<&str> for Email {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = value.trim();
        if !looks_like_email(value) {
            anyhow::bail!("invalid email");
        }
        if value.len() > MAX_EMAIL_LEN {
            anyhow::bail!("email must be at most {} characters", MAX_EMAIL_LEN);
        }
        Ok(Self(value.to_lowercase()))
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let email = String::deserialize(deserializer)?;
        Self::try_from(email.as_str()).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl TryFrom<&str> for Username {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = value.trim();
        if !USERNAME_RE.is_match(value) {
            anyhow::bail!("username must be 2-20 letters, digits, '.', '-' or '_'");
        }
        Ok(Self(value.to_owned()))
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

#[derive(Debug, Clone)]
pub struct Password(SecretString);

pub const MIN_PASSWORD_LEN: usize = 8;

impl TryFrom<&str> for Password {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.chars().count() < MIN_PASSWORD_LEN {
            anyhow::bail!("password too short");
        }

        Ok(Self(SecretString::from(value)))
    }
}

impl<'de> Deserialize<'de> for Password {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let password = String::deserialize(deserializer)?;

        Self::try_from(password.as_str()).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

impl Password {
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}
