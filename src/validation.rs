use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use time::{macros::format_description, Date, OffsetDateTime};

use crate::error::ApiError;

/// Collects field-level messages so a request reports every problem at once.
#[derive(Debug, Default)]
pub struct Violations(Vec<String>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, message: impl Into<String>) {
        if !ok {
            self.0.push(message.into());
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn length(&mut self, value: &str, min: usize, max: usize, too_short: &str, too_long: &str) {
        let len = value.chars().count();
        if len < min {
            self.push(too_short);
        } else if len > max {
            self.push(too_long);
        }
    }

    /// Yields `value` only when nothing was recorded. Callers pass `None` only
    /// alongside a recorded violation for the missing piece.
    pub fn finish<T>(self, value: Option<T>) -> Result<T, ApiError> {
        match value {
            Some(v) if self.0.is_empty() => Ok(v),
            _ => Err(ApiError::validation("Validation failed", self.0)),
        }
    }
}

/// Fails with the list of absent field names when any required field is missing.
pub fn require_fields(message: &str, fields: &[(&str, bool)]) -> Result<(), ApiError> {
    let missing: Vec<String> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| (*name).to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(message, missing))
    }
}

/// Blank strings count as missing, like an empty form field.
pub fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_deadline(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339) {
        return Some(ts);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|d| d.midnight().assume_utc())
}

/// A number as sent by form inputs: either a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
        }
        .filter(|n| n.is_finite())
    }

    /// Whole numbers only; `"7"` and `7.0` qualify, `"7.5"` does not.
    pub fn as_whole(&self) -> Option<i64> {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Some(*n as i64),
            Self::Number(_) => None,
            Self::Text(s) => s.trim().parse::<i64>().ok(),
        }
    }
}

impl From<f64> for Numeric {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Numeric {
    fn from(s: &str) -> Self {
        Self::Text(s.into())
    }
}

/// Trims each entry and drops the blank ones.
pub fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
