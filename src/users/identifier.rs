use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;
use validator::ValidationError;

use crate::error::AppError;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
}

pub(crate) fn is_valid_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

/// Field validator sharing the predicate used for identifier classification.
pub(crate) fn email_address(value: &str) -> Result<(), ValidationError> {
    if is_valid_email(value) {
        Ok(())
    } else {
        Err(ValidationError::new("email").with_message("must be a valid email address".into()))
    }
}

/// A lookup key, classified once before any query runs.
///
/// Email-shaped strings are never tried as ids and vice versa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Email(String),
    Id(Uuid),
}

impl Identifier {
    pub fn classify(raw: &str) -> Result<Self, AppError> {
        if is_valid_email(raw) {
            return Ok(Self::Email(raw.to_string()));
        }
        parse_id(raw).map(Self::Id)
    }
}

/// Parse an opaque record id.
pub fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidIdentifier(raw.to_string()))
}
