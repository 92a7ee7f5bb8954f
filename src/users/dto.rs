use std::borrow::Cow;

use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use crate::auth::password::fits_bcrypt;
use crate::users::identifier::email_address;
use crate::users::repo_types::User;

fn password_bytes(value: &str) -> Result<(), ValidationError> {
    if fits_bcrypt(value) {
        Ok(())
    } else {
        Err(ValidationError::new("length").with_message(Cow::Borrowed("must be at most 72 bytes")))
    }
}

/// An empty string in an update body means "leave unchanged".
fn empty_as_none<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(de)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Request body for user creation.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[serde(default)]
    #[validate(length(min = 3, max = 32, message = "must be between 3 and 32 characters"))]
    pub firstname: String,
    #[serde(default)]
    #[validate(length(min = 3, max = 32, message = "must be between 3 and 32 characters"))]
    pub lastname: String,
    #[serde(default)]
    #[validate(custom(function = "email_address"))]
    pub email: String,
    #[serde(default)]
    #[validate(
        length(min = 6, max = 64, message = "must be between 6 and 64 characters"),
        custom(function = "password_bytes")
    )]
    pub password: String,
}

/// Request body for a partial update. Empty strings count as absent.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserInput {
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(length(min = 3, max = 32, message = "must be between 3 and 32 characters"))]
    pub firstname: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(length(min = 3, max = 32, message = "must be between 3 and 32 characters"))]
    pub lastname: Option<String>,
}

impl UpdateUserInput {
    pub fn firstname(&self) -> Option<&str> {
        self.firstname.as_deref()
    }

    pub fn lastname(&self) -> Option<&str> {
        self.lastname.as_deref()
    }
}

/// Query string of `GET /users`.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub sort_field: Option<String>,
    pub sort_order: Option<String>,
    pub search_query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Paginator {
    pub current_page: i64,
    pub has_next: bool,
    pub total: i64,
    pub page_size: i64,
}

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub results: Vec<User>,
    pub paginator: Paginator,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
