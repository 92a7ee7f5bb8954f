use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AppError, StoreError};
use crate::users::identifier::Identifier;
use crate::users::repo_types::{NewUser, User, UserPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Firstname,
    Lastname,
    Email,
}

impl SortField {
    /// Empty or absent means creation time.
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        match raw.map(str::trim).unwrap_or_default() {
            "" | "created_at" => Ok(Self::CreatedAt),
            "updated_at" => Ok(Self::UpdatedAt),
            "firstname" => Ok(Self::Firstname),
            "lastname" => Ok(Self::Lastname),
            "email" => Ok(Self::Email),
            _ => Err(invalid_query("sort_field", "unknown sort field")),
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Firstname => "firstname",
            Self::Lastname => "lastname",
            Self::Email => "email",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Absent means descending.
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("desc") => Ok(Self::Desc),
            Some("asc") => Ok(Self::Asc),
            Some(_) => Err(invalid_query("sort_order", "must be asc or desc")),
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

fn invalid_query(field: &'static str, message: &str) -> AppError {
    AppError::Validation(vec![crate::error::FieldError {
        field: field.into(),
        message: message.to_string(),
    }])
}

/// A fully resolved listing pipeline: filter, sort, skip and limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Case-insensitive substring matched against first name, last name or email.
    pub search: Option<String>,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Default)]
pub struct UserPage {
    pub items: Vec<User>,
    /// Size of the filtered set, independent of skip/limit.
    pub total: i64,
}

/// The document store holding the user collection.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_one(&self, filter: &Identifier) -> Result<Option<User>, StoreError>;

    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    /// Returns whether a record matched.
    async fn update(&self, id: Uuid, patch: &UserPatch) -> Result<bool, StoreError>;

    /// Returns whether a record matched.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Count and page of the filtered set, read in one atomic call.
    async fn aggregate(&self, query: &ListQuery) -> Result<UserPage, StoreError>;
}
