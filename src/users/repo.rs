use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, Result, StoreError};
use crate::users::identifier::{parse_id, Identifier};
use crate::users::repo_types::{NewUser, User, UserPatch};
use crate::users::store::{ListQuery, SortField, SortOrder, UserPage, UserStore};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Listing parameters as received from the caller, before clamping.
#[derive(Debug, Clone, Default)]
pub struct ListParams<'a> {
    pub page: i64,
    pub page_size: i64,
    pub sort_field: Option<&'a str>,
    pub sort_order: Option<&'a str>,
    pub search: Option<&'a str>,
}

/// Owns every persistence operation on the user collection.
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn UserStore>,
    timeout: Duration,
}

impl UserRepository {
    pub fn new(store: Arc<dyn UserStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Run one store call under the request deadline.
    async fn call<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.map_err(AppError::from),
            Err(_) => Err(AppError::Cancelled),
        }
    }

    /// Look a user up by email or id, whichever the identifier is shaped like.
    pub async fn get(&self, identifier: &str) -> Result<User> {
        let filter = Identifier::classify(identifier)?;
        self.find(&filter).await
    }

    pub async fn find(&self, filter: &Identifier) -> Result<User> {
        self.call(self.store.find_one(filter))
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn create(&self, user: NewUser) -> Result<User> {
        let user = self.call(self.store.insert(user)).await?;
        debug!(user_id = %user.id, "user inserted");
        Ok(user)
    }

    pub async fn update(
        &self,
        id: &str,
        firstname: Option<String>,
        lastname: Option<String>,
    ) -> Result<()> {
        let id = parse_id(id)?;
        let patch = UserPatch {
            firstname,
            lastname,
            updated_at: OffsetDateTime::now_utc(),
        };
        if self.call(self.store.update(id, &patch)).await? {
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let id: Uuid = parse_id(id)?;
        if self.call(self.store.delete(id)).await? {
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }

    pub async fn list(&self, params: ListParams<'_>) -> Result<UserPage> {
        let query = build_list_query(&params)?;
        self.call(self.store.aggregate(&query)).await
    }
}

/// Clamp a requested page and page size into a usable pair.
pub fn clamp_page(page: i64, page_size: i64) -> (i64, i64) {
    let page = page.max(1);
    let page_size = if page_size < 1 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size.min(MAX_PAGE_SIZE)
    };
    (page, page_size)
}

pub fn build_list_query(params: &ListParams<'_>) -> Result<ListQuery> {
    let (page, page_size) = clamp_page(params.page, params.page_size);
    let search = params
        .search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    Ok(ListQuery {
        search,
        sort_field: SortField::parse(params.sort_field)?,
        sort_order: SortOrder::parse(params.sort_order)?,
        skip: (page - 1).saturating_mul(page_size),
        limit: page_size,
    })
}
