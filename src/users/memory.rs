use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::users::identifier::Identifier;
use crate::users::repo_types::{NewUser, User, UserPatch};
use crate::users::store::{ListQuery, SortField, SortOrder, UserPage, UserStore};

/// Process-local user collection.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_search(user: &User, needle: &str) -> bool {
    [&user.firstname, &user.lastname, &user.email]
        .iter()
        .any(|v| v.to_lowercase().contains(needle))
}

fn compare(a: &User, b: &User, field: SortField) -> Ordering {
    let primary = match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::Firstname => a.firstname.cmp(&b.firstname),
        SortField::Lastname => a.lastname.cmp(&b.lastname),
        SortField::Email => a.email.cmp(&b.email),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_one(&self, filter: &Identifier) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        let found = match filter {
            Identifier::Id(id) => users.get(id).cloned(),
            Identifier::Email(email) => users.values().find(|u| &u.email == email).cloned(),
        };
        Ok(found)
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let user = user.with_id(Uuid::new_v4());
        self.users.write().await.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, patch: &UserPatch) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(firstname) = &patch.firstname {
            user.firstname = firstname.clone();
        }
        if let Some(lastname) = &patch.lastname {
            user.lastname = lastname.clone();
        }
        user.updated_at = patch
            .updated_at
            .max(user.updated_at + Duration::microseconds(1));
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn aggregate(&self, query: &ListQuery) -> Result<UserPage, StoreError> {
        let users = self.users.read().await;
        let needle = query.search.as_ref().map(|s| s.to_lowercase());

        let mut filtered: Vec<&User> = users
            .values()
            .filter(|u| needle.as_deref().map_or(true, |n| matches_search(u, n)))
            .collect();

        filtered.sort_by(|a, b| {
            let ord = compare(a, b, query.sort_field);
            match query.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let total = filtered.len() as i64;
        let items = filtered
            .into_iter()
            .skip(query.skip.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .cloned()
            .collect();

        Ok(UserPage { items, total })
    }
}
