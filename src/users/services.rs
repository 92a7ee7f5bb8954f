use tracing::info;

use crate::{
    auth::password::PasswordCodec,
    error::Result,
    users::{
        dto::{CreateUserInput, ListUsersQuery, ListUsersResponse, Paginator},
        repo::{clamp_page, ListParams, UserRepository, DEFAULT_PAGE_SIZE},
        repo_types::{NewUser, User},
    },
};

/// Hash the raw password off the async workers, then insert.
///
/// The raw password is dropped here and never reaches the store.
pub async fn register_user(
    users: &UserRepository,
    codec: PasswordCodec,
    input: CreateUserInput,
) -> Result<User> {
    let CreateUserInput {
        firstname,
        lastname,
        email,
        password,
    } = input;

    let password_hash = codec.hash_blocking(password).await?;
    let user = users
        .create(NewUser::new(firstname, lastname, email, password_hash))
        .await?;

    info!(user_id = %user.id, "user created");
    Ok(user)
}

pub async fn list_users(users: &UserRepository, q: &ListUsersQuery) -> Result<ListUsersResponse> {
    let (page, page_size) = clamp_page(
        q.page.unwrap_or(1),
        q.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    );

    let result = users
        .list(ListParams {
            page,
            page_size,
            sort_field: q.sort_field.as_deref(),
            sort_order: q.sort_order.as_deref(),
            search: q.search_query.as_deref(),
        })
        .await?;

    Ok(ListUsersResponse {
        paginator: Paginator {
            current_page: page,
            has_next: page.saturating_mul(page_size) < result.total,
            total: result.total,
            page_size,
        },
        results: result.items,
    })
}
