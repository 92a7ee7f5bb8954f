use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreError;
use crate::users::identifier::Identifier;
use crate::users::repo_types::{NewUser, User, UserPatch};
use crate::users::store::{ListQuery, UserPage, UserStore};

const USER_COLUMNS: &str = "id, firstname, lastname, email, password_hash, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// One row of the listing query: the filtered total plus an optional page entry.
#[derive(Debug, FromRow)]
struct PageRow {
    total: i64,
    id: Option<Uuid>,
    firstname: Option<String>,
    lastname: Option<String>,
    email: Option<String>,
    password_hash: Option<String>,
    created_at: Option<OffsetDateTime>,
    updated_at: Option<OffsetDateTime>,
}

impl PageRow {
    fn into_user(self) -> Option<User> {
        Some(User {
            id: self.id?,
            firstname: self.firstname?,
            lastname: self.lastname?,
            email: self.email?,
            password_hash: self.password_hash?,
            created_at: self.created_at?,
            updated_at: self.updated_at?,
        })
    }
}

/// Escape LIKE metacharacters and wrap for substring matching.
pub(crate) fn like_pattern(search: &str) -> String {
    let mut out = String::with_capacity(search.len() + 2);
    out.push('%');
    for c in search.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// Filter, count and page in a single statement so both halves see one snapshot.
///
/// Sort column and direction come from closed enums; nothing user-supplied is
/// interpolated.
pub(crate) fn list_sql(query: &ListQuery) -> String {
    let col = query.sort_field.column();
    let dir = query.sort_order.sql();
    format!(
        r#"
        WITH filtered AS (
            SELECT {USER_COLUMNS}
            FROM users
            WHERE $1::text IS NULL
               OR firstname ILIKE $1
               OR lastname ILIKE $1
               OR email ILIKE $1
        ),
        counted AS (
            SELECT COUNT(*) AS total FROM filtered
        ),
        page AS (
            SELECT * FROM filtered
            ORDER BY {col} {dir}, id {dir}
            LIMIT $2 OFFSET $3
        )
        SELECT counted.total, page.id, page.firstname, page.lastname, page.email,
               page.password_hash, page.created_at, page.updated_at
        FROM counted
        LEFT JOIN page ON TRUE
        ORDER BY page.{col} {dir}, page.id {dir}
        "#
    )
}

fn map_insert_err(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate(db.message().to_string())
        }
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_one(&self, filter: &Identifier) -> Result<Option<User>, StoreError> {
        let user = match filter {
            Identifier::Id(id) => {
                let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
                sqlx::query_as::<_, User>(&sql)
                    .bind(id)
                    .fetch_optional(&self.db)
                    .await?
            }
            Identifier::Email(email) => {
                let sql = format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE email = $1 ORDER BY created_at LIMIT 1"
                );
                sqlx::query_as::<_, User>(&sql)
                    .bind(email)
                    .fetch_optional(&self.db)
                    .await?
            }
        };
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (firstname, lastname, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.firstname)
            .bind(&user.lastname)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.db)
            .await
            .map_err(map_insert_err)
    }

    async fn update(&self, id: Uuid, patch: &UserPatch) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET firstname  = COALESCE($2, firstname),
                lastname   = COALESCE($3, lastname),
                updated_at = GREATEST($4, updated_at + INTERVAL '1 microsecond')
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.firstname.as_deref())
        .bind(patch.lastname.as_deref())
        .bind(patch.updated_at)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn aggregate(&self, query: &ListQuery) -> Result<UserPage, StoreError> {
        let sql = list_sql(query);
        let rows = sqlx::query_as::<_, PageRow>(&sql)
            .bind(query.search.as_deref().map(like_pattern))
            .bind(query.limit)
            .bind(query.skip)
            .fetch_all(&self.db)
            .await?;

        let total = rows.first().map(|r| r.total).unwrap_or(0);
        let items = rows.into_iter().filter_map(PageRow::into_user).collect();
        Ok(UserPage { items, total })
    }
}
