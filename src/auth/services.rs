use axum::extract::FromRef;
use tower_sessions::Session;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{jwt::JwtKeys, password::PasswordCodec, session::USER_ID_KEY},
    error::{AppError, Result},
    state::AppState,
    users::{identifier::Identifier, repo::UserRepository},
};

/// What a successful login hands back.
#[derive(Debug)]
pub struct LoginOutcome {
    pub user_id: Uuid,
    pub token: String,
    pub session_id: String,
}

/// Turns verified credentials into a bearer token plus a server-side session.
#[derive(Clone)]
pub struct SessionIssuer {
    users: UserRepository,
    codec: PasswordCodec,
    keys: JwtKeys,
}

impl FromRef<AppState> for SessionIssuer {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone(), state.codec, state.jwt.clone())
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials")
}

impl SessionIssuer {
    pub fn new(users: UserRepository, codec: PasswordCodec, keys: JwtKeys) -> Self {
        Self { users, codec, keys }
    }

    pub fn issue_token(&self, user_id: Uuid) -> Result<String> {
        self.keys.sign(user_id)
    }

    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str, session: &Session) -> Result<LoginOutcome> {
        let user = match self.users.find(&Identifier::Email(email.to_string())).await {
            Ok(u) => u,
            Err(AppError::NotFound) => {
                warn!("login unknown email");
                return Err(invalid_credentials());
            }
            Err(e) => return Err(e),
        };

        if !self
            .codec
            .verify_blocking(password.to_string(), user.password_hash.clone())
            .await?
        {
            warn!(user_id = %user.id, "login invalid password");
            return Err(invalid_credentials());
        }

        let token = self.issue_token(user.id)?;

        // a pre-login session id is never reused
        session.cycle_id().await?;
        session.insert(USER_ID_KEY, user.id).await?;
        session.save().await?;
        let session_id = session
            .id()
            .map(|id| id.to_string())
            .ok_or_else(|| AppError::Internal("session saved without an id"))?;

        info!(user_id = %user.id, "user logged in");
        Ok(LoginOutcome {
            user_id: user.id,
            token,
            session_id,
        })
    }

    pub async fn logout(&self, session: &Session) -> Result<()> {
        let user_id: Option<Uuid> = session.get(USER_ID_KEY).await.ok().flatten();
        session.flush().await?;
        info!(user_id = ?user_id, "user logged out");
        Ok(())
    }
}
