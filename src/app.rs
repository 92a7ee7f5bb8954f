use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::MemoryStore;

use crate::auth::session::create_session_layer;
use crate::state::AppState;
use crate::{auth, users};

pub fn build_app(state: AppState, sessions: MemoryStore) -> Router {
    let session_layer = create_session_layer(sessions, &state.config.session);

    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(users::router())
                .merge(auth::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(session_layer)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "5000".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use tower_sessions::{session::Id, SessionStore};

    use super::*;

    fn app() -> Router {
        build_app(AppState::fake(), MemoryStore::default())
    }

    fn request(method: Method, uri: &str, body: Option<Value>, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        match body {
            Some(b) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn json_body(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_jane(app: &Router) -> Value {
        let res = send(
            app,
            request(
                Method::POST,
                "/api/v1/users",
                Some(json!({
                    "firstname": "Jane",
                    "lastname": "Doe",
                    "email": "jane@x.com",
                    "password": "secret1"
                })),
                None,
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        json_body(res).await
    }

    async fn login(app: &Router, email: &str, password: &str) -> Response {
        send(
            app,
            request(
                Method::POST,
                "/api/v1/login",
                Some(json!({ "email": email, "password": password })),
                None,
            ),
        )
        .await
    }

    async fn token_for_jane(app: &Router) -> String {
        let res = login(app, "jane@x.com", "secret1").await;
        assert_eq!(res.status(), StatusCode::OK);
        json_body(res).await["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let res = send(&app(), request(Method::GET, "/api/v1/health", None, None)).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_returns_user_without_password_hash() {
        let app = app();
        let user = create_jane(&app).await;
        assert_eq!(user["firstname"], "Jane");
        assert_eq!(user["email"], "jane@x.com");
        assert!(user["id"].is_string());
        assert!(user.get("password_hash").is_none());
        assert!(user.get("password").is_none());
    }

    #[tokio::test]
    async fn create_rejects_invalid_input() {
        let app = app();
        let res = send(
            &app,
            request(
                Method::POST,
                "/api/v1/users",
                Some(json!({
                    "firstname": "Jo",
                    "lastname": "Doe",
                    "email": "not-an-email",
                    "password": "123"
                })),
                None,
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = json_body(res).await;
        assert_eq!(body["fields"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = send(&app(), req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_sets_session_cookie_and_returns_token() {
        let app = app();
        create_jane(&app).await;

        let res = login(&app, "jane@x.com", "secret1").await;
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("sid="));
        assert!(json_body(res).await["token"].is_string());
    }

    #[tokio::test]
    async fn login_failures_are_generic_401() {
        let app = app();
        create_jane(&app).await;

        let wrong = login(&app, "jane@x.com", "wrong").await;
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        let unknown = login(&app, "ghost@x.com", "secret1").await;
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(wrong).await, json_body(unknown).await);
    }

    #[tokio::test]
    async fn protected_routes_require_a_valid_token() {
        let app = app();
        let res = send(&app, request(Method::GET, "/api/v1/users", None, None)).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(res).await["error"], "Unauthorized");

        let res = send(
            &app,
            request(Method::GET, "/api/v1/users", None, Some("garbage")),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn get_user_by_id_and_by_email() {
        let app = app();
        let jane = create_jane(&app).await;
        let token = token_for_jane(&app).await;
        let id = jane["id"].as_str().unwrap();

        let res = send(
            &app,
            request(Method::GET, &format!("/api/v1/users/{id}"), None, Some(&token)),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["lastname"], "Doe");

        let res = send(
            &app,
            request(Method::GET, "/api/v1/users/jane@x.com", None, Some(&token)),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["id"], id);

        let res = send(
            &app,
            request(Method::GET, "/api/v1/users/a@b.com", None, Some(&token)),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = send(
            &app,
            request(Method::GET, "/api/v1/users/not-an-id", None, Some(&token)),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_users_with_search_and_paginator() {
        let app = app();
        create_jane(&app).await;
        for (first, last, email) in [
            ("Will", "Smith", "will@x.com"),
            ("Anna", "Lee", "blacksmith@x.com"),
            ("Bob", "Jones", "bob@x.com"),
        ] {
            send(
                &app,
                request(
                    Method::POST,
                    "/api/v1/users",
                    Some(json!({
                        "firstname": first,
                        "lastname": last,
                        "email": email,
                        "password": "secret1"
                    })),
                    None,
                ),
            )
            .await;
        }
        let token = token_for_jane(&app).await;

        let res = send(
            &app,
            request(
                Method::GET,
                "/api/v1/users?search_query=SMITH&page=1&page_size=1&sort_field=email&sort_order=asc",
                None,
                Some(&token),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["paginator"]["total"], 2);
        assert_eq!(body["paginator"]["has_next"], true);
        assert_eq!(body["paginator"]["current_page"], 1);
        assert_eq!(body["paginator"]["page_size"], 1);
        assert_eq!(body["results"][0]["email"], "blacksmith@x.com");

        let res = send(
            &app,
            request(
                Method::GET,
                "/api/v1/users?sort_field=password_hash",
                None,
                Some(&token),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_then_delete() {
        let app = app();
        let jane = create_jane(&app).await;
        let token = token_for_jane(&app).await;
        let id = jane["id"].as_str().unwrap();
        let uri = format!("/api/v1/users/{id}");

        let res = send(
            &app,
            request(Method::PUT, &uri, Some(json!({ "firstname": "Janet" })), None),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["message"], "User has been updated");

        let res = send(&app, request(Method::GET, &uri, None, Some(&token))).await;
        let after = json_body(res).await;
        assert_eq!(after["firstname"], "Janet");
        assert_eq!(after["lastname"], "Doe");
        assert_eq!(after["email"], "jane@x.com");
        assert_ne!(after["updated_at"], jane["updated_at"]);

        let res = send(&app, request(Method::DELETE, &uri, None, None)).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = send(&app, request(Method::DELETE, &uri, None, None)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = send(
            &app,
            request(Method::PUT, &uri, Some(json!({ "lastname": "Roe" })), None),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn logout_destroys_the_session() {
        let sessions = MemoryStore::default();
        let app = build_app(AppState::fake(), sessions.clone());
        create_jane(&app).await;
        let res = login(&app, "jane@x.com", "secret1").await;
        let cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .unwrap()
            .to_string();
        let id: Id = cookie.trim_start_matches("sid=").parse().unwrap();
        assert!(sessions.load(&id).await.unwrap().is_some());

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/logout")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let res = send(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(sessions.load(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_list_query_is_a_json_400() {
        let app = app();
        create_jane(&app).await;
        let token = token_for_jane(&app).await;

        let res = send(
            &app,
            request(Method::GET, "/api/v1/users?page=abc", None, Some(&token)),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await["fields"][0]["field"], "query");
    }

    #[tokio::test]
    async fn create_rejects_password_longer_than_bcrypt_reads() {
        let res = send(
            &app(),
            request(
                Method::POST,
                "/api/v1/users",
                Some(json!({
                    "firstname": "Jane",
                    "lastname": "Doe",
                    "email": "jane@x.com",
                    "password": format!("{}{}", "é".repeat(36), "a".repeat(28))
                })),
                None,
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await["fields"][0]["field"], "password");
    }
}
