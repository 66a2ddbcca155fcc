use std::{net::SocketAddr, time::Duration};

use axum::{error_handling::HandleErrorLayer, response::Html, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, error, state::AppState, users};

/// One limiter guards the whole router; requests over budget are shed with 429
/// instead of queueing until the window resets.
pub fn build_app(state: AppState) -> Router {
    let limits = state.config.rate_limit.clone();

    let routes = Router::new()
        .route("/", get(|| async { Html("<h1>Home Page</h1>") }))
        .route("/health", get(|| async { "ok" }))
        .nest(
            "/users",
            users::router(state.clone()).merge(auth::router()),
        )
        .with_state(state);

    let limited = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(error::handle_middleware_errors))
        .buffer(1024)
        .load_shed()
        .rate_limit(
            limits.max_requests,
            Duration::from_secs(limits.window_seconds),
        )
        .service(routes);

    Router::new()
        .fallback_service(limited)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
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
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;

    async fn body_text(res: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn base_page_and_health() {
        let (state, _) = AppState::fake_with(false);

        let res = build_app(state.clone())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_text(res).await, "<h1>Home Page</h1>");

        let res = build_app(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_text(res).await, "ok");
    }

    #[tokio::test]
    async fn limit_is_shared_across_routes_and_rejects() {
        let (mut state, _) = AppState::fake_with(false);
        let mut config = (*state.config).clone();
        config.rate_limit.max_requests = 2;
        config.rate_limit.window_seconds = 300;
        state.config = std::sync::Arc::new(config);
        let app = build_app(state);

        for uri in ["/health", "/"] {
            let res = app
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }

        for uri in ["/health", "/", "/users/month/3"] {
            let res = tokio::time::timeout(
                Duration::from_secs(2),
                app.clone().oneshot(Request::get(uri).body(Body::empty()).unwrap()),
            )
            .await
            .expect("over-limit request must not queue")
            .unwrap();
            assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
            let body: serde_json::Value = serde_json::from_str(&body_text(res).await).unwrap();
            assert_eq!(body["message"], "Too many requests, please try again later.");
        }
    }

    #[tokio::test]
    async fn signup_then_login_over_http() {
        let (state, _) = AppState::fake_with(false);
        let app = build_app(state);

        let signup = Request::post("/users/signup")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"name":"Ada","email":"Ada@Example.com","password":"analytical"}"#,
            ))
            .unwrap();
        let res = app.clone().oneshot(signup).await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: serde_json::Value = serde_json::from_str(&body_text(res).await).unwrap();
        assert_eq!(created["data"]["email"], "ada@example.com");
        assert_eq!(created["data"]["role"], "User");
        assert!(created["data"].get("passwordHash").is_none());

        let login = Request::post("/users/login")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"email":"ada@example.com","password":"analytical"}"#))
            .unwrap();
        let res = app.oneshot(login).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(res).await).unwrap();
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[tokio::test]
    async fn malformed_signup_bodies_are_json_bad_requests() {
        let (state, _) = AppState::fake_with(false);
        let app = build_app(state);

        let bodies = [
            r#"{"name":"A","email":"a@b.io"}"#,
            r#"{"name":"A","email":"a@b.io","password":"long-enough","role":"Owner"}"#,
            r#"{"name":"A","#,
        ];
        for raw in bodies {
            let req = Request::post("/users/signup")
                .header("content-type", "application/json")
                .body(Body::from(raw))
                .unwrap();
            let res = app.clone().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body {raw}");
            assert_eq!(
                res.headers().get("content-type").unwrap(),
                "application/json"
            );
            let body: serde_json::Value = serde_json::from_str(&body_text(res).await).unwrap();
            assert!(body["message"].is_string());
        }
    }
}
