use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, projects, proposals};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(projects::router())
                .merge(proposals::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
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
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::test_support::in_days;

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    async fn sign_up(app: &Router, name: &str, role: &str) -> (String, String) {
        let (status, body) = call(
            app,
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "name": name,
                "email": format!("{}@uni.edu", name.to_lowercase()),
                "password": "secret1",
                "role": role,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["accessToken"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    fn project_body() -> Value {
        json!({
            "title": "Web app for the chess society",
            "description": "Schedule tournaments and track ratings for members.",
            "category": "Web Development",
            "skillsRequired": ["react"],
            "budget": 1200,
            "deadline": in_days(45),
        })
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".into()));
    }

    #[tokio::test]
    async fn writes_require_a_bearer_token() {
        let app = build_app(AppState::fake());
        let (status, body) =
            call(&app, Method::POST, "/api/projects", None, Some(project_body())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Missing Authorization header");

        let (status, _) =
            call(&app, Method::POST, "/api/projects", Some("garbage"), Some(project_body())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_ids_and_bodies_are_bad_requests() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, Method::GET, "/api/projects/not-a-uuid", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid project ID format");

        let (status, _) = call(&app, Method::GET, "/api/proposals/42", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "name": "Ada" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "All fields are required");
        assert!(body["details"].is_array());
    }

    #[tokio::test]
    async fn hiring_flow_over_http() {
        let app = build_app(AppState::fake());
        let (client, client_id) = sign_up(&app, "Cleo", "client").await;
        let (finn, finn_id) = sign_up(&app, "Finn", "freelancer").await;
        let (fran, _) = sign_up(&app, "Fran", "freelancer").await;

        let (status, body) =
            call(&app, Method::POST, "/api/projects", Some(client.as_str()), Some(project_body())).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["project"]["status"], "open");
        assert_eq!(body["project"]["client"]["id"], client_id.as_str());
        let project_id = body["project"]["id"].as_str().unwrap().to_string();

        let mut proposal_ids = Vec::new();
        for (token, rate) in [(&finn, 1100), (&fran, 1000)] {
            let (status, body) = call(
                &app,
                Method::POST,
                "/api/proposals",
                Some(token.as_str()),
                Some(json!({
                    "projectId": project_id,
                    "coverLetter": "I shipped two React apps last term.",
                    "proposedRate": rate,
                    "estimatedDuration": 14,
                })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            proposal_ids.push(body["proposal"]["id"].as_str().unwrap().to_string());
        }

        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("/api/proposals/{}", proposal_ids[0]),
            Some(client.as_str()),
            Some(json!({ "status": "accepted" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["proposal"]["status"], "accepted");

        let (_, body) = call(&app, Method::GET, &format!("/api/projects/{project_id}"), None, None).await;
        assert_eq!(body["project"]["status"], "in-progress");
        assert_eq!(body["project"]["assignedFreelancer"], finn_id.as_str());

        let (_, body) = call(
            &app,
            Method::GET,
            &format!("/api/proposals?clientId={client_id}"),
            None,
            None,
        )
        .await;
        assert_eq!(body["total"], 2);
        let statuses: Vec<&str> = body["proposals"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["status"].as_str().unwrap())
            .collect();
        assert!(statuses.contains(&"accepted") && statuses.contains(&"rejected"));

        let (status, _) = call(
            &app,
            Method::PUT,
            &format!("/api/proposals/{}", proposal_ids[1]),
            Some(client.as_str()),
            Some(json!({ "status": "accepted" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn me_returns_the_token_subject() {
        let app = build_app(AppState::fake());
        let (token, id) = sign_up(&app, "Ada", "freelancer").await;
        let (status, body) = call(&app, Method::GET, "/api/me", Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["id"], id.as_str());
    }

    #[tokio::test]
    async fn proposal_numbers_may_arrive_as_strings() {
        let app = build_app(AppState::fake());
        let (client, _) = sign_up(&app, "Cleo", "client").await;
        let (finn, _) = sign_up(&app, "Finn", "freelancer").await;

        let (status, body) =
            call(&app, Method::POST, "/api/projects", Some(client.as_str()), Some(project_body())).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let project_id = body["project"]["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/proposals",
            Some(finn.as_str()),
            Some(json!({
                "projectId": project_id,
                "coverLetter": "Happy to start on Monday.",
                "proposedRate": "950",
                "estimatedDuration": "7",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["proposal"]["deliveryDays"], 7);
        assert_eq!(body["proposal"]["proposedBudget"], 950.0);
    }

    #[tokio::test]
    async fn unknown_or_blank_project_filters_are_lenient() {
        let app = build_app(AppState::fake());
        let (client, _) = sign_up(&app, "Cleo", "client").await;
        let (status, _) =
            call(&app, Method::POST, "/api/projects", Some(client.as_str()), Some(project_body())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(&app, Method::GET, "/api/projects?status=cancelled", None, None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["total"], 0);
        assert_eq!(body["filters"]["status"], "cancelled");

        let (status, body) = call(&app, Method::GET, "/api/projects?status=&category=", None, None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["total"], 1);

        let (_, body) = call(
            &app,
            Method::GET,
            "/api/projects?status=open&category=Web%20Development",
            None,
            None,
        )
        .await;
        assert_eq!(body["total"], 1);
    }
}
