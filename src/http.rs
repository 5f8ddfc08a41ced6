//! HTTP API for progression and practice attempts
//!
//! The web application sits in front of this server and forwards the
//! authenticated user in the `x-user-id` header.
//!
//! ## Endpoints
//! - `GET /health` - Health check with row counts
//! - `GET /levels?xp={n}` - Level breakdown for an arbitrary XP value
//! - `GET /progress` - Caller's XP and level
//! - `POST /progress/xp` - Award XP (`{ "amount": 25 }`)
//! - `POST /practice/attempts` - Create an attempt (`{ "examSlug", "topicSlug"?, "limit"? }`)
//! - `GET /practice/attempts?limit={n}` - Caller's attempts, newest first
//! - `GET /practice/attempts/{id}` - One of the caller's attempts
//! - `POST /practice/mastery` - Mark a question mastered (`{ "questionId" }`)
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X POST -H "x-user-id: u-123" -H "Content-Type: application/json" \
//!      -d '{"examSlug": "usmle-step-1", "topicSlug": "cardio", "limit": 15}' \
//!      http://localhost:8095/practice/attempts
//!
//! curl -H "x-user-id: u-123" http://localhost:8095/progress
//! ```

use crate::error::{AttemptError, StorageError};
use crate::level::LevelProgress;
use crate::services::practice_service::CreateAttemptInput;
use crate::services::response::{self, attempt_error_response, bad_request, created, ok};
use crate::services::Services;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Header carrying the authenticated user id
pub const USER_HEADER: &str = "x-user-id";

/// Largest request body accepted
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct LevelQuery {
    xp: f64,
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct AwardXpInput {
    amount: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MasteryInput {
    question_id: String,
}

/// HTTP server state
pub struct HttpServer {
    services: Arc<Services>,
    bind_addr: SocketAddr,
}

impl HttpServer {
    pub fn new(services: Arc<Services>, bind_addr: SocketAddr) -> Self {
        Self {
            services,
            bind_addr,
        }
    }

    /// Run the HTTP server
    pub async fn run(self: Arc<Self>) -> Result<(), StorageError> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        info!(addr = %self.bind_addr, "HTTP server listening");

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle_request(req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    warn!(addr = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }

    async fn handle_request(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(str::to_string);
        let user_id = req
            .headers()
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        debug!(method = %method, path = %path, "Incoming request");

        let body = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(error = %e, "Failed to read request body");
                return Ok(bad_request("Request body unreadable or too large"));
            }
        };

        Ok(self
            .dispatch(&method, &path, query.as_deref(), user_id.as_deref(), body)
            .await)
    }

    /// Route a fully-read request
    pub async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        query: Option<&str>,
        user_id: Option<&str>,
        body: Bytes,
    ) -> Response<Full<Bytes>> {
        match (method.clone(), path) {
            (Method::GET, "/health") => self.handle_health(),
            (Method::GET, "/levels") => self.handle_levels(query),

            (Method::GET, "/progress") => match user_id {
                Some(user) => response::from_result(self.services.progress.profile(user)),
                None => response::unauthorized(),
            },
            (Method::POST, "/progress/xp") => match user_id {
                Some(user) => self.handle_award_xp(user, &body),
                None => response::unauthorized(),
            },

            (Method::POST, "/practice/attempts") => match user_id {
                Some(user) => self.handle_create_attempt(user, &body).await,
                None => response::unauthorized(),
            },
            (Method::GET, "/practice/attempts") => match user_id {
                Some(user) => self.handle_list_attempts(user, query).await,
                None => response::unauthorized(),
            },
            (Method::GET, p) if p.starts_with("/practice/attempts/") => {
                let attempt_id = p.strip_prefix("/practice/attempts/").unwrap_or("");
                match user_id {
                    Some(user) => self.handle_get_attempt(user, attempt_id).await,
                    None => response::unauthorized(),
                }
            }
            (Method::POST, "/practice/mastery") => match user_id {
                Some(user) => self.handle_mastery(user, &body),
                None => response::unauthorized(),
            },

            (_, "/health" | "/levels" | "/progress" | "/progress/xp" | "/practice/attempts"
                | "/practice/mastery") => response::method_not_allowed(),

            _ => response::not_found("Not Found"),
        }
    }

    /// Health check endpoint
    fn handle_health(&self) -> Response<Full<Bytes>> {
        match self.services.db.stats() {
            Ok(stats) => ok(&serde_json::json!({
                "status": "ok",
                "exams": stats.exam_count,
                "topics": stats.topic_count,
                "questions": stats.question_count,
                "attempts": stats.attempt_count,
                "event_subscribers": self.services.events.subscriber_count(),
            })),
            Err(e) => response::error_response(e),
        }
    }

    /// GET /levels?xp={n}
    fn handle_levels(&self, query: Option<&str>) -> Response<Full<Bytes>> {
        match serde_urlencoded::from_str::<LevelQuery>(query.unwrap_or("")) {
            Ok(q) => ok(&LevelProgress::from_xp(q.xp)),
            Err(e) => bad_request(&format!("xp query parameter required: {}", e)),
        }
    }

    /// POST /progress/xp
    fn handle_award_xp(&self, user_id: &str, body: &[u8]) -> Response<Full<Bytes>> {
        let input: AwardXpInput = match serde_json::from_slice(body) {
            Ok(input) => input,
            Err(e) => return response::error_response(StorageError::Json(e)),
        };
        response::from_result(self.services.progress.award_xp(user_id, input.amount))
    }

    /// POST /practice/attempts
    async fn handle_create_attempt(&self, user_id: &str, body: &[u8]) -> Response<Full<Bytes>> {
        let input: CreateAttemptInput = match serde_json::from_slice(body) {
            Ok(input) => input,
            Err(e) => {
                return attempt_error_response(AttemptError::InvalidInput(format!(
                    "malformed JSON body: {}",
                    e
                )))
            }
        };

        match self.services.practice.create_attempt(user_id, &input).await {
            Ok(attempt) => created(&attempt),
            Err(e) => attempt_error_response(e),
        }
    }

    /// GET /practice/attempts
    async fn handle_list_attempts(&self, user_id: &str, query: Option<&str>) -> Response<Full<Bytes>> {
        let q: ListQuery = match query {
            Some(query) => match serde_urlencoded::from_str(query) {
                Ok(q) => q,
                Err(e) => return bad_request(&format!("invalid query: {}", e)),
            },
            None => ListQuery::default(),
        };

        match self.services.practice.list_attempts(user_id, q.limit).await {
            Ok(attempts) => ok(&attempts),
            Err(e) => attempt_error_response(e),
        }
    }

    /// GET /practice/attempts/{id}
    async fn handle_get_attempt(&self, user_id: &str, attempt_id: &str) -> Response<Full<Bytes>> {
        match self.services.practice.get_attempt(user_id, attempt_id).await {
            Ok(Some(attempt)) => ok(&attempt),
            Ok(None) => response::not_found("Attempt not found"),
            Err(e) => attempt_error_response(e),
        }
    }

    /// POST /practice/mastery
    fn handle_mastery(&self, user_id: &str, body: &[u8]) -> Response<Full<Bytes>> {
        let input: MasteryInput = match serde_json::from_slice(body) {
            Ok(input) => input,
            Err(e) => return response::error_response(StorageError::Json(e)),
        };

        match self.services.progress.mark_mastered(user_id, &input.question_id) {
            Ok(inserted) => ok(&serde_json::json!({
                "questionId": input.question_id,
                "newlyMastered": inserted,
            })),
            Err(e) => response::error_response(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{catalog, CatalogImport, PracticeDb};
    use hyper::StatusCode;

    fn server() -> HttpServer {
        let db = Arc::new(PracticeDb::open_in_memory().unwrap());
        let catalog: CatalogImport = serde_json::from_value(serde_json::json!({
            "exams": [{
                "slug": "step-1",
                "title": "USMLE Step 1",
                "topics": [{ "slug": "cardio", "title": "Cardiology" }],
                "questions": [
                    { "id": "q1", "topic": "cardio", "prompt": "A" },
                    { "id": "q2", "topic": "cardio", "prompt": "B" },
                    { "id": "q3", "prompt": "C" }
                ]
            }]
        }))
        .unwrap();
        db.with_conn_mut(|conn| catalog::import_catalog(conn, &catalog))
            .unwrap();

        let services = Arc::new(Services::new(db, &Config::default()));
        HttpServer::new(services, "127.0.0.1:0".parse().unwrap())
    }

    async fn json(resp: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn post(server: &HttpServer, path: &str, body: serde_json::Value) -> Response<Full<Bytes>> {
        server
            .dispatch(
                &Method::POST,
                path,
                None,
                Some("alice"),
                Bytes::from(body.to_string()),
            )
            .await
    }

    #[tokio::test]
    async fn test_create_and_fetch_attempt() {
        let server = server();
        let resp = post(
            &server,
            "/practice/attempts",
            serde_json::json!({ "examSlug": "step-1", "topicSlug": "cardio" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let attempt = json(resp).await;
        assert_eq!(attempt["questionIds"].as_array().unwrap().len(), 2);

        let path = format!("/practice/attempts/{}", attempt["id"].as_str().unwrap());
        let fetched = server
            .dispatch(&Method::GET, &path, None, Some("alice"), Bytes::new())
            .await;
        assert_eq!(fetched.status(), StatusCode::OK);

        let other_user = server
            .dispatch(&Method::GET, &path, None, Some("bob"), Bytes::new())
            .await;
        assert_eq!(other_user.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_attempt_error_statuses() {
        let server = server();

        let resp = post(&server, "/practice/attempts", serde_json::json!({ "examSlug": "does-not-exist" })).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(resp).await["code"], "exam_not_found");

        let resp = post(&server, "/practice/attempts", serde_json::json!({ "limit": 5 })).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(resp).await["code"], "invalid_input");

        let resp = post(&server, "/practice/attempts", serde_json::json!({ "examSlug": "step-1", "limit": "many" })).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // mastering every question drains the pool
        for id in ["q1", "q2", "q3"] {
            let resp = post(&server, "/practice/mastery", serde_json::json!({ "questionId": id })).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
        let resp = post(&server, "/practice/attempts", serde_json::json!({ "examSlug": "step-1" })).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(json(resp).await["code"], "no_questions_available");
    }

    #[tokio::test]
    async fn test_requires_user_header() {
        let server = server();
        let resp = server
            .dispatch(&Method::GET, "/progress", None, None, Bytes::new())
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_levels_and_progress() {
        let server = server();

        let resp = server
            .dispatch(&Method::GET, "/levels", Some("xp=40"), None, Bytes::new())
            .await;
        let body = json(resp).await;
        assert_eq!(body["level"], 2);
        assert_eq!(body["percent"], 50);

        let resp = server
            .dispatch(&Method::GET, "/levels", None, None, Bytes::new())
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = post(&server, "/progress/xp", serde_json::json!({ "amount": 30 })).await;
        assert_eq!(json(resp).await["leveledUp"], true);

        let resp = server
            .dispatch(&Method::GET, "/progress", None, Some("alice"), Bytes::new())
            .await;
        assert_eq!(json(resp).await["progress"]["xp"], 30);
    }

    #[tokio::test]
    async fn test_unknown_routes() {
        let server = server();
        let resp = server
            .dispatch(&Method::DELETE, "/practice/attempts", None, Some("alice"), Bytes::new())
            .await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

        let resp = server
            .dispatch(&Method::GET, "/nope", None, None, Bytes::new())
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
