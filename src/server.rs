use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::auth::{require_auth, TokenIssuer};
use crate::config::Config;
use crate::drift::{report_from_source, ApplicationDrift, DriftOptions};
use crate::error::{DriftError, ValidationError};
use crate::store::ReleaseStore;
use crate::types::{NewRelease, Release};
use crate::validation::{
    CreateReleaseRequest, Credentials, ListReleasesQuery, LoginRequest, Page,
};

#[derive(Clone)]
pub struct ApiState {
    db_path: PathBuf,
    issuer: Arc<TokenIssuer>,
    drift: DriftOptions,
}

impl ApiState {
    pub fn new(db_path: PathBuf, issuer: TokenIssuer, drift: DriftOptions) -> Self {
        Self {
            db_path,
            issuer: Arc::new(issuer),
            drift,
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        Self::bad_request(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Unwraps a JSON body. A missing or unparseable body reads as an empty
/// request so field validation reports it; mistyped fields are a 400.
fn json_body<T: Default>(payload: std::result::Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(JsonRejection::MissingJsonContentType(_)) | Err(JsonRejection::JsonSyntaxError(_)) => {
            debug!("request body is not JSON, treating it as empty");
            Ok(T::default())
        }
        Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
    }
}

fn query_params<T>(query: std::result::Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Serialize)]
struct CreatedResponse {
    message: &'static str,
    #[serde(rename = "releaseId")]
    release_id: i64,
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    let secret = config.load_jwt_secret()?;
    let issuer = TokenIssuer::new(&secret, config.auth.token_ttl_minutes)
        .context("failed creating token issuer")?;
    let db_path = config.resolved_db_path();
    // Fail at startup rather than on the first request.
    ReleaseStore::open(&db_path)?;

    let state = ApiState::new(db_path, issuer, config.drift_options());
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(tie_break = %config.drift.tie_break, "REST API listening on http://{bind}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn router(state: ApiState) -> Router {
    let protected = Router::new()
        .route("/release", post(create_release))
        .route("/releases", get(list_releases))
        .route("/drift", get(drift))
        .route_layer(middleware::from_fn_with_state(
            state.issuer.clone(),
            require_auth,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/login", post(login))
        .merge(protected)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed listening for shutdown signal: {err}");
    }
    info!("shutting down");
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn login(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let credentials = Credentials::try_from(json_body(payload)?)?;
    let store = open_store(&state)?;
    let user = store
        .authenticate(&credentials.username, &credentials.password)
        .map_err(|err| {
            error!("error logging user in: {err:#}");
            ApiError::internal("Error logging in")
        })?
        .ok_or_else(|| ApiError::bad_request("Username or password incorrect"))?;

    let token = state.issuer.issue(&user).map_err(ApiError::internal)?;
    info!(user = %user.username, "user logged in");
    Ok(Json(TokenResponse { token }))
}

async fn create_release(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<CreateReleaseRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let release = NewRelease::try_from(json_body(payload)?)?;
    let store = open_store(&state)?;
    let release_id = store.insert_release(&release).map_err(|err| {
        error!("error inserting release: {err:#}");
        ApiError::internal("Failed to create release.")
    })?;

    info!(
        release_id,
        name = %release.name,
        version = %release.version,
        account = %release.account,
        region = %release.region,
        "release created"
    );
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Release created successfully.",
            release_id,
        }),
    ))
}

async fn list_releases(
    State(state): State<ApiState>,
    query: std::result::Result<Query<ListReleasesQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Release>>> {
    let page = Page::try_from(query_params(query)?)?;
    let store = open_store(&state)?;
    let releases = store.list_releases(page.limit, page.offset).map_err(|err| {
        error!("error fetching releases: {err:#}");
        ApiError::internal("Failed to fetch releases.")
    })?;
    Ok(Json(releases))
}

async fn drift(State(state): State<ApiState>) -> ApiResult<Json<Vec<ApplicationDrift>>> {
    let store = open_store(&state)?;
    let report = report_from_source(&store, &state.drift).map_err(|err| {
        match err.downcast_ref::<DriftError>() {
            Some(drift_err) => {
                error!("drift computation failed: {drift_err}");
                ApiError::internal(drift_err)
            }
            None => {
                error!("error reading deployments: {err:#}");
                ApiError::internal("Failed to compute drift.")
            }
        }
    })?;
    Ok(Json(report))
}

fn open_store(state: &ApiState) -> std::result::Result<ReleaseStore, ApiError> {
    ReleaseStore::open(&state.db_path).map_err(|err| {
        error!("failed opening store: {err:#}");
        ApiError::internal("Database unavailable.")
    })
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;

    const SECRET: &str = "test-secret-key-for-testing-only";

    struct TestApp {
        _dir: TempDir,
        db_path: PathBuf,
        router: Router,
    }

    fn setup() -> TestApp {
        let dir = TempDir::new().expect("failed creating temp dir");
        let db_path = dir.path().join("releases.db");
        let store = ReleaseStore::open(&db_path).expect("failed opening store");
        store.insert_user("admin", "hunter2").expect("failed adding user");
        let issuer = TokenIssuer::new(SECRET, 120).expect("failed creating issuer");
        let state = ApiState::new(db_path.clone(), issuer, DriftOptions::default());
        TestApp {
            _dir: dir,
            db_path,
            router: router(state),
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_with(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn login_token(app: &TestApp) -> String {
        let (status, body) = send(
            &app.router,
            post_json("/login", None, json!({"username": "admin", "password": "hunter2"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().expect("missing token").to_string()
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let app = setup();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let app = setup();
        let (status, body) = send(
            &app.router,
            post_json("/login", None, json!({"username": "admin", "password": "nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Username or password incorrect");

        let (status, body) = send(&app.router, post_json("/login", None, json!({"username": "admin"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "All fields are required");
    }

    #[tokio::test]
    async fn protected_routes_need_a_header() {
        let app = setup();
        let request = Request::builder().uri("/drift").body(Body::empty()).unwrap();
        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing auth header");
    }

    #[tokio::test]
    async fn protected_routes_reject_bad_tokens() {
        let app = setup();
        let (status, body) = send(&app.router, get_with("/releases", "not-a-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn creates_and_lists_releases() {
        let app = setup();
        let token = login_token(&app).await;

        let (status, body) = send(
            &app.router,
            post_json(
                "/release",
                Some(&token),
                json!({"name": "app1", "version": "1.2.3", "account": "prod", "region": "primary"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Release created successfully.");
        assert!(body["releaseId"].as_i64().is_some());

        let (status, body) = send(&app.router, get_with("/releases?limit=5", &token)).await;
        assert_eq!(status, StatusCode::OK);
        let releases = body.as_array().expect("expected array");
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0]["name"], "app1");
        assert_eq!(releases[0]["version"], "1.2.3");
    }

    #[tokio::test]
    async fn rejects_invalid_release_input() {
        let app = setup();
        let token = login_token(&app).await;

        let (status, body) = send(
            &app.router,
            post_json(
                "/release",
                Some(&token),
                json!({"name": "app1", "version": "banana", "account": "prod", "region": "primary"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid version: banana");

        let (status, _) = send(&app.router, get_with("/releases?limit=500", &token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    fn raw_post(
        uri: &str,
        token: Option<&str>,
        content_type: Option<&str>,
        body: &str,
    ) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn unreadable_bodies_report_missing_fields() {
        let app = setup();
        let token = login_token(&app).await;

        for request in [
            raw_post("/login", None, None, ""),
            raw_post("/login", None, Some("application/json"), ""),
            raw_post("/login", None, Some("application/json"), "not json"),
            raw_post("/release", Some(&token), None, ""),
            raw_post("/release", Some(&token), Some("application/json"), ""),
        ] {
            let (status, body) = send(&app.router, request).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "All fields are required");
        }
    }

    #[tokio::test]
    async fn mistyped_fields_get_a_json_error() {
        let app = setup();
        let (status, body) = send(
            &app.router,
            post_json("/login", None, json!({"username": 5, "password": "hunter2"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn malformed_query_gets_a_json_error() {
        let app = setup();
        let token = login_token(&app).await;
        let (status, body) = send(&app.router, get_with("/releases?limit=abc", &token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn drift_route_returns_report() {
        let app = setup();
        let store = ReleaseStore::open(&app.db_path).unwrap();
        for (name, account, region, version) in [
            ("app1", "staging", "primary", "3.0.1"),
            ("app1", "prod", "primary", "2.9.0"),
            ("app2", "staging", "primary", "1.0.0"),
            ("app2", "prod", "primary", "1.0.0"),
            ("app3", "prod", "secondary", "1.0.0"),
        ] {
            store
                .insert_release(&NewRelease {
                    name: name.to_string(),
                    version: version.to_string(),
                    account: account.to_string(),
                    region: region.to_string(),
                })
                .unwrap();
        }
        let token = login_token(&app).await;

        let (status, body) = send(&app.router, get_with("/drift", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{"app1": {"latest": "3.0.1", "drift": {"prod": {"primary": "2.9.0"}}}}])
        );
    }

    #[tokio::test]
    async fn drift_route_fails_on_bad_stored_version() {
        let app = setup();
        let store = ReleaseStore::open(&app.db_path).unwrap();
        store
            .insert_release(&NewRelease {
                name: "app1".to_string(),
                version: "not-semver".to_string(),
                account: "staging".to_string(),
                region: "primary".to_string(),
            })
            .unwrap();
        let token = login_token(&app).await;

        let (status, body) = send(&app.router, get_with("/drift", &token)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("not-semver"));
    }
}
