use crate::client::MdmClient;
use crate::config::Config;
use crate::error::{MdmvizError, Result};
use crate::server::sessions::SessionStore;
use crate::session::{Session, SessionOptions};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Header carrying the id returned by `POST /login`
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// HTTP front end over logged-in sessions
pub struct HttpServer {
    state: AppState,
    allowed_origins: Vec<String>,
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    client: MdmClient,
    sessions: Arc<SessionStore>,
}

impl HttpServer {
    pub fn new(config: Config) -> Result<Self> {
        let client = MdmClient::new(Duration::from_secs(config.mdmviz.request_timeout_secs))?;
        let ttl = chrono::Duration::try_minutes(config.http_server.session_ttl_minutes)
            .ok_or_else(|| {
                MdmvizError::Config(format!(
                    "session_ttl_minutes out of range: {}",
                    config.http_server.session_ttl_minutes
                ))
            })?;
        let allowed_origins = config.http_server.allowed_origins.clone();

        Ok(Self {
            state: AppState {
                config: Arc::new(config),
                client,
                sessions: Arc::new(SessionStore::new(ttl)),
            },
            allowed_origins,
        })
    }

    /// Sessions held by this server
    pub fn sessions(&self) -> Arc<SessionStore> {
        Arc::clone(&self.state.sessions)
    }

    /// Run the HTTP server until it fails
    pub async fn run(&self, port: u16) -> Result<()> {
        let addr = format!("127.0.0.1:{}", port);
        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            MdmvizError::Config(format!(
                "Failed to bind to {}: {}. Set http_server.port in config.toml to a free port.",
                addr, e
            ))
        })?;

        log::info!("Starting mdmviz HTTP server on http://{}", addr);

        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    /// Create the axum router
    pub fn router(&self) -> Router {
        let cors = if self.allowed_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<axum::http::HeaderValue> = self
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/health", get(handle_health))
            .route("/environments", get(handle_environments))
            .route("/login", post(handle_login))
            .route("/logout", post(handle_logout))
            .route("/entities", get(handle_entities))
            .route("/visualize", post(handle_visualize))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(self.state.clone())
    }
}

/// Error wrapper rendering `{"error": message}` with a matching status
struct ApiError(MdmvizError);

impl From<MdmvizError> for ApiError {
    fn from(e: MdmvizError) -> Self {
        Self(e)
    }
}

fn status_for(error: &MdmvizError) -> StatusCode {
    match error {
        MdmvizError::Authentication(_)
        | MdmvizError::NotAuthenticated
        | MdmvizError::SessionNotFound(_) => StatusCode::UNAUTHORIZED,
        MdmvizError::NoSelection | MdmvizError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        MdmvizError::EntityNotFound(_) | MdmvizError::UnknownEnvironment(_) => {
            StatusCode::NOT_FOUND
        }
        e if e.is_upstream() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            log::error!("Request failed: {}", self.0);
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

fn session_from_headers(state: &AppState, headers: &HeaderMap) -> ApiResult<Arc<Session>> {
    let id = headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(MdmvizError::NotAuthenticated)?;
    Ok(state.sessions.get(id)?)
}

async fn handle_health() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "mdmviz",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
        .into_response()
}

async fn handle_environments(State(state): State<AppState>) -> Json<serde_json::Value> {
    let names: Vec<&str> = state
        .config
        .environments
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    Json(serde_json::json!({ "environments": names }))
}

#[derive(Deserialize)]
struct LoginBody {
    #[serde(default)]
    environment: Option<String>,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn handle_login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let environment = state
        .config
        .resolve_environment(body.environment.as_deref())?
        .clone();

    let session = Session::login(
        &state.client,
        &environment,
        &body.username,
        &body.password,
        SessionOptions::from_config(&state.config),
    )
    .await?;

    let entity_count = session.entity_choices().len();
    let session_id = state.sessions.insert(session);

    Ok(Json(serde_json::json!({
        "session_id": session_id,
        "environment": environment.name,
        "entity_count": entity_count
    })))
}

async fn handle_logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<StatusCode> {
    let id = headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(MdmvizError::NotAuthenticated)?;
    if state.sessions.remove(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(MdmvizError::SessionNotFound(id.to_string()).into())
    }
}

async fn handle_entities(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let session = session_from_headers(&state, &headers)?;
    Ok(Json(serde_json::json!({
        "entities": session.entity_choices(),
        "default_selection": session.default_selection()
    })))
}

#[derive(Deserialize)]
struct VisualizeBody {
    #[serde(default)]
    entities: Vec<String>,
}

async fn handle_visualize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<VisualizeBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let session = session_from_headers(&state, &headers)?;
    let visualization = session.visualize(&body.entities)?;

    let graphs: Vec<serde_json::Value> = visualization
        .graphs()
        .into_iter()
        .map(|(title, graph)| serde_json::json!({ "title": title, "dot": graph.to_dot() }))
        .collect();

    Ok(Json(serde_json::json!({
        "kind": visualization.kind(),
        "graphs": graphs
    })))
}
