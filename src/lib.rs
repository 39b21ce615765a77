//! Admingate guards the admin back-office: it issues, validates and
//! revokes the cookie-borne access tokens every protected request rides on.

#[forbid(unsafe_code)]
#[deny(missing_docs, unused_mut)]
mod admin;
mod auth;
mod cookie;
mod crypto;
pub mod error;
mod ip;
mod router;
mod session;
mod store;
mod token;

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use error::ServerError;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::CorsLayer;
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

/// How often the background sweeper re-checks cached sessions.
pub const SWEEP_PERIOD: Duration = Duration::from_secs(10 * 60);

/// MUST NEVER be used in production.
#[cfg(test)]
pub(crate) async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    headers: &[(&str, &str)],
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub credentials: admin::CredentialStore,
    pub crypto: Arc<crypto::PasswordManager>,
    pub auth: Arc<auth::AccessTokenService>,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    // Cookies are credentialed: CORS only opens up for the configured
    // front-end origin.
    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE]);
    if let Some(origin) = state
        .config
        .frontend_origin
        .as_deref()
        .and_then(|origin| origin.parse::<HeaderValue>().ok())
    {
        cors = cors.allow_origin(origin).allow_credentials(true);
    }

    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        .layer(cors);

    Router::new()
        // `GET /status.json` goes to the public instance metadata.
        .route(
            "/status.json",
            get(|config: axum::extract::State<Arc<config::Configuration>>| async move {
                Json(config.0.as_ref().clone())
            }),
        )
        // `POST /auth/login` goes to `login`.
        .route("/auth/login", post(router::login::handler))
        // `DELETE /auth/logout` goes to `logout`.
        .route("/auth/logout", delete(router::logout::handler))
        // `GET /auth/status` goes to `status`.
        .route("/auth/status", get(router::status::handler))
        .with_state(state)
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>>
{
    // read configuration file. let it in memory.
    let config = config::Configuration::default().read()?;

    // handle jwt. issuance cannot proceed without the token section.
    let Some(token) = &config.token else {
        return Err(Box::new(ServerError::Configuration(
            "missing `token` entry on `config.yaml` file",
        )));
    };
    let tokens = token::TokenManager::new(token)?;

    let store = Arc::new(store::MemoryStore::new(Arc::new(store::SystemClock)));
    let sessions = session::SessionRegistry::new(store);
    let auth = Arc::new(auth::AccessTokenService::new(tokens, sessions));

    let crypto = Arc::new(crypto::PasswordManager::new(config.argon2.clone())?);
    let credentials = admin::CredentialStore::new(config.admins.clone());

    if config.admins.is_empty() {
        tracing::warn!("no `admins` entries on `config.yaml` file, nobody can sign in");
    }

    Ok(AppState {
        config,
        credentials,
        crypto,
        auth,
    })
}

/// Start the periodic session sweeper.
pub fn spawn_sweeper(state: &AppState) {
    Arc::clone(&state.auth).spawn_sweeper(SWEEP_PERIOD);
}
