/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use confirmaai_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{auth::jwt_auth_layer, security::SecurityHeadersLayer},
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use confirmaai_shared::clinic_time::ClinicTime;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,

    pub config: Arc<Config>,

    /// Clinic timezone for day/month boundaries
    pub clinic: ClinicTime,
}

impl AppState {
    /// Creates the state; an out-of-range clinic offset falls back to the default
    pub fn new(db: PgPool, config: Config) -> Self {
        let clinic = config.clinic_time().unwrap_or_default();

        Self {
            db,
            config: Arc::new(config),
            clinic,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// ```text
/// /health                          public
/// /api/auth/register|login|refresh public
/// /api/auth/me                     JWT
/// /api/patients[/:id]              JWT
/// /api/appointments[/:id]          JWT
/// /api/settings                    JWT
/// /api/dashboard                   JWT
/// /api/webhook/whatsapp            gateway API key
/// ```
pub fn build_router(state: AppState) -> Router {
    let auth_layer = axum::middleware::from_fn_with_state(state.clone(), jwt_auth_layer);

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let session_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .route_layer(auth_layer.clone());

    let patient_routes = Router::new()
        .route(
            "/",
            get(routes::patients::list_patients).post(routes::patients::create_patient),
        )
        .route(
            "/:id",
            get(routes::patients::get_patient)
                .put(routes::patients::update_patient)
                .delete(routes::patients::delete_patient),
        );

    let appointment_routes = Router::new()
        .route(
            "/",
            get(routes::appointments::list_appointments)
                .post(routes::appointments::create_appointment),
        )
        .route(
            "/:id",
            get(routes::appointments::get_appointment)
                .put(routes::appointments::update_appointment)
                .delete(routes::appointments::delete_appointment),
        );

    let protected_routes = Router::new()
        .nest("/patients", patient_routes)
        .nest("/appointments", appointment_routes)
        .route(
            "/settings",
            get(routes::settings::get_settings).put(routes::settings::update_settings),
        )
        .route("/dashboard", get(routes::dashboard::get_dashboard))
        .route_layer(auth_layer);

    let api_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(session_routes))
        .route("/webhook/whatsapp", post(routes::webhook::whatsapp_webhook))
        .merge(protected_routes);

    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
