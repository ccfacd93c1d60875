use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use persistence::repositories::RegistrationRepository;
use shared::jwt::{JwtConfig, JwtError};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::services::RegistrationService;

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, require_user_auth, trace_id};
use crate::routes::{events, health};
use crate::services::{EmailRegistrationNotifier, EmailService, ImageStore};

/// Registration service wired to Postgres and email delivery.
pub type Registrations = RegistrationService<RegistrationRepository, EmailRegistrationNotifier>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub email: EmailService,
    pub images: ImageStore,
    pub registrations: Arc<Registrations>,
}

impl AppState {
    /// Builds shared state. Fails if the JWT keys in `config` are unusable.
    pub fn new(config: Config, pool: PgPool) -> Result<Self, JwtError> {
        let jwt = Arc::new(config.jwt.build()?);
        let email = EmailService::new(config.email.clone());
        let images = ImageStore::new(&config.storage);

        let store = RegistrationRepository::new(pool.clone(), config.registration.lock_timeout());
        let registrations = Arc::new(RegistrationService::new(
            store,
            EmailRegistrationNotifier::new(email.clone()),
        ));

        Ok(Self {
            pool,
            config: Arc::new(config),
            jwt,
            email,
            images,
            registrations,
        })
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.security.cors_origins.is_empty() {
        // Development default
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub fn create_app(config: Config, pool: PgPool) -> Result<Router, JwtError> {
    let state = AppState::new(config, pool)?;
    Ok(build_router(state))
}

pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    // Protected routes (require a Bearer token)
    let protected_routes = Router::new()
        .route("/events", post(events::create_event))
        .route("/events/manage", get(events::manage_events))
        .route(
            "/events/:event_id",
            put(events::update_event).delete(events::delete_event),
        )
        .route("/events/:event_id/restore", post(events::restore_event))
        .route(
            "/events/:event_id/register",
            post(events::register_for_event),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ))
        .layer(DefaultBodyLimit::max(config.storage.max_form_bytes()));

    // Public routes (a token is optional and only personalizes the listing)
    let public_routes = Router::new()
        .route("/events", get(events::list_events))
        .route("/events/:event_id", get(events::get_event))
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/metrics", get(metrics_handler))
        .nest_service(
            &config.storage.public_url_prefix,
            ServeDir::new(&config.storage.public_dir),
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors_layer(&config))
        .with_state(state)
}
