#[tokio::main]
async fn main() {
    use axum::{
        Router,
        routing::{get, post, put},
    };
    use chrono::Duration;
    use hours_access::{AuthService, IdTokenVerifier, SessionStore};
    use hours_server::{
        auth::{
            self, AppState, RemoteKeyStore,
            db::{PgSessionStore, PgUserStore},
        },
        config::ServerConfig,
    };
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    let sessions: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(db_pool.clone()));
    let users = Arc::new(PgUserStore::new(db_pool.clone()));

    // Cleanup expired sessions on startup
    match sessions.delete_expired().await {
        Ok(count) if count > 0 => {
            tracing::info!(
                deleted_sessions = count,
                "Cleaned up expired sessions on startup"
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, "Failed to cleanup expired sessions on startup");
        }
    }

    // Spawn periodic session cleanup task
    let cleanup_sessions = sessions.clone();
    let cleanup_interval_secs = config.session.cleanup_interval_seconds;
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(cleanup_interval_secs));
        loop {
            interval.tick().await;
            match cleanup_sessions.delete_expired().await {
                Ok(count) if count > 0 => {
                    tracing::debug!(deleted_sessions = count, "Periodic session cleanup");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to cleanup expired sessions");
                }
            }
        }
    });

    // Fetch identity provider keys and keep them fresh
    tracing::info!("Fetching identity provider keys...");
    let key_store = Arc::new(RemoteKeyStore::new(config.verifier.jwks_url().to_string()));
    key_store
        .refresh()
        .await
        .expect("failed to fetch identity provider keys");

    let refresh_keys = key_store.clone();
    let refresh_interval_secs = config.jwks_refresh_interval_seconds;
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(refresh_interval_secs));
        // The first tick fires immediately; the startup fetch covered it.
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = refresh_keys.refresh().await {
                tracing::warn!(error = %e, "Failed to refresh identity provider keys");
            }
        }
    });

    // Create application state
    let verifier = IdTokenVerifier::new(config.verifier.clone(), key_store);
    let service = AuthService::new(
        verifier,
        sessions.clone(),
        users.clone(),
        Duration::minutes(config.session.duration_minutes),
    );
    let app_state = Arc::new(AppState::new(
        service,
        users,
        sessions,
        config.session.clone(),
    ));

    let app = Router::new()
        .route("/users/session", post(auth::routes::sign_in))
        .route("/users/signout", post(auth::routes::sign_out))
        .route(
            "/users/me",
            get(auth::routes::me).put(auth::routes::update_me),
        )
        .route("/users/{id}", get(auth::routes::get_user))
        .route(
            "/users/{id}/permissions/{course}",
            put(auth::routes::grant_permission).delete(auth::routes::revoke_permission),
        )
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app.into_make_service())
        .await
        .expect("server error");
}
