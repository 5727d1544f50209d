use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use planotes::config::{environment::Config, init_db, Database};
use planotes::modules::auth::crud::MagicLinkCrud;
use planotes::services::mail::{HttpMailer, LogMailer, Mailer};
use planotes::services::session::SessionService;
use planotes::services::time::SystemClock;
use planotes::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "planotes=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load environment configuration");

    let pool = init_db(&config.database_url).expect("Invalid DATABASE_URL");

    if config.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");
        tracing::info!("Migrations applied");
    }

    MagicLinkCrud::new(pool.clone()).spawn_expired_sweeper(Duration::from_secs(10 * 60));

    let mailer: Arc<dyn Mailer> = match config.mail {
        Some(mail) => Arc::new(
            HttpMailer::new(mail, config.app_url.clone()).expect("Failed to build mail client"),
        ),
        None => {
            tracing::warn!("MAIL_API_KEY not set, magic links will only be logged");
            Arc::new(LogMailer::new(config.app_url.clone()))
        }
    };

    let state = AppState {
        db: Database::mysql(pool),
        sessions: SessionService::new(config.session_secret),
        mailer,
        clock: Arc::new(SystemClock),
    };

    let app = planotes::create_app(state, config.rate_limit);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listener");
    tracing::info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await.expect("Server error");
}
