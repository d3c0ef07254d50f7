use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sat_quiz::config::AppConfig;
use sat_quiz::domain::SatCategories;
use sat_quiz::handlers::{self, AppState};
use sat_quiz::quiz::{FilterEngine, QuizService};
use sat_quiz::source::CollegeBoardSource;
use sat_quiz::db;

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sat_quiz=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = AppConfig::load();

  let pool = db::init_db(&config.database_path).expect("Failed to initialize database");
  let source = CollegeBoardSource::new(&config.api).expect("Failed to build HTTP client");

  let filters = FilterEngine::new(Arc::new(SatCategories), Arc::new(pool.clone()));
  let quiz = QuizService::new(
    Arc::new(source),
    filters,
    Arc::new(pool.clone()),
    Arc::new(pool),
  );

  let app = handlers::router(AppState::new(quiz)).layer(TraceLayer::new_for_http());

  let bind_addr = config.bind_addr();
  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://localhost:{}", config.server_port);

  axum::serve(listener, app)
    .await
    .expect("Server failed to start");
}
