//! Process wiring and the HTTP server entry point.
//!
//! [`AppState::from_config`] is the one place shared handles are built, in this
//! order: database connection → completion service (with model discovery) →
//! search strategy → consolidator. Everything downstream receives these
//! handles explicitly.

use anyhow::Result;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use crate::completion::{self, CompletionService};
use crate::config::EngramConfig;
use crate::db::{self, SharedConnection};
use crate::memory::consolidate::Consolidator;
use crate::memory::search::{self, MemorySearch};

/// Shared handles for request handlers and CLI commands.
#[derive(Clone)]
pub struct AppState {
    pub db: SharedConnection,
    pub completion: Arc<dyn CompletionService>,
    pub search: Arc<dyn MemorySearch>,
    pub consolidator: Arc<Consolidator>,
    pub config: Arc<EngramConfig>,
}

impl AppState {
    pub fn new(
        db: SharedConnection,
        completion: Arc<dyn CompletionService>,
        search: Arc<dyn MemorySearch>,
        config: EngramConfig,
    ) -> Self {
        let consolidator = Arc::new(Consolidator::new(
            Arc::clone(&db),
            Arc::clone(&completion),
            &config.completion,
        ));
        Self {
            db,
            completion,
            search,
            consolidator,
            config: Arc::new(config),
        }
    }

    /// Open the database and build every shared service from config.
    pub async fn from_config(config: EngramConfig) -> Result<Self> {
        let db_path = config.resolved_db_path();
        let conn = db::open_database(&db_path)?;
        tracing::info!(db = %db_path.display(), "database ready");
        let db = Arc::new(Mutex::new(conn));

        let completion = completion::create_service(&config.completion).await?;
        tracing::info!(
            provider = %config.completion.provider,
            model = %completion.model(),
            "completion service ready"
        );

        let search = search::create_search(&config.retrieval)?;
        tracing::info!(strategy = search.name(), "memory search ready");

        Ok(Self::new(db, completion, search, config))
    }
}

/// Build the full HTTP application.
pub fn app(state: AppState) -> axum::Router {
    crate::api::router(state).layer(CorsLayer::permissive())
}

/// Serve the HTTP API until ctrl-c.
pub async fn serve(config: EngramConfig) -> Result<()> {
    let bind_addr = config.bind_addr();
    let state = AppState::from_config(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "engram listening at http://{bind_addr}/api");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
