//! Core application

use std::sync::Arc;

use anyhow::Result;

use crate::api::ApiServer;
use crate::core::banner;
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::core::storage::AppStorage;
use crate::data::SqliteService;
use crate::data::cache::{CacheService, RateLimitPolicy, RateLimiter};
use crate::data::coherency::Coordinator;
use crate::data::query_cache::QueryCache;
use crate::domain::NoteService;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub storage: AppStorage,
    pub database: Arc<SqliteService>,
    pub cache: Arc<CacheService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub coordinator: Arc<Coordinator>,
    pub query_cache: Arc<QueryCache>,
    pub notes: Arc<NoteService>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        // `start` is the only command and the default
        debug_assert!(matches!(command, Some(Commands::Start) | None));

        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let storage = AppStorage::init().await?;

        let cache = Arc::new(
            CacheService::new(&config.store)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to initialize shared store: {}", e))?,
        );
        tracing::debug!(backend = cache.backend_name(), "Shared store initialized");

        let database = Arc::new(
            SqliteService::init(&storage)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to initialize record store: {}", e))?,
        );

        Ok(Self::assemble(config, storage, database, cache))
    }

    /// Wire services on top of an initialized record store and shared store
    fn assemble(
        config: AppConfig,
        storage: AppStorage,
        database: Arc<SqliteService>,
        cache: Arc<CacheService>,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(
            cache.clone(),
            RateLimitPolicy::from(&config.rate_limit),
        ));
        let coordinator = Arc::new(Coordinator::new(cache.clone()));
        let query_cache = Arc::new(QueryCache::new(&config.query_cache, coordinator.clone()));
        let notes = Arc::new(NoteService::new(
            Arc::new(database.clone()),
            coordinator.clone(),
            query_cache.clone(),
            config.query_cache.max_page_size,
        ));
        let shutdown = ShutdownService::new(database.clone());

        Self {
            shutdown,
            config,
            storage,
            database,
            cache,
            rate_limiter,
            coordinator,
            query_cache,
            notes,
        }
    }

    /// Fully in-memory application (SQLite and shared store)
    #[cfg(test)]
    pub async fn for_test(config: AppConfig) -> Self {
        let storage = AppStorage::init_for_test(std::env::temp_dir());
        let database = Arc::new(SqliteService::in_memory().await);
        let cache = Arc::new(CacheService::in_memory());
        Self::assemble(config, storage, database, cache)
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        app.start_background_tasks().await;

        banner::print_banner(&app.config, &app.storage.data_dir().display().to_string());

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }

    pub async fn start_background_tasks(&self) {
        self.shutdown
            .register(
                self.database
                    .start_checkpoint_task(self.shutdown.subscribe()),
            )
            .await;
        self.shutdown
            .register(self.coordinator.start_retry_task(self.shutdown.subscribe()))
            .await;

        let mut signals = self.coordinator.subscribe();
        let mut shutdown_rx = self.shutdown.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    signal = signals.recv() => match signal {
                        Ok(signal) => tracing::trace!(
                            scope = %signal.scope,
                            generation = signal.generation,
                            note_id = %signal.note_id,
                            "Invalidation signal"
                        ),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "Invalidation log lagged");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });
        self.shutdown.register(handle).await;

        tracing::debug!("Background tasks started");
    }
}
