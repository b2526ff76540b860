//! Server Implementation
//!
//! HTTP 服务器启动和管理

use std::time::Duration;

use crate::core::tasks::BackgroundTasks;
use crate::core::{Config, Result, ServerState};

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state (for tests and embedding)
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> Result<()> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config).await,
        };

        // Start background tasks before accepting traffic
        let mut tasks = BackgroundTasks::new();
        state.start_background_tasks(&mut tasks);
        tasks.log_summary();

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        tracing::info!("Mesa waitlist server listening on {}", addr);

        let router = crate::api::router(state);
        let listener = tokio::net::TcpListener::bind(addr).await?;

        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down...");
            })
            .await?;

        // Drain background tasks, bounded by the configured timeout
        let timeout = Duration::from_millis(self.config.shutdown_timeout_ms);
        if tokio::time::timeout(timeout, tasks.shutdown()).await.is_err() {
            tracing::warn!(
                timeout_ms = self.config.shutdown_timeout_ms,
                "Background tasks did not stop in time"
            );
        }

        Ok(())
    }
}
