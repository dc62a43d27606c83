//! Server Implementation
//!
//! 启动流程：初始化状态 → 一致性检查 → 后台任务 → 等待 Ctrl-C

use crate::core::{Config, ServerState};
use crate::utils::AppError;

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

    /// Create server with existing state
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> Result<(), AppError> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config).await?,
        };

        // Recovery must finish before any state-changing call is accepted.
        let report = state.run_recovery().await?;
        if !report.missing_current.is_empty() {
            tracing::error!(
                images = ?report.missing_current,
                "Images with a missing current artifact need manual attention"
            );
        }

        let tasks = state.start_background_tasks();
        tasks.log_summary();

        tracing::info!(
            environment = %self.config.environment,
            storage = %self.config.storage_path.display(),
            "🦀 Edit server ready"
        );

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Shutting down...");

        tasks.check_health();
        tasks.shutdown().await;
        state.db.close().await;
        Ok(())
    }
}
