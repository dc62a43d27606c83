use std::time::Duration;

use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::Config;
use crate::db::DbService;
use crate::history::{HistoryEngine, ImageLocks, Recovery, RecoveryReport, Retention};
use crate::images::ImageService;
use crate::media::{ArtifactStore, ThumbnailGenerator};
use crate::utils::AppError;

/// 锁表清理间隔
const LOCK_PRUNE_INTERVAL: Duration = Duration::from_secs(600);

/// 日志保留天数
const LOG_RETENTION_DAYS: u64 = 7;

/// 服务器状态 - 持有所有服务的共享引用
///
/// 所有字段都是廉价 Clone（连接池、Arc 包装的锁表）。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | DbService | SQLite 连接池 |
/// | store | ArtifactStore | 图片文件目录 |
/// | history | HistoryEngine | 历史记录 / 撤销 / 恢复 |
/// | images | ImageService | 上传、变换、删除 |
/// | retention | Retention | 历史保留裁剪 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: DbService,
    pub store: ArtifactStore,
    pub history: HistoryEngine,
    pub images: ImageService,
    pub retention: Retention,
}

impl ServerState {
    /// 按顺序初始化：
    /// 1. 存储目录
    /// 2. 数据库 (含迁移)
    /// 3. 历史引擎与图片服务
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        let store = ArtifactStore::new(&config.storage_path, &config.temp_storage_path);
        store.ensure_dirs().await.map_err(|e| {
            AppError::storage(format!(
                "Failed to create storage directory {}: {e}",
                config.storage_path.display()
            ))
        })?;

        let db = DbService::new(&config.database_path).await?;

        let thumbnails = ThumbnailGenerator::new(config.thumbnail_size, config.thumbnail_quality);
        let history = HistoryEngine::new(
            db.pool.clone(),
            store.clone(),
            thumbnails,
            ImageLocks::new(),
        );
        let images = ImageService::new(history.clone(), config);
        let retention = Retention::new(history.clone(), config.undo_stack_limit);

        tracing::info!(
            storage = %config.storage_path.display(),
            database = %config.database_path.display(),
            undo_stack_limit = retention.max_entries(),
            "Server state initialized"
        );

        Ok(Self {
            config: config.clone(),
            db,
            store,
            history,
            images,
            retention,
        })
    }

    /// 启动一致性检查，必须在接收请求之前完成
    pub async fn run_recovery(&self) -> Result<RecoveryReport, AppError> {
        Ok(Recovery::new(self.history.clone()).run().await?)
    }

    /// 启动后台任务
    ///
    /// - 历史保留裁剪 (RETENTION_ENABLED)
    /// - 锁表清理
    /// - 旧日志清理 (LOG_DIR)
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        if self.config.retention_enabled {
            let retention = self.retention.clone();
            let interval = Duration::from_secs(self.config.retention_interval_secs.max(1));
            let token = tasks.shutdown_token();
            tasks.spawn("history_retention", TaskKind::Periodic, async move {
                retention.run_periodic(interval, token).await;
            });
        }

        let locks = self.history.locks().clone();
        let token = tasks.shutdown_token();
        tasks.spawn("lock_prune", TaskKind::Periodic, async move {
            let mut ticker = tokio::time::interval(LOCK_PRUNE_INTERVAL);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let pruned = locks.prune();
                        if pruned > 0 {
                            tracing::debug!(pruned, "Pruned idle image locks");
                        }
                    }
                }
            }
        });

        if let Some(dir) = self.config.log_dir.clone() {
            tasks.spawn("log_cleanup", TaskKind::Warmup, async move {
                let result = tokio::task::spawn_blocking(move || {
                    crate::utils::logger::cleanup_old_logs(&dir, LOG_RETENTION_DAYS)
                })
                .await;
                match result {
                    Ok(Ok(removed)) if removed > 0 => {
                        tracing::info!(removed, "Old log files removed")
                    }
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => tracing::warn!(error = %e, "Log cleanup failed"),
                    Err(e) => tracing::warn!(error = %e, "Log cleanup task failed"),
                }
            });
        }

        tasks
    }
}
