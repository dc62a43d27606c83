//! Edit Server - 图片编辑后端核心
//!
//! # 架构概述
//!
//! - **历史引擎** (`history`): 版本日志、当前状态、撤销 / 恢复、保留裁剪、启动检查
//! - **图片服务** (`images`): 上传、内置变换、删除
//! - **媒体** (`media`): 编解码、缩略图、文件布局
//! - **数据库** (`db`): SQLite (sqlx)
//!
//! # 模块结构
//!
//! ```text
//! edit-server/src/
//! ├── core/          # 配置、状态、后台任务、生命周期
//! ├── db/            # 连接池、迁移、仓储
//! ├── history/       # 历史引擎
//! ├── images/        # 图片服务
//! ├── media/         # 图片文件处理
//! └── utils/         # 日志、错误类型
//! ```

pub mod core;
pub mod db;
pub mod history;
pub mod images;
pub mod media;
pub mod utils;

// Re-export 公共类型
pub use core::{BackgroundTasks, Config, Server, ServerState, TaskKind};
pub use history::{HistoryEngine, HistoryError, Recovery, Retention};
pub use images::{ImageService, ImageServiceError, UploadRequest};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

/// 加载 `.env` 并初始化日志
pub fn setup_environment() -> Result<(), AppError> {
    // A missing .env file is fine.
    let _ = dotenv::dotenv();

    let level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    if let Some(dir) = &log_dir {
        std::fs::create_dir_all(dir)
            .map_err(|e| AppError::storage(format!("Failed to create log directory {dir}: {e}")))?;
    }
    init_logger_with_file(level.as_deref(), log_dir.as_deref());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ______    ___ __
   / ____/___/ (_) /_
  / __/ / __  / / __/
 / /___/ /_/ / / /_
/_____/\__,_/_/\__/
    "#
    );
}
