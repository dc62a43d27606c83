use std::path::{Path, PathBuf};

/// 服务器配置 - 图像编辑后端的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | STORAGE_PATH | ./storage | 图像文件目录 |
/// | TEMP_STORAGE_PATH | ./storage/temp | 临时文件目录 |
/// | DATABASE_PATH | ./storage/imagetools.db | SQLite 数据库文件 |
/// | MAX_UPLOAD_SIZE_MB | 20 | 上传大小上限 |
/// | ALLOWED_EXTENSIONS | jpg,jpeg,png,gif,bmp,webp,tiff | 允许的扩展名 |
/// | THUMBNAIL_SIZE | 300 | 缩略图最大边长 |
/// | THUMBNAIL_QUALITY | 80 | 缩略图 JPEG 质量 |
/// | UNDO_STACK_LIMIT | 10 | 每张图保留的历史条数 |
/// | RETENTION_ENABLED | true | 是否启用历史裁剪任务 |
/// | RETENTION_INTERVAL_SECS | 3600 | 历史裁剪周期(秒) |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (unset) | 滚动日志目录 |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// STORAGE_PATH=/data/images UNDO_STACK_LIMIT=20 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Artifact directory (originals, versions, thumbnails)
    pub storage_path: PathBuf,
    /// Scratch directory for in-flight uploads
    pub temp_storage_path: PathBuf,
    pub database_path: PathBuf,
    pub max_upload_size_mb: u64,
    /// Lowercase, without the leading dot
    pub allowed_extensions: Vec<String>,
    pub thumbnail_size: u32,
    pub thumbnail_quality: u8,
    /// Retention cap: history records kept per image
    pub undo_stack_limit: usize,
    pub retention_enabled: bool,
    pub retention_interval_secs: u64,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// 运行环境: development | staging | production
    pub environment: String,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let storage_path: PathBuf = std::env::var("STORAGE_PATH")
            .unwrap_or_else(|_| "./storage".into())
            .into();

        Self {
            temp_storage_path: std::env::var("TEMP_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| storage_path.join("temp")),
            database_path: std::env::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| storage_path.join("imagetools.db")),
            storage_path,
            max_upload_size_mb: std::env::var("MAX_UPLOAD_SIZE_MB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            allowed_extensions: std::env::var("ALLOWED_EXTENSIONS")
                .map(|v| parse_extensions(&v))
                .unwrap_or_else(|_| default_extensions()),
            thumbnail_size: std::env::var("THUMBNAIL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            thumbnail_quality: std::env::var("THUMBNAIL_QUALITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(80),
            undo_stack_limit: std::env::var("UNDO_STACK_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            retention_enabled: std::env::var("RETENTION_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            retention_interval_secs: std::env::var("RETENTION_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// 所有路径都放在同一目录下
    ///
    /// 常用于测试场景
    pub fn with_storage_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let mut config = Self::from_env();
        config.storage_path = dir.to_path_buf();
        config.temp_storage_path = dir.join("temp");
        config.database_path = dir.join("imagetools.db");
        config
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }

    /// Case-insensitive extension check (`"JPG"` and `".jpg"` both match `jpg`)
    pub fn is_extension_allowed(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        self.allowed_extensions.iter().any(|e| *e == ext)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn default_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}
