use std::sync::Arc;

pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod storage;

pub use self::config::AppConfig;
pub use self::core::{SyncConfig, SyncEngine, SyncReport};
pub use self::error::SyncError;

use anyhow::Result;
use storage::{BucketAdmin, ObjectStore, S3Store};

/// 应用上下文：显式传入各命令，取代进程级全局会话
#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// 构建指向某个桶的数据面存储
    pub fn object_store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        let profile = &self.config.profile;
        let (access_key, secret_key) = profile.credentials()?;
        let store = S3Store::new(
            bucket,
            profile.region_name(),
            access_key,
            secret_key,
            profile.endpoint.clone(),
        )?;
        Ok(Arc::new(store))
    }

    /// 构建控制面管理客户端
    pub fn bucket_admin(&self) -> Result<BucketAdmin> {
        let profile = &self.config.profile;
        let (access_key, secret_key) = profile.credentials()?;
        Ok(BucketAdmin::new(
            profile.region_name(),
            access_key,
            secret_key,
            profile.endpoint.clone(),
        ))
    }

    /// 由配置生成同步引擎参数
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            max_concurrent_uploads: self.config.sync.max_concurrent_uploads,
            chunk_size: self.config.sync.chunk_size,
            default_content_type: self.config.sync.default_content_type.clone(),
            scan_config: Default::default(),
        }
    }
}

/// 跨平台配置目录
pub mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
        } else {
            // Linux
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        }
    }
}
