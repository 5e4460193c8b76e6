//! 应用配置模块

use crate::core::engine::DEFAULT_CHUNK_SIZE;
use crate::logging::LogConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// 默认区域
pub const DEFAULT_REGION: &str = "us-east-1";

/// 访问远端存储所需的连接信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileConfig {
    /// 区域，缺省 us-east-1
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// 兼容 S3 协议的自定义端点（MinIO 等）
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl ProfileConfig {
    pub fn region_name(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    /// 取出凭证；配置与环境变量都没有时报错
    pub fn credentials(&self) -> Result<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(access), Some(secret)) => Ok((access, secret)),
            _ => anyhow::bail!(
                "缺少访问凭证：请在配置文件或 AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY 中提供"
            ),
        }
    }
}

/// 同步参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    /// 分块大小（字节）。指纹分块与分块上传共用此值，
    /// 改动会使远端已有的复合 ETag 全部失配、触发整树重传
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    /// 最大并发上传数
    #[serde(default = "default_max_concurrent_uploads")]
    pub max_concurrent_uploads: usize,
    /// 无法识别扩展名时的内容类型
    #[serde(default = "default_content_type")]
    pub default_content_type: String,
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_max_concurrent_uploads() -> usize {
    4
}

fn default_content_type() -> String {
    "text/plain".to_string()
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_concurrent_uploads: default_max_concurrent_uploads(),
            default_content_type: default_content_type(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// 从配置文件加载；文件缺失时用默认值，环境变量兜底连接信息
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_path);

        let mut config: AppConfig = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("读取配置失败: {}", config_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("解析配置失败: {}", config_path.display()))?
        } else {
            AppConfig::default()
        };

        config.apply_env();

        // 0 是无效分块，回落到默认值
        if config.sync.chunk_size == 0 {
            config.sync.chunk_size = default_chunk_size();
        }
        if config.sync.max_concurrent_uploads == 0 {
            config.sync.max_concurrent_uploads = default_max_concurrent_uploads();
        }

        Ok(config)
    }

    /// 环境变量只在配置缺项时兜底
    fn apply_env(&mut self) {
        if self.profile.access_key_id.is_none() {
            self.profile.access_key_id = env::var("AWS_ACCESS_KEY_ID").ok();
        }
        if self.profile.secret_access_key.is_none() {
            self.profile.secret_access_key = env::var("AWS_SECRET_ACCESS_KEY").ok();
        }
        if self.profile.region.is_none() {
            self.profile.region = env::var("AWS_REGION").ok();
        }
        if self.profile.endpoint.is_none() {
            self.profile.endpoint = env::var("AWS_ENDPOINT_URL").ok();
        }
    }
}

/// 应用目录（配置与日志）
pub fn app_dir() -> PathBuf {
    crate::dirs::config_dir()
        .map(|p| p.join("websync"))
        .unwrap_or_else(|| PathBuf::from(".websync"))
}

fn default_config_path() -> PathBuf {
    app_dir().join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("nope.json"))).unwrap();
        assert_eq!(config.sync.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.sync.max_concurrent_uploads, 4);
        assert_eq!(config.sync.default_content_type, "text/plain");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"sync": {"chunkSize": 16}, "profile": {"region": "eu-west-1"}}"#)
            .unwrap();
        file.flush().unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.sync.chunk_size, 16);
        assert_eq!(config.sync.max_concurrent_uploads, 4);
        assert_eq!(config.profile.region_name(), "eu-west-1");
    }

    #[test]
    fn zero_chunk_size_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"sync": {"chunkSize": 0}}"#).unwrap();
        file.flush().unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.sync.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        file.flush().unwrap();
        assert!(AppConfig::load(Some(file.path())).is_err());
    }
}
