//! 同步核心错误类型

use thiserror::Error;

/// 同步过程中的错误
///
/// 只有清单加载失败会中止整次同步；Hash/Upload 都是单文件级别，
/// 由引擎累计后在报告中汇总。
#[derive(Debug, Error)]
pub enum SyncError {
    /// 清单加载失败（列举或分页出错），整次同步中止，不尝试任何上传
    #[error("manifest load failed for {container}: {cause}")]
    ManifestLoad {
        container: String,
        cause: anyhow::Error,
    },

    /// 本地文件读取失败，仅该文件记为失败，扫描继续
    #[error("hash failed for {key}: {source}")]
    Hash {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// 上传传输失败（网络/权限/配额），仅该文件记为失败，扫描继续。
    /// 核心不做重试，重试属于传输层
    #[error("upload failed for {key}: {cause}")]
    Upload { key: String, cause: anyhow::Error },
}

impl SyncError {
    /// 失败文件对应的 key（清单级错误没有）
    pub fn key(&self) -> Option<&str> {
        match self {
            SyncError::ManifestLoad { .. } => None,
            SyncError::Hash { key, .. } | SyncError::Upload { key, .. } => Some(key),
        }
    }
}
