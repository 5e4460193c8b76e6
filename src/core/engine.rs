//! 同步引擎 - 驱动扫描、指纹、差异判定与上传
//!
//! 清单只在开头加载一次，之后只读共享；每个文件的指纹计算与上传
//! 相互独立，由有界并发池调度。单个文件失败只记账，不中断整轮。

use crate::core::comparator::{self, SyncAction};
use crate::core::hasher;
use crate::core::manifest::Manifest;
use crate::core::scanner::{FileScanner, LocalFile, ScanConfig};
use crate::error::SyncError;
use crate::storage::{ByteStream, ObjectStore};
use anyhow::Result;
use bytes::Bytes;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, info, warn};

/// 默认分块大小（8 MiB）
///
/// 同时是指纹分块、分块上传阈值与 part 大小，三者必须一致，
/// 否则本地指纹与存储端标签不可比。
pub const DEFAULT_CHUNK_SIZE: u64 = 8 * 1024 * 1024;

/// 同步配置
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// 最大并发上传数
    pub max_concurrent_uploads: usize,
    /// 分块大小（字节），见 [`DEFAULT_CHUNK_SIZE`]
    pub chunk_size: u64,
    /// 无法识别扩展名时的内容类型
    pub default_content_type: String,
    /// 扫描配置
    pub scan_config: ScanConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent_uploads: 4,
            chunk_size: DEFAULT_CHUNK_SIZE,
            default_content_type: "text/plain".to_string(),
            scan_config: ScanConfig::default(),
        }
    }
}

/// 同步报告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub container: String,
    pub start_time: i64,
    pub end_time: i64,
    pub files_scanned: u32,
    pub files_uploaded: u32,
    pub files_skipped: u32,
    pub files_failed: u32,
    pub bytes_transferred: u64,
    pub duration: u64,
    pub errors: Vec<String>,
}

/// 传输统计
#[derive(Debug, Default)]
struct TransferStats {
    files_uploaded: AtomicU64,
    files_skipped: AtomicU64,
    files_failed: AtomicU64,
    bytes_transferred: AtomicU64,
}

/// 单个文件的处理结果
enum FileOutcome {
    Uploaded(u64),
    Skipped,
}

/// 同步引擎
pub struct SyncEngine {
    store: Arc<dyn ObjectStore>,
    config: SyncConfig,
    cancelled: Arc<AtomicBool>,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_config(store, SyncConfig::default())
    }

    pub fn with_config(store: Arc<dyn ObjectStore>, config: SyncConfig) -> Self {
        Self {
            store,
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 取消同步：不再调度新文件，在途上传自行完成或失败，
    /// 已完成的上传不回滚
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// 取消标志（供信号处理等外部持有）
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// 将 root 下的文件树同步到容器，返回本次报告
    ///
    /// 只有清单加载失败（或 root 不可达）会中止整个操作；
    /// 单个文件的失败只记录，并在报告中汇总。
    pub async fn sync(&self, root: &Path) -> Result<SyncReport> {
        let start_time = chrono::Utc::now().timestamp();
        self.cancelled.store(false, Ordering::SeqCst);

        info!("开始同步: {} -> {}", root.display(), self.store.name());

        // 每次同步只做一次完整列举，之后清单只读
        let manifest = Arc::new(Manifest::load(self.store.as_ref()).await?);

        let scanner = FileScanner::with_config(self.config.scan_config.clone());
        let files = scanner.scan(root)?;
        let files_scanned = files.len() as u32;
        debug!(
            "扫描完成: 本地 {} 个文件, 清单 {} 个对象",
            files_scanned,
            manifest.len()
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_uploads));
        let stats = Arc::new(TransferStats::default());
        let errors = Arc::new(RwLock::new(Vec::<String>::new()));

        let mut handles = Vec::new();
        for file in files {
            if self.cancelled.load(Ordering::SeqCst) {
                warn!("同步已取消，剩余文件不再调度");
                break;
            }

            let permit = semaphore.clone().acquire_owned().await?;
            let store = self.store.clone();
            let manifest = manifest.clone();
            let stats = stats.clone();
            let errors = errors.clone();
            let chunk_size = self.config.chunk_size;
            let default_content_type = self.config.default_content_type.clone();

            let handle = tokio::spawn(async move {
                let result =
                    sync_file(store.as_ref(), &manifest, &file, chunk_size, &default_content_type)
                        .await;

                match result {
                    Ok(FileOutcome::Uploaded(bytes)) => {
                        stats.files_uploaded.fetch_add(1, Ordering::Relaxed);
                        stats.bytes_transferred.fetch_add(bytes, Ordering::Relaxed);
                    }
                    Ok(FileOutcome::Skipped) => {
                        stats.files_skipped.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        stats.files_failed.fetch_add(1, Ordering::Relaxed);
                        warn!("文件同步失败: {}", e);
                        errors.write().await.push(e.to_string());
                    }
                }

                drop(permit);
            });
            handles.push(handle);
        }

        for handle in handles {
            let _ = handle.await;
        }

        let end_time = chrono::Utc::now().timestamp();
        let errors = errors.read().await.clone();

        let report = SyncReport {
            container: self.store.name().to_string(),
            start_time,
            end_time,
            files_scanned,
            files_uploaded: stats.files_uploaded.load(Ordering::Relaxed) as u32,
            files_skipped: stats.files_skipped.load(Ordering::Relaxed) as u32,
            files_failed: stats.files_failed.load(Ordering::Relaxed) as u32,
            bytes_transferred: stats.bytes_transferred.load(Ordering::Relaxed),
            duration: (end_time - start_time) as u64,
            errors,
        };

        info!(
            "同步完成: {} - 上传 {}, 跳过 {}, 失败 {}",
            report.container, report.files_uploaded, report.files_skipped, report.files_failed
        );
        Ok(report)
    }
}

/// 处理单个文件：指纹 -> 差异判定 -> 上传
async fn sync_file(
    store: &dyn ObjectStore,
    manifest: &Manifest,
    file: &LocalFile,
    chunk_size: u64,
    default_content_type: &str,
) -> Result<FileOutcome, SyncError> {
    // 指纹计算是阻塞 IO 加纯 CPU，放到阻塞线程池
    let path = file.path.clone();
    let fingerprint =
        tokio::task::spawn_blocking(move || hasher::fingerprint_file(&path, chunk_size))
            .await
            .map_err(|e| SyncError::Hash {
                key: file.key.clone(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e),
            })?
            .map_err(|e| SyncError::Hash {
                key: file.key.clone(),
                source: e,
            })?;

    match comparator::decide(manifest, &file.key, fingerprint.as_deref()) {
        SyncAction::Skip => {
            debug!("内容未变，跳过: {}", file.key);
            return Ok(FileOutcome::Skipped);
        }
        SyncAction::Upload { reason } => {
            debug!("需要上传: {} ({:?})", file.key, reason);
        }
    }

    let content_type = content_type_for(&file.key, default_content_type);

    if file.size > chunk_size {
        // part 大小与指纹分块一致，存储端算出的标签才与指纹可比
        let stream = chunk_stream(file.path.clone(), chunk_size);
        store
            .put_object_multipart(&file.key, stream, content_type, chunk_size)
            .await
            .map_err(|e| SyncError::Upload {
                key: file.key.clone(),
                cause: e,
            })?;
    } else {
        let data = tokio::fs::read(&file.path)
            .await
            .map_err(|e| SyncError::Hash {
                key: file.key.clone(),
                source: e,
            })?;
        store
            .put_object(&file.key, data, content_type)
            .await
            .map_err(|e| SyncError::Upload {
                key: file.key.clone(),
                cause: e,
            })?;
    }

    debug!(
        "上传完成: {} ({} 字节, {})",
        file.key, file.size, content_type
    );
    Ok(FileOutcome::Uploaded(file.size))
}

/// 根据扩展名解析内容类型
fn content_type_for<'a>(key: &str, default: &'a str) -> &'a str {
    mime_guess::from_path(key).first_raw().unwrap_or(default)
}

enum StreamState {
    Start(PathBuf),
    Reading(tokio::fs::File),
    Done,
}

/// 以 part 为单位读取文件的字节流（不把整个文件读进内存）
fn chunk_stream(path: PathBuf, part_size: u64) -> ByteStream {
    Box::pin(futures::stream::unfold(
        StreamState::Start(path),
        move |state| async move {
            let mut file = match state {
                StreamState::Start(path) => match tokio::fs::File::open(&path).await {
                    Ok(file) => file,
                    Err(e) => return Some((Err(e.into()), StreamState::Done)),
                },
                StreamState::Reading(file) => file,
                StreamState::Done => return None,
            };

            let mut buf = vec![0u8; part_size as usize];
            let mut filled = 0usize;
            while filled < buf.len() {
                match file.read(&mut buf[filled..]).await {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(e) => return Some((Err(e.into()), StreamState::Done)),
                }
            }

            if filled == 0 {
                return None;
            }
            buf.truncate(filled);
            Some((Ok(Bytes::from(buf)), StreamState::Reading(file)))
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_resolve() {
        assert_eq!(content_type_for("index.html", "text/plain"), "text/html");
        assert_eq!(content_type_for("css/site.css", "text/plain"), "text/css");
        assert_eq!(content_type_for("logo.png", "text/plain"), "image/png");
    }

    #[test]
    fn unknown_extension_falls_back_to_default() {
        assert_eq!(content_type_for("README", "text/plain"), "text/plain");
        assert_eq!(content_type_for("data.zz9", "text/plain"), "text/plain");
    }

    #[tokio::test]
    async fn chunk_stream_respects_part_boundaries() {
        use futures::StreamExt;
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x5au8; 20]).unwrap();
        file.flush().unwrap();

        let mut stream = chunk_stream(file.path().to_path_buf(), 8);
        let mut sizes = Vec::new();
        while let Some(chunk) = stream.next().await {
            sizes.push(chunk.unwrap().len());
        }
        assert_eq!(sizes, vec![8, 8, 4]);
    }
}
