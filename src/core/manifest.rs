//! 远端清单缓存
//!
//! 每次同步开始时对容器做一次完整列举，聚合成 key -> ETag 映射，
//! 本次同步期间只读，结束后丢弃。加载一次、按 key 查询，
//! 避免每个候选文件一次远端往返。

use crate::error::SyncError;
use crate::storage::ObjectStore;
use std::collections::HashMap;
use tracing::{debug, info};

/// 容器某一时刻的对象指纹快照
#[derive(Debug, Default)]
pub struct Manifest {
    container: String,
    entries: HashMap<String, String>,
}

impl Manifest {
    /// 加载容器清单
    ///
    /// 任何列举失败都会中止整次同步——半份清单会把"远端已有"误判成
    /// "远端缺失"的反面：该传的不传。
    pub async fn load(store: &dyn ObjectStore) -> Result<Manifest, SyncError> {
        let objects = store
            .list_objects()
            .await
            .map_err(|e| SyncError::ManifestLoad {
                container: store.name().to_string(),
                cause: e,
            })?;

        let mut entries = HashMap::new();
        let mut missing_etag = 0usize;
        for obj in objects {
            match obj.etag {
                // ETag 保持存储端返回的原样入表
                Some(etag) => {
                    entries.insert(obj.key, etag);
                }
                // 无 ETag 的对象视为未知，对应文件下次必然重传
                None => missing_etag += 1,
            }
        }

        if missing_etag > 0 {
            debug!("{} 个对象缺少 ETag，未入清单", missing_etag);
        }
        info!("清单加载完成: {} ({} 个对象)", store.name(), entries.len());

        Ok(Manifest {
            container: store.name().to_string(),
            entries,
        })
    }

    /// 直接由映射构建清单（测试与上层组合用）
    pub fn from_entries(container: impl Into<String>, entries: HashMap<String, String>) -> Self {
        Manifest {
            container: container.into(),
            entries,
        }
    }

    /// 某个 key 的远端指纹
    pub fn fingerprint(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, ObjectStore};

    #[tokio::test]
    async fn load_aggregates_every_page() {
        let store = MemoryStore::new("paged").with_page_size(2);
        for i in 0..7 {
            store
                .put_object(&format!("k{}", i), vec![i as u8], "text/plain")
                .await
                .unwrap();
        }

        let manifest = Manifest::load(&store).await.unwrap();
        assert_eq!(manifest.len(), 7);
        assert!(manifest.fingerprint("k3").is_some());
    }

    #[tokio::test]
    async fn listing_failure_aborts_load() {
        let store = MemoryStore::new("broken");
        store.fail_listing();

        let err = Manifest::load(&store).await.unwrap_err();
        assert!(matches!(err, SyncError::ManifestLoad { .. }));
    }

    #[tokio::test]
    async fn empty_container_gives_empty_manifest() {
        let store = MemoryStore::new("empty");
        let manifest = Manifest::load(&store).await.unwrap();
        assert!(manifest.is_empty());
    }
}
