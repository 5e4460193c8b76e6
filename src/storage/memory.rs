//! 内存对象存储 - 测试替身
//!
//! 按与 S3 相同的约定计算存储端 ETag，分块上传按自己的 part 边界
//! 重新分块，因此能端到端验证指纹与远端标签的兼容性。
//! 支持故障注入：整体列举失败、指定 key 上传失败。

use super::{ByteStream, ObjectStore, RemoteObject};
use crate::core::hasher;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    etag: Option<String>,
    content_type: String,
}

/// 基于 RwLock<HashMap> 的内存存储
pub struct MemoryStore {
    name: String,
    objects: RwLock<HashMap<String, StoredObject>>,
    /// 列举分页大小，模拟远端的 continuation 行为
    page_size: usize,
    fail_listing: AtomicBool,
    fail_puts: RwLock<HashSet<String>>,
}

impl MemoryStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: format!("memory://{}", name),
            objects: RwLock::new(HashMap::new()),
            page_size: 1000,
            fail_listing: AtomicBool::new(false),
            fail_puts: RwLock::new(HashSet::new()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// 注入：之后的列举全部失败
    pub fn fail_listing(&self) {
        self.fail_listing.store(true, Ordering::SeqCst);
    }

    /// 注入：指定 key 的上传失败
    pub fn fail_put(&self, key: &str) {
        self.fail_puts
            .write()
            .expect("lock poisoned")
            .insert(key.to_string());
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn etag_of(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(key)
            .and_then(|o| o.etag.clone())
    }

    pub fn content_type_of(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(key)
            .map(|o| o.content_type.clone())
    }

    pub fn data_of(&self, key: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(key)
            .map(|o| o.data.clone())
    }

    fn check_put(&self, key: &str) -> Result<()> {
        if self
            .fail_puts
            .read()
            .expect("lock poisoned")
            .contains(key)
        {
            return Err(anyhow!("injected put failure: {}", key));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(&self) -> Result<Vec<RemoteObject>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(anyhow!("injected listing failure"));
        }

        let map = self.objects.read().expect("lock poisoned");
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();

        // 逐页聚合，直到翻完
        let mut objects = Vec::with_capacity(keys.len());
        let mut cursor = 0usize;
        loop {
            let page = &keys[cursor..(cursor + self.page_size).min(keys.len())];
            if page.is_empty() {
                break;
            }
            for key in page {
                let obj = &map[*key];
                objects.push(RemoteObject {
                    key: (*key).clone(),
                    etag: obj.etag.clone(),
                    size: obj.data.len() as u64,
                });
            }
            cursor += page.len();
        }

        Ok(objects)
    }

    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        self.check_put(key)?;

        // 单次上传的 ETag 是整体内容的 md5
        let etag = hasher::etag_for_bytes(&data, data.len().max(1) as u64);
        self.objects.write().expect("lock poisoned").insert(
            key.to_string(),
            StoredObject {
                data,
                etag,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn put_object_multipart(
        &self,
        key: &str,
        mut stream: ByteStream,
        content_type: &str,
        part_size: u64,
    ) -> Result<()> {
        self.check_put(key)?;

        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }

        // 远端按自己的 part 边界计算复合 ETag
        let etag = hasher::etag_for_bytes(&data, part_size);
        self.objects.write().expect("lock poisoned").insert(
            key.to_string(),
            StoredObject {
                data,
                etag,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_list_roundtrip() {
        let store = MemoryStore::new("t");
        store
            .put_object("a.txt", b"hello".to_vec(), "text/plain")
            .await
            .unwrap();

        let objects = store.list_objects().await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, "a.txt");
        assert_eq!(objects[0].size, 5);
        // 单次上传 ETag 为整体 md5
        assert_eq!(
            objects[0].etag.as_deref(),
            Some("\"5d41402abc4b2a76b9719d911017c592\"")
        );
    }

    #[tokio::test]
    async fn listing_aggregates_all_pages() {
        let store = MemoryStore::new("t").with_page_size(2);
        for i in 0..5 {
            store
                .put_object(&format!("k{}", i), vec![i as u8], "text/plain")
                .await
                .unwrap();
        }
        let objects = store.list_objects().await.unwrap();
        assert_eq!(objects.len(), 5);
    }

    #[tokio::test]
    async fn injected_listing_failure() {
        let store = MemoryStore::new("t");
        store.fail_listing();
        assert!(store.list_objects().await.is_err());
    }

    #[tokio::test]
    async fn injected_put_failure_is_per_key() {
        let store = MemoryStore::new("t");
        store.fail_put("bad.txt");
        assert!(store
            .put_object("bad.txt", vec![1], "text/plain")
            .await
            .is_err());
        assert!(store
            .put_object("good.txt", vec![1], "text/plain")
            .await
            .is_ok());
    }
}
