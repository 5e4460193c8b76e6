pub mod admin;
pub mod memory;
pub mod s3;

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

pub use admin::BucketAdmin;
pub use memory::MemoryStore;
pub use s3::S3Store;

// ============ 公共常量 ============

/// 非 IO 操作超时（秒）- list 等
pub const OP_TIMEOUT_SECS: u64 = 60;
/// IO 操作超时（秒）- read, write 等
pub const IO_TIMEOUT_SECS: u64 = 300;

/// 分块字节流（用于分块上传）
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<bytes::Bytes>> + Send>>;

/// 远端对象信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteObject {
    pub key: String,
    /// 实体标签，保持存储端返回的原样（含引号），不做任何改写
    pub etag: Option<String>,
    pub size: u64,
}

/// 对象存储抽象接口，作用域为单个容器（桶）
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 列出容器内所有对象。实现负责翻完所有分页再返回，
    /// 对调用方来说这是一次逻辑操作
    async fn list_objects(&self) -> Result<Vec<RemoteObject>>;

    /// 单次上传整个对象
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()>;

    /// 分块上传。part_size 必须与指纹分块大小一致，
    /// 否则存储端按自己的 part 边界算出的标签与本地指纹不可比
    async fn put_object_multipart(
        &self,
        key: &str,
        stream: ByteStream,
        content_type: &str,
        part_size: u64,
    ) -> Result<()>;

    /// 存储名称（用于日志和报告）
    fn name(&self) -> &str;
}
