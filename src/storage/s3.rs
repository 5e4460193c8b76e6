use super::{ByteStream, ObjectStore, RemoteObject, IO_TIMEOUT_SECS, OP_TIMEOUT_SECS};
use anyhow::Result;
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use opendal::{layers::TimeoutLayer, Metakey, Operator};
use std::time::Duration;

/// 基于 opendal 的 S3 数据面实现，作用域为单个桶
pub struct S3Store {
    operator: Operator,
    name: String,
}

impl S3Store {
    pub fn new(
        bucket: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        endpoint: Option<String>,
    ) -> Result<Self> {
        use opendal::services::S3;

        let mut builder = S3::default()
            .bucket(bucket)
            .region(region)
            .access_key_id(access_key)
            .secret_access_key(secret_key);

        if let Some(ref ep) = endpoint {
            builder = builder.endpoint(ep);
        }

        // 添加超时层
        let operator = Operator::new(builder)?
            .layer(
                TimeoutLayer::default()
                    .with_timeout(Duration::from_secs(OP_TIMEOUT_SECS))
                    .with_io_timeout(Duration::from_secs(IO_TIMEOUT_SECS)),
            )
            .finish();

        Ok(Self {
            operator,
            name: format!("s3://{}", bucket),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_objects(&self) -> Result<Vec<RemoteObject>> {
        let mut objects = Vec::new();

        // lister 内部处理 continuation token，翻完所有分页
        let mut lister = self
            .operator
            .lister_with("")
            .recursive(true)
            .metakey(Metakey::ContentLength | Metakey::Etag)
            .await?;

        while let Some(entry) = lister.try_next().await? {
            let path = entry.path().to_string();

            if path.is_empty() || path == "/" {
                continue;
            }

            let meta = entry.metadata();
            if meta.is_dir() {
                continue;
            }

            objects.push(RemoteObject {
                key: path.trim_start_matches('/').to_string(),
                // ETag 保持原样（含引号），与本地指纹逐字节比较
                etag: meta.etag().map(|s| s.to_string()),
                size: meta.content_length(),
            });
        }

        Ok(objects)
    }

    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        self.operator
            .write_with(key, data)
            .content_type(content_type)
            .await?;
        Ok(())
    }

    async fn put_object_multipart(
        &self,
        key: &str,
        mut stream: ByteStream,
        content_type: &str,
        part_size: u64,
    ) -> Result<()> {
        // chunk 即分块上传的 part 大小
        let mut writer = self
            .operator
            .writer_with(key)
            .content_type(content_type)
            .chunk(part_size as usize)
            .await?;

        while let Some(chunk) = stream.next().await {
            writer.write(chunk?).await?;
        }
        writer.close().await?;

        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
