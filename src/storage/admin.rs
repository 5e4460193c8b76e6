//! 桶管理控制面 - 一次性 API 编排，不参与同步核心
//!
//! opendal 只建模数据面，列桶/建桶/网站配置这类控制面调用走官方 SDK。

use anyhow::{Context, Result};
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, ErrorDocument, IndexDocument,
    WebsiteConfiguration,
};
use tracing::info;

/// 静态网站首页文档
pub const INDEX_DOCUMENT: &str = "index.html";
/// 静态网站错误页文档
pub const ERROR_DOCUMENT: &str = "error.html";

/// 桶管理客户端
pub struct BucketAdmin {
    client: aws_sdk_s3::Client,
    region: String,
}

impl BucketAdmin {
    pub fn new(region: &str, access_key: &str, secret_key: &str, endpoint: Option<String>) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "websync");

        let mut config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            // 自定义端点（MinIO 等）一般要求 path-style
            .force_path_style(endpoint.is_some());

        if let Some(ep) = endpoint {
            config = config.endpoint_url(ep);
        }

        Self {
            client: aws_sdk_s3::Client::from_conf(config.build()),
            region: region.to_string(),
        }
    }

    /// 列出账号下所有桶名
    pub async fn list_buckets(&self) -> Result<Vec<String>> {
        let resp = self
            .client
            .list_buckets()
            .send()
            .await
            .context("列举桶失败")?;

        Ok(resp
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect())
    }

    /// 创建桶；桶已属于自己时视为成功
    pub async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(bucket);

        // us-east-1 不接受 LocationConstraint
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                info!("桶已创建: {}", bucket);
                Ok(())
            }
            Err(err) => {
                let already_owned = err
                    .as_service_error()
                    .map(|e| e.is_bucket_already_owned_by_you())
                    .unwrap_or(false);
                if already_owned {
                    info!("桶已存在: {}", bucket);
                    Ok(())
                } else {
                    Err(anyhow::Error::from(err).context(format!("创建桶失败: {}", bucket)))
                }
            }
        }
    }

    /// 设置公开只读策略
    pub async fn allow_public_read(&self, bucket: &str) -> Result<()> {
        let policy = format!(
            r#"{{
    "Version": "2012-10-17",
    "Statement": [{{
        "Sid": "PublicReadForGetBucketObjects",
        "Effect": "Allow",
        "Principal": "*",
        "Action": ["s3:GetObject"],
        "Resource": ["arn:aws:s3:::{}/*"]
    }}]
}}"#,
            bucket
        );

        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .context("设置桶策略失败")?;
        Ok(())
    }

    /// 开启静态网站托管
    pub async fn configure_website(&self, bucket: &str) -> Result<()> {
        let website = WebsiteConfiguration::builder()
            .index_document(IndexDocument::builder().suffix(INDEX_DOCUMENT).build()?)
            .error_document(ErrorDocument::builder().key(ERROR_DOCUMENT).build()?)
            .build();

        self.client
            .put_bucket_website()
            .bucket(bucket)
            .website_configuration(website)
            .send()
            .await
            .context("配置静态网站失败")?;

        info!("静态网站托管已开启: {}", bucket);
        Ok(())
    }

    /// 静态网站访问地址
    pub fn website_url(&self, bucket: &str) -> String {
        format!("http://{}.s3-website-{}.amazonaws.com", bucket, self.region)
    }
}
