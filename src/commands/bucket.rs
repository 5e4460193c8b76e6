//! 桶管理命令 - 每个命令都是一次性的 API 编排

use crate::storage::admin::{ERROR_DOCUMENT, INDEX_DOCUMENT};
use crate::storage::ObjectStore;
use crate::AppContext;
use anyhow::Result;

/// 列出账号下所有桶
pub async fn list_buckets(ctx: &AppContext) -> Result<()> {
    let admin = ctx.bucket_admin()?;
    for bucket in admin.list_buckets().await? {
        println!("{}", bucket);
    }
    Ok(())
}

/// 列出桶内所有对象
pub async fn list_bucket_objects(ctx: &AppContext, bucket: &str) -> Result<()> {
    let store = ctx.object_store(bucket)?;
    for obj in store.list_objects().await? {
        println!(
            "{:>12}  {:<38}  {}",
            obj.size,
            obj.etag.as_deref().unwrap_or("-"),
            obj.key
        );
    }
    Ok(())
}

/// 创建桶并配置为静态网站托管
pub async fn setup_bucket(ctx: &AppContext, bucket: &str) -> Result<()> {
    let admin = ctx.bucket_admin()?;

    admin.create_bucket(bucket).await?;
    admin.allow_public_read(bucket).await?;
    admin.configure_website(bucket).await?;

    println!(
        "桶 {} 已配置为静态网站托管 ({} / {})",
        bucket, INDEX_DOCUMENT, ERROR_DOCUMENT
    );
    println!("{}", admin.website_url(bucket));
    Ok(())
}
