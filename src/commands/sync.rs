//! 同步命令

use crate::core::{SyncEngine, SyncReport};
use crate::AppContext;
use anyhow::Result;
use std::path::Path;
use std::sync::atomic::Ordering;
use tracing::warn;

/// 将本地目录同步到桶，打印并返回本次报告
pub async fn run_sync(ctx: &AppContext, pathname: &Path, bucket: &str) -> Result<SyncReport> {
    let store = ctx.object_store(bucket)?;
    let engine = SyncEngine::with_config(store, ctx.sync_config());

    // Ctrl-C 停止调度新文件，在途上传自行收尾
    let cancel = engine.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到中断信号，正在取消同步...");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let report = engine.sync(pathname).await?;

    println!(
        "同步完成: 扫描 {} 个文件, 上传 {}, 跳过 {}, 失败 {} ({} 字节)",
        report.files_scanned,
        report.files_uploaded,
        report.files_skipped,
        report.files_failed,
        report.bytes_transferred
    );
    for error in &report.errors {
        eprintln!("  失败: {}", error);
    }

    Ok(report)
}
