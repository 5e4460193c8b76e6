//! 同步引擎端到端测试：内存存储加临时目录

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use websync::core::hasher;
use websync::core::{SyncConfig, SyncEngine};
use websync::storage::MemoryStore;

/// 测试用小分块，方便构造多块文件
const CHUNK: u64 = 8;

fn toy_config() -> SyncConfig {
    SyncConfig {
        chunk_size: CHUNK,
        ..Default::default()
    }
}

fn engine_for(store: &Arc<MemoryStore>) -> SyncEngine {
    SyncEngine::with_config(store.clone(), toy_config())
}

fn write_file(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[tokio::test]
async fn first_sync_uploads_everything() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "index.html", b"<html></html>");
    write_file(dir.path(), "css/site.css", b"body {}");

    let store = Arc::new(MemoryStore::new("site"));
    let report = engine_for(&store).sync(dir.path()).await.unwrap();

    assert_eq!(report.files_scanned, 2);
    assert_eq!(report.files_uploaded, 2);
    assert_eq!(report.files_failed, 0);
    assert_eq!(store.object_count(), 2);
    // key 使用 / 分隔
    assert!(store.etag_of("css/site.css").is_some());
}

#[tokio::test]
async fn second_sync_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "index.html", b"<html></html>");
    write_file(dir.path(), "blog/post.html", b"<p>hi</p>");

    let store = Arc::new(MemoryStore::new("site"));
    engine_for(&store).sync(dir.path()).await.unwrap();

    let report = engine_for(&store).sync(dir.path()).await.unwrap();
    assert_eq!(report.files_uploaded, 0);
    assert_eq!(report.files_skipped, 2);
    assert_eq!(report.files_failed, 0);
}

#[tokio::test]
async fn single_byte_change_reuploads_only_that_key() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.txt", b"aaaa");
    write_file(dir.path(), "b.txt", b"bbbb");
    write_file(dir.path(), "c.txt", b"cccc");

    let store = Arc::new(MemoryStore::new("site"));
    engine_for(&store).sync(dir.path()).await.unwrap();

    let before = store.etag_of("b.txt").unwrap();
    write_file(dir.path(), "a.txt", b"aaab");

    let report = engine_for(&store).sync(dir.path()).await.unwrap();
    assert_eq!(report.files_uploaded, 1);
    assert_eq!(report.files_skipped, 2);
    assert_eq!(store.data_of("a.txt").unwrap(), b"aaab");
    // 未改动的 key 不被触碰
    assert_eq!(store.etag_of("b.txt").unwrap(), before);
}

#[tokio::test]
async fn empty_file_is_always_reuploaded() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "empty.txt", b"");

    let store = Arc::new(MemoryStore::new("site"));
    let first = engine_for(&store).sync(dir.path()).await.unwrap();
    assert_eq!(first.files_uploaded, 1);

    // 空文件没有指纹，无从比较，每轮都重传
    let second = engine_for(&store).sync(dir.path()).await.unwrap();
    assert_eq!(second.files_uploaded, 1);
    assert_eq!(second.files_skipped, 0);
}

#[tokio::test]
async fn multipart_etag_round_trips() {
    let dir = TempDir::new().unwrap();
    // 20 字节、块大小 8 -> 3 块复合指纹
    let content: Vec<u8> = (0u8..20).collect();
    write_file(dir.path(), "big.bin", &content);

    let store = Arc::new(MemoryStore::new("site"));
    engine_for(&store).sync(dir.path()).await.unwrap();

    let remote = store.etag_of("big.bin").unwrap();
    assert!(remote.ends_with("-3\""));

    // 本地指纹与存储端按相同 part 边界算出的标签一致
    let local = hasher::fingerprint_file(&dir.path().join("big.bin"), CHUNK)
        .unwrap()
        .unwrap();
    assert_eq!(local, remote);

    // 因此第二轮必然跳过
    let report = engine_for(&store).sync(dir.path()).await.unwrap();
    assert_eq!(report.files_uploaded, 0);
    assert_eq!(report.files_skipped, 1);
}

#[tokio::test]
async fn manifest_isolation_between_containers() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "index.html", b"<html>v1</html>");

    let store_a = Arc::new(MemoryStore::new("a"));
    let store_b = Arc::new(MemoryStore::new("b"));

    // 容器 a 已是最新；容器 b 同 key 存的是别的内容
    engine_for(&store_a).sync(dir.path()).await.unwrap();
    {
        use websync::storage::ObjectStore;
        store_b
            .put_object("index.html", b"<html>stale</html>".to_vec(), "text/html")
            .await
            .unwrap();
    }

    let report_a = engine_for(&store_a).sync(dir.path()).await.unwrap();
    assert_eq!(report_a.files_uploaded, 0);

    // a 的清单不影响 b 的判定
    let report_b = engine_for(&store_b).sync(dir.path()).await.unwrap();
    assert_eq!(report_b.files_uploaded, 1);
    assert_eq!(store_b.data_of("index.html").unwrap(), b"<html>v1</html>");
}

#[tokio::test]
async fn upload_failure_does_not_abort_the_pass() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.txt", b"aaaa");
    write_file(dir.path(), "b.txt", b"bbbb");
    write_file(dir.path(), "c.txt", b"cccc");

    let store = Arc::new(MemoryStore::new("site"));
    store.fail_put("b.txt");

    let report = engine_for(&store).sync(dir.path()).await.unwrap();
    assert_eq!(report.files_uploaded, 2);
    assert_eq!(report.files_failed, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("b.txt"));
    // 其余文件照常落盘
    assert!(store.etag_of("a.txt").is_some());
    assert!(store.etag_of("c.txt").is_some());
}

#[tokio::test]
async fn listing_failure_aborts_before_any_upload() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "index.html", b"<html></html>");

    let store = Arc::new(MemoryStore::new("site"));
    store.fail_listing();

    let result = engine_for(&store).sync(dir.path()).await;
    assert!(result.is_err());
    assert_eq!(store.object_count(), 0);
}

#[tokio::test]
async fn content_type_follows_extension() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "index.html", b"<html></html>");
    write_file(dir.path(), "notes.zz9", b"???");

    let store = Arc::new(MemoryStore::new("site"));
    engine_for(&store).sync(dir.path()).await.unwrap();

    assert_eq!(
        store.content_type_of("index.html").as_deref(),
        Some("text/html")
    );
    // 未识别的扩展名回落到默认类型
    assert_eq!(
        store.content_type_of("notes.zz9").as_deref(),
        Some("text/plain")
    );
}

#[tokio::test]
async fn mixed_tree_with_nested_dirs() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "index.html", b"<html></html>");
    write_file(dir.path(), "img/a/b/c/deep.png", b"\x89PNG fake");
    let big: Vec<u8> = std::iter::repeat(0xf0u8).take(30).collect();
    write_file(dir.path(), "assets/site.js", &big);

    let store = Arc::new(MemoryStore::new("site"));
    let report = engine_for(&store).sync(dir.path()).await.unwrap();

    assert_eq!(report.files_uploaded, 3);
    assert_eq!(report.bytes_transferred, 13 + 9 + 30);
    // 30 字节 > 8 走分块路径，复合标签
    assert!(store.etag_of("assets/site.js").unwrap().ends_with("-4\""));
    assert!(store.etag_of("img/a/b/c/deep.png").is_some());

    let again = engine_for(&store).sync(dir.path()).await.unwrap();
    assert_eq!(again.files_uploaded, 0);
    assert_eq!(again.files_skipped, 3);
}
