//! 本地文件扫描器
//!
//! 基于 walkdir 的惰性迭代遍历（不自递归，深树不会爆栈）。
//! 不可读条目与符号链接按策略跳过，残缺的树仍然同步可读的部分。

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// 一个待同步的本地文件
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub path: PathBuf,
    /// 相对 root 的 key，统一使用 / 分隔，与宿主平台无关
    pub key: String,
    pub size: u64,
}

/// 扫描器配置
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// 是否跟随符号链接（默认不跟随，链接直接跳过）
    pub follow_symlinks: bool,
    /// 排除规则（glob patterns，作用于相对 key）
    pub exclude_patterns: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            exclude_patterns: vec![
                // 常见的排除模式
                ".git/**".to_string(),
                ".svn/**".to_string(),
                "node_modules/**".to_string(),
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                "*.tmp".to_string(),
                "~*".to_string(),
            ],
        }
    }
}

/// 文件扫描器
pub struct FileScanner {
    config: ScanConfig,
}

impl FileScanner {
    pub fn new() -> Self {
        Self {
            config: ScanConfig::default(),
        }
    }

    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }

    /// 递归枚举 root 下所有常规文件
    ///
    /// root 本身不可达是错误（没有可同步的东西）；单个条目不可读
    /// 只告警并继续。兄弟条目的顺序不保证稳定。
    pub fn scan(&self, root: &Path) -> Result<Vec<LocalFile>> {
        let root = root
            .canonicalize()
            .with_context(|| format!("无法访问同步根目录: {}", root.display()))?;

        let mut files = Vec::new();
        let mut skipped = 0usize;
        let mut excluded = 0usize;

        for entry in WalkDir::new(&root).follow_links(self.config.follow_symlinks) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("跳过不可读条目: {}", e);
                    skipped += 1;
                    continue;
                }
            };

            // 目录本身不产生 key；未跟随的符号链接也在这里被滤掉
            if !entry.file_type().is_file() {
                continue;
            }

            let rel = match entry.path().strip_prefix(&root) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            let Some(rel_str) = rel.to_str() else {
                warn!("跳过非 UTF-8 路径: {}", entry.path().display());
                skipped += 1;
                continue;
            };
            let key = normalize_key(rel_str);

            if self.should_exclude(&key) {
                debug!("排除文件: {}", key);
                excluded += 1;
                continue;
            }

            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(e) => {
                    warn!("跳过无法读取元数据的文件: {} ({})", key, e);
                    skipped += 1;
                    continue;
                }
            };

            files.push(LocalFile {
                path: entry.into_path(),
                key,
                size,
            });
        }

        debug!(
            "扫描完成: {} 个文件, {} 个被排除, {} 个无法读取",
            files.len(),
            excluded,
            skipped
        );
        Ok(files)
    }

    fn should_exclude(&self, key: &str) -> bool {
        self.config
            .exclude_patterns
            .iter()
            .any(|pattern| matches_pattern(key, pattern))
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// 统一路径分隔符（统一使用 /）
fn normalize_key(path: &str) -> String {
    path.replace('\\', "/")
}

/// 简单的 glob 模式匹配
fn matches_pattern(path: &str, pattern: &str) -> bool {
    let path = path.to_lowercase();
    let pattern = pattern.to_lowercase();

    // 处理 ** 通配符
    if let Some((prefix, suffix)) = pattern.split_once("**") {
        let prefix = prefix.trim_end_matches('/');
        let suffix = suffix.trim_start_matches('/');
        return (prefix.is_empty() || path.starts_with(prefix))
            && (suffix.is_empty() || path.ends_with(suffix));
    }

    // 处理 * 通配符
    if pattern.contains('*') {
        let regex_pattern = pattern.replace('.', "\\.").replace('*', ".*");
        if let Ok(re) = regex::Regex::new(&format!("^{}$", regex_pattern)) {
            return re.is_match(&path);
        }
    }

    // 精确匹配
    path == pattern || path.ends_with(&format!("/{}", pattern))
}
