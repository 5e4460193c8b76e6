//! 差异引擎
//!
//! 本地指纹与清单条目逐字节比较，不做任何大小写折叠或修剪——
//! 指纹格式本身就是存储端的标签格式，规整反而会制造假差异。

use crate::core::manifest::Manifest;

/// 单个文件的同步决策
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// 需要上传
    Upload { reason: UploadReason },
    /// 内容未变，跳过
    Skip,
}

/// 上传原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadReason {
    /// 远端不存在该 key
    NewKey,
    /// 指纹不一致
    Changed,
    /// 空文件没有指纹，无从比较，总是重传
    EmptyFile,
}

/// 判定是否需要上传
pub fn needs_upload(manifest: &Manifest, key: &str, local_fingerprint: Option<&str>) -> bool {
    matches!(
        decide(manifest, key, local_fingerprint),
        SyncAction::Upload { .. }
    )
}

/// 给出带原因的同步决策
pub fn decide(manifest: &Manifest, key: &str, local_fingerprint: Option<&str>) -> SyncAction {
    let local = match local_fingerprint {
        Some(fingerprint) => fingerprint,
        None => {
            return SyncAction::Upload {
                reason: UploadReason::EmptyFile,
            }
        }
    };

    match manifest.fingerprint(key) {
        None => SyncAction::Upload {
            reason: UploadReason::NewKey,
        },
        Some(remote) if remote == local => SyncAction::Skip,
        Some(_) => SyncAction::Upload {
            reason: UploadReason::Changed,
        },
    }
}
