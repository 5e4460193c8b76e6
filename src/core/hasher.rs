//! 内容指纹计算
//!
//! 与 S3 分块上传的 ETag 约定逐位兼容：单块为 `"<md5>"`，
//! 多块为 `"<md5(各块摘要拼接)>-<块数>"`（均含引号）。
//! 分块大小必须与上传路径的分块阈值/part 大小一致，否则复合指纹
//! 与远端标签不可比，差异判定就会失真。

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// 流式计算文件指纹；空文件返回 None（没有块，无从比较）
///
/// 纯函数（除文件 IO 外），无共享状态，可并发调用。
pub fn fingerprint_file(path: &Path, chunk_size: u64) -> io::Result<Option<String>> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; chunk_size as usize];
    let mut digests = Vec::new();

    loop {
        let filled = read_chunk(&mut file, &mut buf)?;
        if filled == 0 {
            break;
        }
        digests.push(md5::compute(&buf[..filled]));
    }

    Ok(combine(&digests))
}

/// 按同一约定对内存数据计算指纹（存储端模拟用）
pub fn etag_for_bytes(data: &[u8], chunk_size: u64) -> Option<String> {
    let digests: Vec<md5::Digest> = data
        .chunks(chunk_size as usize)
        .map(md5::compute)
        .collect();
    combine(&digests)
}

fn combine(digests: &[md5::Digest]) -> Option<String> {
    match digests {
        [] => None,
        [single] => Some(format!("\"{:x}\"", single)),
        many => {
            let mut concat = Vec::with_capacity(many.len() * 16);
            for digest in many {
                concat.extend_from_slice(&digest.0);
            }
            Some(format!("\"{:x}-{}\"", md5::compute(&concat), many.len()))
        }
    }
}

/// 尽量填满缓冲区（文件末尾可能读不满）
fn read_chunk(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
