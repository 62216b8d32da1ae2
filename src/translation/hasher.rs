//! 内容哈希
//!
//! 由 (原文, 目标语言) 生成翻译缓存键。

use sha2::{Digest, Sha256};

/// 原文与语言之间的分隔符
pub const KEY_SEPARATOR: &str = "-";

/// 生成内容哈希缓存键
///
/// 对 `text + "-" + language` 做 SHA-256，输出小写十六进制字符串。
/// 同一 (原文, 语言) 对在任何房间得到同一个键。
pub fn content_hash(text: &str, language: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(KEY_SEPARATOR.as_bytes());
    hasher.update(language.as_bytes());

    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}
