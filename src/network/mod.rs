//! # 网络模块
//!
//! 与远程翻译接口的通信。
//!
//! # 模块组织
//!
//! - `fetcher` - 翻译接口抽象和 HTTP 实现

pub mod fetcher;

// Re-export commonly used items for convenience
pub use fetcher::{HttpFetcher, TranslationFetcher};
