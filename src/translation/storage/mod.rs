//! 存储模块
//!
//! 提供本地持久化存储和基于它的翻译缓存。

pub mod cache;
pub mod store;

pub use cache::{CacheStats, TranslationCache};
pub use store::{KvStore, MemoryStore, RedbStore, StoreTable};
