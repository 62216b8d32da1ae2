//! 翻译缓存
//!
//! 在 `KvStore` 之上提供异步读写。存储层的任何失败都不会进入翻译流程：
//! 读失败视为未命中，写失败记录日志后忽略，下次再翻译一遍即可。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::store::{KvStore, StoreTable};
use crate::translation::error::{TranslationError, TranslationResult};

/// 缓存统计信息
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub read_failures: u64,
    pub write_failures: u64,
}

impl CacheStats {
    /// 计算缓存命中率
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    read_failures: AtomicU64,
    write_failures: AtomicU64,
}

/// 翻译缓存：房间偏好 + 译文
///
/// 克隆开销很小，所有克隆共享同一个存储和统计。
#[derive(Clone)]
pub struct TranslationCache {
    store: Arc<dyn KvStore>,
    counters: Arc<CacheCounters>,
}

impl TranslationCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            counters: Arc::new(CacheCounters::default()),
        }
    }

    /// 读取房间的目标语言
    pub async fn load_room_preference(&self, room_id: &str) -> Option<String> {
        self.read(StoreTable::TranslateRooms, room_id).await
    }

    /// 保存房间的目标语言，覆盖旧值
    ///
    /// 失败会记录日志并返回错误，由调用方决定是否上报；翻译流程本身不受影响。
    pub async fn save_room_preference(&self, room_id: &str, language: &str) -> TranslationResult<()> {
        self.write(StoreTable::TranslateRooms, room_id, language).await
    }

    /// 按内容哈希读取译文
    pub async fn load_translation(&self, key: &str) -> Option<String> {
        self.read(StoreTable::TranslateList, key).await
    }

    /// 写入译文，调用方无需关心结果
    pub async fn save_translation(&self, key: &str, text: &str) {
        let _ = self.write(StoreTable::TranslateList, key, text).await;
    }

    /// 读取 `translate_list` 中的任意条目（消息状态键等）
    pub async fn load_entry(&self, key: &str) -> Option<String> {
        self.read(StoreTable::TranslateList, key).await
    }

    /// 写入 `translate_list` 中的任意条目
    pub async fn save_entry(&self, key: &str, text: &str) -> TranslationResult<()> {
        self.write(StoreTable::TranslateList, key, text).await
    }

    /// 获取统计信息
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            read_failures: self.counters.read_failures.load(Ordering::Relaxed),
            write_failures: self.counters.write_failures.load(Ordering::Relaxed),
        }
    }

    async fn read(&self, table: StoreTable, key: &str) -> Option<String> {
        let store = Arc::clone(&self.store);
        let owned_key = key.to_string();

        let result = tokio::task::spawn_blocking(move || store.load(table, &owned_key))
            .await
            .unwrap_or_else(|e| Err(TranslationError::InternalError(format!("存储任务失败: {}", e))));

        match result {
            Ok(Some(value)) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                self.counters.read_failures.fetch_add(1, Ordering::Relaxed);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("读取 {} 失败，按未命中处理 (key={}): {}", table.name(), key, e);
                None
            }
        }
    }

    async fn write(&self, table: StoreTable, key: &str, value: &str) -> TranslationResult<()> {
        let store = Arc::clone(&self.store);
        let owned_key = key.to_string();
        let owned_value = value.to_string();

        let result = tokio::task::spawn_blocking(move || store.save(table, &owned_key, &owned_value))
            .await
            .unwrap_or_else(|e| Err(TranslationError::InternalError(format!("存储任务失败: {}", e))));

        if let Err(e) = &result {
            self.counters.write_failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("写入 {} 失败 (key={}): {}", table.name(), key, e);
        }

        result
    }
}
