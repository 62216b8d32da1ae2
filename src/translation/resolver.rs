//! 译文获取：先查缓存，未命中再请求接口
//!
//! 同一内容哈希同时只允许一个请求在途，后到者等待后重新查缓存。

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::network::TranslationFetcher;
use crate::translation::error::TranslationResult;
use crate::translation::hasher::content_hash;
use crate::translation::storage::TranslationCache;

/// 缓存优先的译文获取器
#[derive(Clone)]
pub struct TranslationResolver {
    cache: TranslationCache,
    fetcher: Arc<dyn TranslationFetcher>,
    in_flight: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl TranslationResolver {
    pub fn new(cache: TranslationCache, fetcher: Arc<dyn TranslationFetcher>) -> Self {
        Self {
            cache,
            fetcher,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// 获取 `text` 在 `language` 下的译文
    ///
    /// 成功请求的结果在返回前写入缓存；写缓存失败不影响返回值。
    pub async fn resolve(&self, text: &str, language: &str) -> TranslationResult<String> {
        let key = content_hash(text, language);

        if let Some(cached) = self.cache.load_translation(&key).await {
            return Ok(cached);
        }

        let lock = self.in_flight.entry(key.clone()).or_default().value().clone();
        let _guard = lock.lock().await;

        // 等锁期间可能已有同键请求完成
        if let Some(cached) = self.cache.load_translation(&key).await {
            self.release(&key, &lock);
            return Ok(cached);
        }

        let result = self.fetcher.fetch_translation(text, language).await;
        if let Ok(translated) = &result {
            self.cache.save_translation(&key, translated).await;
        }
        self.release(&key, &lock);

        result
    }

    /// 只移除自己持有的那把锁，后来者新建的条目不受影响
    fn release(&self, key: &str, lock: &Arc<Mutex<()>>) {
        self.in_flight
            .remove_if(key, |_, current| Arc::ptr_eq(current, lock));
    }
}
