//! 消息编辑器的翻译状态
//!
//! 每条正在翻译的消息在 `translate_list` 表中记一个状态键，
//! 首次展示时写入"翻译中"占位文本，之后展示保存的内容。

use crate::translation::config::constants::{PENDING_SUFFIX, TRANSLATOR_STATE_PREFIX};
use crate::translation::storage::TranslationCache;

/// 状态键：`mx_translator_state_<房间>_<事件>`
pub fn translator_state_key(room_id: &str, event_id: &str) -> String {
    format!("{}{}_{}", TRANSLATOR_STATE_PREFIX, room_id, event_id)
}

pub struct TranslateMessageComposer {
    cache: TranslationCache,
}

impl TranslateMessageComposer {
    pub fn new(cache: TranslationCache) -> Self {
        Self { cache }
    }

    /// 读取已保存的状态
    pub async fn restore_state(&self, room_id: &str, event_id: &str) -> Option<String> {
        self.cache
            .load_entry(&translator_state_key(room_id, event_id))
            .await
    }

    /// 当前应展示的内容
    ///
    /// 已有非空状态时原样返回；否则写入占位文本 `"<正文> translating..."` 并返回它。
    /// 占位文本写入失败时返回 None。
    pub async fn content(&self, room_id: &str, event_id: &str, body: &str) -> Option<String> {
        let key = translator_state_key(room_id, event_id);
        if let Some(saved) = self.cache.load_entry(&key).await.filter(|s| !s.is_empty()) {
            return Some(saved);
        }

        let pending = format!("{}{}", body, PENDING_SUFFIX);
        match self.cache.save_entry(&key, &pending).await {
            Ok(()) => Some(pending),
            Err(e) => {
                tracing::error!("保存消息翻译状态失败 ({}): {}", key, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::error::{TranslationError, TranslationResult};
    use crate::translation::storage::{KvStore, MemoryStore, StoreTable};
    use std::sync::Arc;

    struct ReadOnlyStore;

    impl KvStore for ReadOnlyStore {
        fn load(&self, _table: StoreTable, _key: &str) -> TranslationResult<Option<String>> {
            Ok(None)
        }

        fn save(&self, _table: StoreTable, _key: &str, _value: &str) -> TranslationResult<()> {
            Err(TranslationError::StorageError("quota exceeded".to_string()))
        }
    }

    #[test]
    fn test_state_key() {
        assert_eq!(
            translator_state_key("!r:hs", "$e1"),
            "mx_translator_state_!r:hs_$e1"
        );
    }

    #[tokio::test]
    async fn test_content_writes_placeholder_once() {
        let cache = TranslationCache::new(Arc::new(MemoryStore::new()));
        let composer = TranslateMessageComposer::new(cache.clone());

        assert_eq!(composer.restore_state("!r", "$e").await, None);
        assert_eq!(
            composer.content("!r", "$e", "hello").await.as_deref(),
            Some("hello translating...")
        );

        cache
            .save_entry(&translator_state_key("!r", "$e"), "你好")
            .await
            .unwrap();
        assert_eq!(composer.content("!r", "$e", "hello").await.as_deref(), Some("你好"));
        assert_eq!(composer.restore_state("!r", "$e").await.as_deref(), Some("你好"));
    }

    #[tokio::test]
    async fn test_content_is_none_when_placeholder_cannot_be_saved() {
        let composer = TranslateMessageComposer::new(TranslationCache::new(Arc::new(ReadOnlyStore)));
        assert_eq!(composer.content("!r", "$e", "hello").await, None);
    }
}
