// 集成测试公共模块
//
// 提供测试辅助工具和共享功能

use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use timeline_translate::network::TranslationFetcher;
use timeline_translate::translation::{
    KvStore, MemoryStore, RedbStore, RoomOverlay, StoreTable, Timeline, TranslationCache,
    TranslationConfig, TranslationError, TranslationResult,
};

pub const LOCAL_USER: &str = "@me:org1.helium";
pub const ROOM: &str = "!general:org1.helium";

/// 记录调用次数的翻译接口，`unreachable` 开头的文本返回网络错误
#[derive(Default)]
pub struct CountingFetcher {
    calls: AtomicUsize,
    failing: Mutex<HashSet<String>>,
}

#[allow(dead_code)]
impl CountingFetcher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 让指定原文的请求失败
    pub fn fail_on(&self, text: &str) {
        self.failing.lock().unwrap().insert(text.to_string());
    }

    pub fn recover(&self, text: &str) {
        self.failing.lock().unwrap().remove(text);
    }
}

#[async_trait]
impl TranslationFetcher for CountingFetcher {
    async fn fetch_translation(&self, text: &str, language: &str) -> TranslationResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.starts_with("unreachable") || self.failing.lock().unwrap().contains(text) {
            return Err(TranslationError::NetworkError("connection refused".to_string()));
        }
        Ok(format!("[{}] {}", language, text))
    }
}

/// 读写都失败的存储
#[allow(dead_code)]
pub struct FailingStore;

impl KvStore for FailingStore {
    fn load(&self, _table: StoreTable, _key: &str) -> TranslationResult<Option<String>> {
        Err(TranslationError::StorageError("database is locked".to_string()))
    }

    fn save(&self, _table: StoreTable, _key: &str, _value: &str) -> TranslationResult<()> {
        Err(TranslationError::StorageError("database is locked".to_string()))
    }
}

/// 一个消息块
#[allow(dead_code)]
pub fn tile(author: &str, text: &str) -> String {
    format!(
        r#"<li class="mx_EventTile"><div class="mx_EventTile_line"><div class="mx_translatable" data-user-id="{}"><span class="mx_EventTile_body">{}</span></div></div></li>"#,
        author, text
    )
}

/// 含若干消息块的时间线页面
#[allow(dead_code)]
pub fn page(tiles: &[String]) -> String {
    format!(
        r#"<html><head><title>room</title></head><body><div class="mx_RoomView"><ol class="mx_RoomView_MessageList">{}</ol></div></body></html>"#,
        tiles.concat()
    )
}

#[allow(dead_code)]
pub fn test_config() -> TranslationConfig {
    TranslationConfig {
        user_id: Some(LOCAL_USER.to_string()),
        ..Default::default()
    }
}

/// 测试环境：临时目录 + 可重复打开的存储
#[allow(dead_code)]
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: tempfile::tempdir().expect("创建临时目录失败"),
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.temp_dir.path().join("translate.redb")
    }

    /// 打开（或重新打开）磁盘存储
    pub fn open_cache(&self) -> TranslationCache {
        let store = RedbStore::open(self.store_path()).expect("打开存储失败");
        TranslationCache::new(Arc::new(store))
    }
}

#[allow(dead_code)]
pub fn memory_cache() -> TranslationCache {
    TranslationCache::new(Arc::new(MemoryStore::new()))
}

/// 在给定页面上装配房间翻译层
#[allow(dead_code)]
pub fn mount_overlay(
    html: &str,
    cache: TranslationCache,
    fetcher: Arc<CountingFetcher>,
) -> RoomOverlay {
    let timeline = Rc::new(Timeline::parse(html).expect("解析时间线失败"));
    RoomOverlay::new(ROOM, timeline, &test_config(), cache, fetcher)
}
