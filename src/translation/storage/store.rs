//! 本地键值存储
//!
//! 两张逻辑表：`translate_rooms`（房间 → 目标语言）和 `translate_list`
//! （内容哈希或消息状态键 → 译文）。只有简单的 get/put，无事务语义、无版本。

use std::path::Path;

use dashmap::DashMap;
use redb::{Database, ReadableTable, TableDefinition, TableError};

use crate::translation::config::constants;
use crate::translation::error::TranslationResult;

const TRANSLATE_ROOMS: TableDefinition<&str, &str> = TableDefinition::new(constants::ROOMS_TABLE);
const TRANSLATE_LIST: TableDefinition<&str, &str> =
    TableDefinition::new(constants::TRANSLATIONS_TABLE);

/// 逻辑表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreTable {
    /// 房间 ID → 目标语言
    TranslateRooms,
    /// 内容哈希 / 消息状态键 → 文本
    TranslateList,
}

impl StoreTable {
    pub fn name(&self) -> &'static str {
        match self {
            StoreTable::TranslateRooms => constants::ROOMS_TABLE,
            StoreTable::TranslateList => constants::TRANSLATIONS_TABLE,
        }
    }

    fn definition(&self) -> TableDefinition<'static, &'static str, &'static str> {
        match self {
            StoreTable::TranslateRooms => TRANSLATE_ROOMS,
            StoreTable::TranslateList => TRANSLATE_LIST,
        }
    }
}

/// 同步键值存储接口
///
/// 实现必须可以跨线程共享，`TranslationCache` 会在阻塞线程池里调用它。
pub trait KvStore: Send + Sync {
    fn load(&self, table: StoreTable, key: &str) -> TranslationResult<Option<String>>;
    fn save(&self, table: StoreTable, key: &str, value: &str) -> TranslationResult<()>;
}

/// 基于 redb 的磁盘存储
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// 打开（或创建）存储文件，并确保两张表存在
    pub fn open<P: AsRef<Path>>(path: P) -> TranslationResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        {
            txn.open_table(TRANSLATE_ROOMS)?;
            txn.open_table(TRANSLATE_LIST)?;
        }
        txn.commit()?;

        tracing::debug!("已打开翻译存储: {}", path.display());
        Ok(Self { db })
    }
}

impl KvStore for RedbStore {
    fn load(&self, table: StoreTable, key: &str) -> TranslationResult<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(table.definition()) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let value = table.get(key)?.map(|guard| guard.value().to_string());
        Ok(value)
    }

    fn save(&self, table: StoreTable, key: &str, value: &str) -> TranslationResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(table.definition())?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }
}

/// 内存存储，进程结束即丢失
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<(StoreTable, String), String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 条目总数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn load(&self, table: StoreTable, key: &str) -> TranslationResult<Option<String>> {
        Ok(self
            .entries
            .get(&(table, key.to_string()))
            .map(|entry| entry.value().clone()))
    }

    fn save(&self, table: StoreTable, key: &str, value: &str) -> TranslationResult<()> {
        self.entries.insert((table, key.to_string()), value.to_string());
        Ok(())
    }
}
