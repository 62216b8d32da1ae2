//! 翻译模块
//!
//! 聊天时间线的机器翻译层：
//! - **config**: 配置管理
//! - **error**: 错误处理
//! - **hasher**: 内容哈希
//! - **storage**: 房间偏好和译文的本地存储
//! - **resolver**: 缓存优先的译文获取
//! - **injector**: 把译文节点挂到消息元素上
//! - **timeline** / **observer**: 新消息追加和观察
//! - **tasks**: 后台任务队列和工作者
//! - **control**: 房间头部的语言选择控件
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use std::sync::Arc;
//! use timeline_translate::network::HttpFetcher;
//! use timeline_translate::translation::{
//!     MemoryStore, RoomOverlay, Timeline, TranslationCache, TranslationConfig,
//! };
//!
//! # async fn example(html: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let config = TranslationConfig::default();
//! let cache = TranslationCache::new(Arc::new(MemoryStore::new()));
//! let fetcher = Arc::new(HttpFetcher::new(&config)?);
//! let timeline = Rc::new(Timeline::parse(html)?);
//!
//! let mut overlay = RoomOverlay::new("!room:org1.helium", timeline, &config, cache, fetcher);
//! overlay.control.mount().await;
//! overlay.control.select_language("en");
//! overlay.worker.run_pending().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// 子模块声明
// ============================================================================

/// 配置管理模块
pub mod config;

/// 后台任务和失败通道
pub mod tasks;

/// 房间头部控件
pub mod control;

/// 错误处理模块 - 统一的错误类型和处理机制
pub mod error;

/// 内容哈希
pub mod hasher;

/// 译文注入
pub mod injector;

/// 时间线观察者
pub mod observer;

/// 房间翻译层装配
pub mod overlay;

/// 消息翻译状态
pub mod composer;

/// 缓存优先的译文获取
pub mod resolver;

/// 存储管理模块 - 本地键值存储和缓存
pub mod storage;

/// 时间线文档
pub mod timeline;

// ============================================================================
// 核心API导出
// ============================================================================

pub use config::{constants, ConfigManager, LanguageOption, TranslationConfig};

pub use error::{ErrorCategory, ErrorSeverity, TranslationError, TranslationResult};

pub use hasher::content_hash;

pub use storage::{CacheStats, KvStore, MemoryStore, RedbStore, StoreTable, TranslationCache};

pub use resolver::TranslationResolver;

pub use injector::{collect_messages, DomTranslationInjector, TranslatableMessage, TranslationReport};

pub use timeline::{AppendedTile, Timeline, TimelineEvent};

pub use observer::TimelineObserver;

pub use tasks::{task_queue, OverlayTask, OverlayWorker, TaskFailure, TaskKind, TaskQueue};

pub use control::{LanguageSelection, PickerState, RoomHeaderTranslationControl};

pub use composer::{translator_state_key, TranslateMessageComposer};

pub use overlay::RoomOverlay;

// ============================================================================
// 便利函数导出
// ============================================================================

/// 翻译一段时间线 HTML，返回翻译后的 HTML 和本次结果
///
/// 一次性用法，不挂观察者。
pub async fn translate_timeline_html(
    html: &str,
    language: &str,
    injector: &DomTranslationInjector,
) -> TranslationResult<(String, TranslationReport)> {
    let timeline = Timeline::parse(html)?;
    let report = injector.translate(language, timeline.message_list()).await;
    Ok((timeline.to_html()?, report))
}

/// 检查翻译配置文件是否存在
pub fn config_file_exists() -> bool {
    config::config_file_exists()
}
