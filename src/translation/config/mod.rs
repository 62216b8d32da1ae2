//! 翻译配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, LanguageOption, TranslationConfig};

/// 配置常量
pub mod constants {
    // 默认接口设置
    pub const DEFAULT_API_URL: &str = "http://localhost:1188/translate";
    pub const DEFAULT_ORG_API_BASE: &str = "http://localhost:8080";
    pub const DEFAULT_DISPLAY_LANGUAGE: &str = "zh-hans";
    pub const DEFAULT_STORE_FILE: &str = "translate.redb";

    // 本地存储表名
    pub const ROOMS_TABLE: &str = "translate_rooms";
    pub const TRANSLATIONS_TABLE: &str = "translate_list";

    // 时间线 DOM 约定
    pub const TRANSLATABLE_CLASS: &str = "mx_translatable";
    pub const TRANSLATED_CONTENT_CLASS: &str = "mx_translate_content";
    pub const MESSAGE_LIST_CLASS: &str = "mx_RoomView_MessageList";
    pub const EVENT_TILE_LINE_CLASS: &str = "mx_EventTile_line";
    pub const AUTHOR_ATTR: &str = "data-user-id";

    // 单条消息状态
    pub const TRANSLATOR_STATE_PREFIX: &str = "mx_translator_state_";
    pub const PENDING_SUFFIX: &str = " translating...";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "timeline-translate.toml",
        ".timeline-translate.toml",
        "~/.config/timeline-translate/config.toml",
        "/etc/timeline-translate/config.toml",
    ];
}

/// 便利函数
pub fn config_file_exists() -> bool {
    constants::CONFIG_PATHS
        .iter()
        .any(|path| std::path::Path::new(shellexpand::tilde(path).as_ref()).exists())
}
