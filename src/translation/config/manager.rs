//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::constants;
use crate::translation::error::{helpers, TranslationError, TranslationResult};

/// 语言选择器中的一项
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LanguageOption {
    pub value: String,
    pub label: String,
}

impl LanguageOption {
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// 翻译配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslationConfig {
    // 接口配置
    pub api_url: String,
    pub request_timeout_secs: Option<u64>,
    pub org_api_base: String,

    // 客户端配置
    pub display_language: String,
    pub user_id: Option<String>,

    // 存储配置
    pub store_path: Option<String>,

    // 选择器中的语言，序列化为 TOML 表数组，须放在最后
    pub languages: Vec<LanguageOption>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            api_url: constants::DEFAULT_API_URL.to_string(),
            request_timeout_secs: None,
            org_api_base: constants::DEFAULT_ORG_API_BASE.to_string(),
            display_language: constants::DEFAULT_DISPLAY_LANGUAGE.to_string(),
            user_id: None,
            store_path: None,
            languages: vec![
                LanguageOption::new("zh-hans", "中文"),
                LanguageOption::new("en", "英文"),
            ],
        }
    }
}

impl TranslationConfig {
    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        url::Url::parse(&self.api_url)
            .map_err(|e| helpers::config_error(format!("翻译接口地址无效: {}", e)))?;
        url::Url::parse(&self.org_api_base)
            .map_err(|e| helpers::config_error(format!("组织接口地址无效: {}", e)))?;

        if self.display_language.trim().is_empty() {
            return Err(helpers::config_error("显示语言不能为空"));
        }

        if self.request_timeout_secs == Some(0) {
            return Err(helpers::config_error("请求超时必须大于0"));
        }

        if let Some(option) = self.languages.iter().find(|o| o.value.trim().is_empty()) {
            return Err(helpers::config_error(format!(
                "语言选项 '{}' 缺少取值",
                option.label
            )));
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{org, translation, EnvVar};

        if let Ok(api_url) = translation::ApiUrl::get() {
            tracing::info!("环境变量覆盖 API URL: {}", api_url);
            self.api_url = api_url;
        }

        if let Ok(store_path) = translation::StorePath::get() {
            self.store_path = Some(store_path);
        }

        if let Ok(display_language) = translation::DisplayLang::get() {
            self.display_language = display_language;
        }

        if let Ok(user_id) = translation::UserId::get() {
            self.user_id = Some(user_id);
        }

        if let Ok(timeout) = translation::RequestTimeout::get() {
            self.request_timeout_secs = Some(timeout.as_secs());
        }

        if let Ok(org_api_base) = org::ApiBase::get() {
            self.org_api_base = org_api_base;
        }
    }

    /// 请求超时，未配置时不限时
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// 本地存储文件路径
    pub fn store_path(&self) -> PathBuf {
        match &self.store_path {
            Some(path) => PathBuf::from(shellexpand::tilde(path).as_ref()),
            None => default_store_path(),
        }
    }

    /// 语言是否出现在选择器中
    pub fn is_offered_language(&self, language: &str) -> bool {
        self.languages.iter().any(|option| option.value == language)
    }
}

/// 默认存储路径：平台数据目录下的 translate.redb
pub fn default_store_path() -> PathBuf {
    match ProjectDirs::from("org", "heliumos", "timeline-translate") {
        Some(dirs) => dirs.data_dir().join(constants::DEFAULT_STORE_FILE),
        None => PathBuf::from(constants::DEFAULT_STORE_FILE),
    }
}

/// 简化的配置管理器
pub struct ConfigManager {
    config: TranslationConfig,
}

impl ConfigManager {
    /// 创建新的配置管理器，按默认搜索路径查找配置文件
    pub fn new() -> TranslationResult<Self> {
        let config = Self::load_config()?;
        Self::finish(config)
    }

    /// 从指定文件创建配置管理器
    pub fn from_path<P: AsRef<Path>>(path: P) -> TranslationResult<Self> {
        Self::load_dotenv();
        let config = Self::load_from_file(path.as_ref())?;
        Self::finish(config)
    }

    /// 直接使用给定配置（仍应用环境变量覆盖）
    pub fn with_config(config: TranslationConfig) -> TranslationResult<Self> {
        Self::finish(config)
    }

    fn finish(mut config: TranslationConfig) -> TranslationResult<Self> {
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &TranslationConfig {
        &self.config
    }

    /// 取出配置
    pub fn into_config(self) -> TranslationConfig {
        self.config
    }

    /// 从默认路径加载配置
    fn load_config() -> TranslationResult<TranslationConfig> {
        // 首先尝试加载 .env 文件
        Self::load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            let candidate = Path::new(expanded_path.as_ref());
            if candidate.exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(candidate);
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(TranslationConfig::default())
    }

    /// 从指定文件加载配置
    fn load_from_file(path: &Path) -> TranslationResult<TranslationConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TranslationError::ConfigError(format!("读取配置文件失败 {}: {}", path.display(), e))
        })?;

        parse_config(&content, path.extension().and_then(|ext| ext.to_str()))
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config<P: AsRef<Path>>(path: P) -> TranslationResult<()> {
        let config = TranslationConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}

/// 按扩展名解析配置内容，`json` 以外一律按 TOML 处理
fn parse_config(content: &str, extension: Option<&str>) -> TranslationResult<TranslationConfig> {
    match extension {
        Some("json") => serde_json::from_str(content)
            .map_err(|e| TranslationError::ConfigError(format!("解析JSON配置失败: {}", e))),
        _ => toml::from_str(content)
            .map_err(|e| TranslationError::ConfigError(format!("解析TOML配置失败: {}", e))),
    }
}
