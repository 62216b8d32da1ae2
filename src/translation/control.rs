//! 房间头部翻译控件
//!
//! 控件状态只有选择器开合、当前目标语言和"观察者是否已派发"。
//! 存储写入和翻译都以任务形式交给 `OverlayWorker`。

use crate::translation::config::TranslationConfig;
use crate::translation::storage::TranslationCache;
use crate::translation::tasks::{OverlayTask, TaskQueue};

/// 语言选择器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerState {
    Closed,
    Open,
}

/// 选择语言的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageSelection {
    /// 目标语言已生效
    Applied,
    /// 空值或界面语言，只关闭了选择器
    Ignored,
}

pub struct RoomHeaderTranslationControl {
    room_id: String,
    display_language: String,
    picker: PickerState,
    target_language: Option<String>,
    has_observer: bool,
    cache: TranslationCache,
    tasks: TaskQueue,
}

impl RoomHeaderTranslationControl {
    pub fn new(
        room_id: impl Into<String>,
        config: &TranslationConfig,
        cache: TranslationCache,
        tasks: TaskQueue,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            display_language: config.display_language.clone(),
            picker: PickerState::Closed,
            target_language: None,
            has_observer: false,
            cache,
            tasks,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn display_language(&self) -> &str {
        &self.display_language
    }

    pub fn picker(&self) -> PickerState {
        self.picker
    }

    pub fn target_language(&self) -> Option<&str> {
        self.target_language.as_deref()
    }

    pub fn has_observer(&self) -> bool {
        self.has_observer
    }

    /// 切换选择器开合
    pub fn toggle(&mut self) {
        self.picker = match self.picker {
            PickerState::Closed => PickerState::Open,
            PickerState::Open => PickerState::Closed,
        };
    }

    /// 用户在选择器中选了一种语言
    pub fn select_language(&mut self, language: &str) -> LanguageSelection {
        self.picker = PickerState::Closed;

        if language.is_empty() || language == self.display_language {
            tracing::debug!("忽略语言选择: {:?}", language);
            return LanguageSelection::Ignored;
        }

        self.ensure_observer();
        self.tasks.dispatch(OverlayTask::SavePreference {
            room_id: self.room_id.clone(),
            language: language.to_string(),
        });
        self.target_language = Some(language.to_string());
        self.tasks.dispatch(OverlayTask::TranslateTimeline {
            language: language.to_string(),
        });

        tracing::info!("房间 {} 切换翻译语言: {}", self.room_id, language);
        LanguageSelection::Applied
    }

    /// 挂载时恢复房间保存的目标语言
    ///
    /// 保存的语言与界面语言不同时，立即挂上观察者并翻译整条时间线。
    pub async fn mount(&mut self) -> Option<String> {
        let saved = self.cache.load_room_preference(&self.room_id).await;

        match saved {
            Some(language) if !language.is_empty() && language != self.display_language => {
                tracing::info!("恢复房间 {} 的翻译语言: {}", self.room_id, language);
                self.target_language = Some(language.clone());
                self.ensure_observer();
                self.tasks.dispatch(OverlayTask::TranslateTimeline {
                    language: language.clone(),
                });
                Some(language)
            }
            _ => None,
        }
    }

    fn ensure_observer(&mut self) {
        if !self.has_observer {
            self.tasks.dispatch(OverlayTask::EnsureObserving);
            self.has_observer = true;
        }
    }
}
