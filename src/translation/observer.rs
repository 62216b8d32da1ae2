//! 时间线观察者
//!
//! 订阅 `Timeline` 的追加事件，把新消息块交给注入器翻译。
//! 一个房间视图最多挂一个观察者，`ensure_observing` 可以重复调用。

use tokio::sync::mpsc;

use crate::translation::injector::{DomTranslationInjector, TranslationReport};
use crate::translation::timeline::{Timeline, TimelineEvent};

#[derive(Default)]
pub struct TimelineObserver {
    events: Option<mpsc::UnboundedReceiver<TimelineEvent>>,
}

impl TimelineObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_observing(&self) -> bool {
        self.events.is_some()
    }

    /// 开始观察；已在观察时不做任何事
    ///
    /// 返回本次是否新挂上了订阅。
    pub fn ensure_observing(&mut self, timeline: &Timeline) -> bool {
        if self.events.is_some() {
            return false;
        }
        self.events = Some(timeline.subscribe());
        tracing::debug!("开始观察时间线");
        true
    }

    /// 停止观察，之后的追加不再处理
    pub fn stop_observing(&mut self) {
        if self.events.take().is_some() {
            tracing::debug!("停止观察时间线");
        }
    }

    /// 等待下一个事件；时间线已销毁时返回 None 并自动停止观察
    pub async fn next_event(&mut self) -> Option<TimelineEvent> {
        let event = match self.events.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        };
        if event.is_none() {
            self.events = None;
        }
        event
    }

    /// 非阻塞地取一个已到达的事件
    pub fn try_next_event(&mut self) -> Option<TimelineEvent> {
        match self.events.as_mut()?.try_recv() {
            Ok(event) => Some(event),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.events = None;
                None
            }
        }
    }

    /// 用当前目标语言翻译事件中的新消息
    ///
    /// 没有 `mx_EventTile_line` 的消息块直接忽略。
    pub async fn handle_event(
        injector: &DomTranslationInjector,
        language: &str,
        event: TimelineEvent,
    ) -> TranslationReport {
        let TimelineEvent::TilesAppended(tiles) = event;
        let mut report = TranslationReport::default();

        for tile in tiles.iter().filter(|tile| tile.line.is_some()) {
            report.merge(injector.translate_messages(language, &tile.messages).await);
        }

        report
    }
}
