//! 房间翻译层装配
//!
//! 把控件、工作者和时间线接到同一个任务队列上。

use std::rc::Rc;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::network::TranslationFetcher;
use crate::translation::config::TranslationConfig;
use crate::translation::control::RoomHeaderTranslationControl;
use crate::translation::injector::DomTranslationInjector;
use crate::translation::resolver::TranslationResolver;
use crate::translation::storage::TranslationCache;
use crate::translation::tasks::{task_queue, OverlayWorker, TaskFailure};
use crate::translation::timeline::Timeline;

/// 一个房间视图上的翻译层
pub struct RoomOverlay {
    pub control: RoomHeaderTranslationControl,
    pub worker: OverlayWorker,
    pub failures: mpsc::UnboundedReceiver<TaskFailure>,
    pub timeline: Rc<Timeline>,
}

impl RoomOverlay {
    pub fn new(
        room_id: &str,
        timeline: Rc<Timeline>,
        config: &TranslationConfig,
        cache: TranslationCache,
        fetcher: Arc<dyn TranslationFetcher>,
    ) -> Self {
        let resolver = TranslationResolver::new(cache.clone(), fetcher);
        let injector = DomTranslationInjector::new(resolver, config.user_id.clone());

        let (queue, tasks) = task_queue();
        let (worker, failures) = OverlayWorker::new(Rc::clone(&timeline), injector, cache.clone(), tasks);
        let control = RoomHeaderTranslationControl::new(room_id, config, cache, queue);

        Self {
            control,
            worker,
            failures,
            timeline,
        }
    }

    /// 取出目前所有的任务失败
    pub fn drain_failures(&mut self) -> Vec<TaskFailure> {
        let mut failures = Vec::new();
        while let Ok(failure) = self.failures.try_recv() {
            failures.push(failure);
        }
        failures
    }
}
