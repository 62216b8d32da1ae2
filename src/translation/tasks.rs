//! 后台任务
//!
//! 房间头部控件只负责派发任务，真正的存储写入和 DOM 翻译由
//! `OverlayWorker` 在同一个本地执行器上依次完成。任务失败不会被吞掉，
//! 而是通过失败通道交给调用方。

use std::fmt;
use std::rc::Rc;

use tokio::sync::mpsc;

use crate::translation::error::TranslationError;
use crate::translation::injector::{DomTranslationInjector, TranslationReport};
use crate::translation::observer::TimelineObserver;
use crate::translation::storage::TranslationCache;
use crate::translation::timeline::{Timeline, TimelineEvent};

/// 控件派发的任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayTask {
    /// 持久化房间的目标语言
    SavePreference { room_id: String, language: String },
    /// 确保时间线观察者已挂上
    EnsureObserving,
    /// 用指定语言翻译整条时间线
    TranslateTimeline { language: String },
}

impl OverlayTask {
    pub fn kind(&self) -> TaskKind {
        match self {
            OverlayTask::SavePreference { .. } => TaskKind::SavePreference,
            OverlayTask::EnsureObserving => TaskKind::EnsureObserving,
            OverlayTask::TranslateTimeline { .. } => TaskKind::TranslateTimeline,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    SavePreference,
    EnsureObserving,
    TranslateTimeline,
    /// 观察者处理新追加的消息
    TranslateAppended,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskKind::SavePreference => "save_preference",
            TaskKind::EnsureObserving => "ensure_observing",
            TaskKind::TranslateTimeline => "translate_timeline",
            TaskKind::TranslateAppended => "translate_appended",
        };
        f.write_str(name)
    }
}

/// 一次任务失败
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub kind: TaskKind,
    pub error: TranslationError,
}

/// 任务派发端
#[derive(Clone)]
pub struct TaskQueue {
    sender: mpsc::UnboundedSender<OverlayTask>,
}

impl TaskQueue {
    /// 派发任务；工作者已经退出时返回 false
    pub fn dispatch(&self, task: OverlayTask) -> bool {
        match self.sender.send(task) {
            Ok(()) => true,
            Err(mpsc::error::SendError(task)) => {
                tracing::warn!("任务队列已关闭，丢弃任务 {}", task.kind());
                false
            }
        }
    }
}

/// 创建任务队列
pub fn task_queue() -> (TaskQueue, mpsc::UnboundedReceiver<OverlayTask>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (TaskQueue { sender }, receiver)
}

/// 任务执行者
pub struct OverlayWorker {
    timeline: Rc<Timeline>,
    injector: DomTranslationInjector,
    cache: TranslationCache,
    observer: TimelineObserver,
    tasks: mpsc::UnboundedReceiver<OverlayTask>,
    failures: mpsc::UnboundedSender<TaskFailure>,
    current_language: Option<String>,
}

impl OverlayWorker {
    /// 创建工作者，同时返回失败通道的接收端
    pub fn new(
        timeline: Rc<Timeline>,
        injector: DomTranslationInjector,
        cache: TranslationCache,
        tasks: mpsc::UnboundedReceiver<OverlayTask>,
    ) -> (Self, mpsc::UnboundedReceiver<TaskFailure>) {
        let (failures, failure_rx) = mpsc::unbounded_channel();
        let worker = Self {
            timeline,
            injector,
            cache,
            observer: TimelineObserver::new(),
            tasks,
            failures,
            current_language: None,
        };
        (worker, failure_rx)
    }

    /// 观察者当前使用的目标语言
    pub fn current_language(&self) -> Option<&str> {
        self.current_language.as_deref()
    }

    pub fn observer(&self) -> &TimelineObserver {
        &self.observer
    }

    /// 处理所有已到达的任务和时间线事件，直到两边都空
    pub async fn run_pending(&mut self) -> TranslationReport {
        let mut report = TranslationReport::default();

        loop {
            let mut progressed = false;

            while let Ok(task) = self.tasks.try_recv() {
                report.merge(self.execute(task).await);
                progressed = true;
            }

            while let Some(event) = self.observer.try_next_event() {
                report.merge(self.handle_timeline_event(event).await);
                progressed = true;
            }

            if !progressed {
                break;
            }
        }

        report
    }

    /// 持续运行，直到所有任务派发端都被丢弃
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                task = self.tasks.recv() => match task {
                    Some(task) => {
                        self.execute(task).await;
                    }
                    None => break,
                },
                Some(event) = self.observer.next_event(), if self.observer.is_observing() => {
                    self.handle_timeline_event(event).await;
                }
            }
        }
        tracing::debug!("任务队列已关闭，工作者退出");
    }

    async fn execute(&mut self, task: OverlayTask) -> TranslationReport {
        let kind = task.kind();
        tracing::debug!("执行任务 {}", kind);

        match task {
            OverlayTask::SavePreference { room_id, language } => {
                if let Err(e) = self.cache.save_room_preference(&room_id, &language).await {
                    self.report_failure(kind, e);
                }
                TranslationReport::default()
            }
            OverlayTask::EnsureObserving => {
                self.observer.ensure_observing(&self.timeline);
                TranslationReport::default()
            }
            OverlayTask::TranslateTimeline { language } => {
                self.current_language = Some(language.clone());
                let report = self
                    .injector
                    .translate(&language, self.timeline.message_list())
                    .await;
                self.report_errors(kind, &report);
                report
            }
        }
    }

    async fn handle_timeline_event(&mut self, event: TimelineEvent) -> TranslationReport {
        let Some(language) = self.current_language.clone() else {
            return TranslationReport::default();
        };

        let report = TimelineObserver::handle_event(&self.injector, &language, event).await;
        self.report_errors(TaskKind::TranslateAppended, &report);
        report
    }

    fn report_errors(&self, kind: TaskKind, report: &TranslationReport) {
        for error in &report.errors {
            self.report_failure(kind, error.clone());
        }
    }

    fn report_failure(&self, kind: TaskKind, error: TranslationError) {
        tracing::warn!("任务 {} 失败: {}", kind, error);
        // 没人接收失败时只保留日志
        let _ = self.failures.send(TaskFailure { kind, error });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::TranslationFetcher;
    use crate::translation::error::TranslationResult;
    use crate::translation::resolver::TranslationResolver;
    use crate::translation::storage::{KvStore, MemoryStore, StoreTable};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct EchoFetcher;

    #[async_trait]
    impl TranslationFetcher for EchoFetcher {
        async fn fetch_translation(&self, text: &str, language: &str) -> TranslationResult<String> {
            Ok(format!("{}|{}", language, text))
        }
    }

    struct ReadOnlyStore;

    impl KvStore for ReadOnlyStore {
        fn load(&self, _table: StoreTable, _key: &str) -> TranslationResult<Option<String>> {
            Ok(None)
        }

        fn save(&self, _table: StoreTable, _key: &str, _value: &str) -> TranslationResult<()> {
            Err(TranslationError::StorageError("read-only".to_string()))
        }
    }

    const PAGE: &str = r#"<html><body><ol class="mx_RoomView_MessageList"><li class="mx_EventTile"><div class="mx_EventTile_line"><div class="mx_translatable" data-user-id="@bob:hs"><span>hello</span></div></div></li></ol></body></html>"#;

    fn worker(store: Arc<dyn KvStore>) -> (Rc<Timeline>, TaskQueue, OverlayWorker, mpsc::UnboundedReceiver<TaskFailure>) {
        let timeline = Rc::new(Timeline::parse(PAGE).unwrap());
        let cache = TranslationCache::new(store);
        let injector = DomTranslationInjector::new(
            TranslationResolver::new(cache.clone(), Arc::new(EchoFetcher)),
            Some("@me:hs".to_string()),
        );
        let (queue, rx) = task_queue();
        let (worker, failures) = OverlayWorker::new(Rc::clone(&timeline), injector, cache, rx);
        (timeline, queue, worker, failures)
    }

    #[tokio::test]
    async fn test_translate_timeline_then_appended_tiles() {
        let (timeline, queue, mut worker, _failures) = worker(Arc::new(MemoryStore::new()));

        queue.dispatch(OverlayTask::EnsureObserving);
        queue.dispatch(OverlayTask::TranslateTimeline {
            language: "en".to_string(),
        });
        let report = worker.run_pending().await;
        assert_eq!(report.translated, 1);
        assert_eq!(worker.current_language(), Some("en"));
        assert!(worker.observer().is_observing());

        timeline
            .append_html(r#"<li class="mx_EventTile"><div class="mx_EventTile_line"><div class="mx_translatable" data-user-id="@carol:hs"><span>later</span></div></div></li>"#)
            .unwrap();
        let report = worker.run_pending().await;
        assert_eq!(report.translated, 1);
        assert!(timeline.to_html().unwrap().contains("en|later"));
    }

    #[tokio::test]
    async fn test_appends_before_language_are_ignored() {
        let (timeline, queue, mut worker, _failures) = worker(Arc::new(MemoryStore::new()));
        queue.dispatch(OverlayTask::EnsureObserving);
        worker.run_pending().await;

        timeline.append_html(r#"<li class="mx_EventTile"><div class="mx_EventTile_line"><div class="mx_translatable" data-user-id="@c:hs"><span>x</span></div></div></li>"#).unwrap();
        let report = worker.run_pending().await;
        assert_eq!(report.translated, 0);
    }

    #[tokio::test]
    async fn test_save_failure_is_reported() {
        let (_timeline, queue, mut worker, mut failures) = worker(Arc::new(ReadOnlyStore));

        queue.dispatch(OverlayTask::SavePreference {
            room_id: "!room:hs".to_string(),
            language: "en".to_string(),
        });
        worker.run_pending().await;

        let failure = failures.try_recv().unwrap();
        assert_eq!(failure.kind, TaskKind::SavePreference);
        assert!(matches!(failure.error, TranslationError::StorageError(_)));
    }

    #[tokio::test]
    async fn test_run_exits_when_queue_dropped() {
        let (_timeline, queue, worker, _failures) = worker(Arc::new(MemoryStore::new()));
        queue.dispatch(OverlayTask::EnsureObserving);
        drop(queue);
        worker.run().await;
    }

    /// 等待时间线 HTML 满足条件，最多约一秒
    async fn wait_for_html(timeline: &Timeline, pred: impl Fn(&str) -> bool) -> String {
        for _ in 0..100 {
            let html = timeline.to_html().unwrap();
            if pred(&html) {
                return html;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        timeline.to_html().unwrap()
    }

    #[tokio::test]
    async fn test_run_translates_live_appends() {
        let (timeline, queue, worker, _failures) = worker(Arc::new(MemoryStore::new()));
        let local = tokio::task::LocalSet::new();

        local
            .run_until(async move {
                let handle = tokio::task::spawn_local(worker.run());

                queue.dispatch(OverlayTask::EnsureObserving);
                queue.dispatch(OverlayTask::TranslateTimeline {
                    language: "en".to_string(),
                });
                let html = wait_for_html(&timeline, |html| html.contains("en|hello")).await;
                assert_eq!(html.matches("mx_translate_content").count(), 1);

                // 观察者已挂上，运行中的工作者处理新追加的消息
                timeline
                    .append_html(r#"<li class="mx_EventTile"><div class="mx_EventTile_line"><div class="mx_translatable" data-user-id="@carol:hs"><span>x</span></div></div></li>"#)
                    .unwrap();
                let html = wait_for_html(&timeline, |html| html.contains("en|x")).await;
                assert!(html.contains("<span>(文本内容：x-en)</span>"));
                assert_eq!(html.matches("mx_translate_content").count(), 2);

                drop(queue);
                handle.await.unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_run_exits_after_timeline_handle_dropped() {
        let (timeline, queue, worker, _failures) = worker(Arc::new(MemoryStore::new()));
        let local = tokio::task::LocalSet::new();

        local
            .run_until(async move {
                let handle = tokio::task::spawn_local(worker.run());

                queue.dispatch(OverlayTask::EnsureObserving);
                for _ in 0..100 {
                    if timeline.subscriber_count() == 1 {
                        break;
                    }
                    tokio::task::yield_now().await;
                }
                assert_eq!(timeline.subscriber_count(), 1);

                // 工作者仍在观察时丢掉外部持有的时间线，队列关闭后照样退出
                drop(timeline);
                tokio::task::yield_now().await;
                drop(queue);
                handle.await.unwrap();
            })
            .await;
    }

    #[test]
    fn test_dispatch_after_worker_gone() {
        let (queue, rx) = task_queue();
        drop(rx);
        assert!(!queue.dispatch(OverlayTask::EnsureObserving));
    }
}
