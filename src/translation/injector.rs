//! 时间线译文注入
//!
//! 在给定范围内找到可翻译的消息元素，取得译文，并在消息元素末尾追加
//! `mx_translate_content` 节点。每条消息各自提交：某条消息失败或变慢，
//! 不影响已经完成的消息，也不会中断同一批次的后续消息。

use markup5ever_rcdom::Handle;

use crate::parsers::html::{
    append_child, create_element, create_text, deep_clone, find_by_class, first_child,
    get_node_attr, remove_children_by_class, text_content,
};
use crate::translation::config::constants::{
    AUTHOR_ATTR, TRANSLATABLE_CLASS, TRANSLATED_CONTENT_CLASS,
};
use crate::translation::error::TranslationError;
use crate::translation::resolver::TranslationResolver;

/// 一条已渲染的可翻译消息
#[derive(Debug, Clone)]
pub struct TranslatableMessage {
    /// 带 `mx_translatable` 的消息元素
    pub element: Handle,
    /// `data-user-id` 属性
    pub author_id: Option<String>,
    /// 原文节点（消息元素的第一个子节点）
    pub original: Option<Handle>,
}

impl TranslatableMessage {
    pub fn from_element(element: &Handle) -> Self {
        Self {
            element: element.clone(),
            author_id: get_node_attr(element, AUTHOR_ATTR),
            original: first_child(element),
        }
    }

    /// 原文文本
    pub fn original_text(&self) -> Option<String> {
        self.original.as_ref().map(text_content)
    }

    fn is_authored_by(&self, user_id: Option<&str>) -> bool {
        match (self.author_id.as_deref(), user_id) {
            (Some(author), Some(user)) => author == user,
            (None, None) => true,
            _ => false,
        }
    }
}

/// 收集范围内（包含范围根节点）的全部可翻译消息，按文档顺序
pub fn collect_messages(scope: &Handle) -> Vec<TranslatableMessage> {
    find_by_class(scope, TRANSLATABLE_CLASS, true)
        .iter()
        .map(TranslatableMessage::from_element)
        .collect()
}

/// 原文提示标签
pub fn source_label(text: &str, language: &str) -> String {
    format!("(文本内容：{}-{})", text, language)
}

/// 一次注入的结果
#[derive(Debug, Default, Clone)]
pub struct TranslationReport {
    /// 追加了译文节点的消息数
    pub translated: usize,
    /// 本地用户自己发送、被跳过的消息数
    pub skipped_own: usize,
    /// 缺少原文节点的消息数
    pub malformed: usize,
    /// 移除的旧译文节点数
    pub removed: usize,
    /// 单条消息的失败
    pub errors: Vec<TranslationError>,
}

impl TranslationReport {
    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn merge(&mut self, other: TranslationReport) {
        self.translated += other.translated;
        self.skipped_own += other.skipped_own;
        self.malformed += other.malformed;
        self.removed += other.removed;
        self.errors.extend(other.errors);
    }
}

/// DOM 译文注入器
pub struct DomTranslationInjector {
    resolver: TranslationResolver,
    local_user_id: Option<String>,
}

impl DomTranslationInjector {
    pub fn new(resolver: TranslationResolver, local_user_id: Option<String>) -> Self {
        Self {
            resolver,
            local_user_id,
        }
    }

    pub fn resolver(&self) -> &TranslationResolver {
        &self.resolver
    }

    /// 翻译 `scope` 下的全部可翻译消息
    pub async fn translate(&self, language: &str, scope: &Handle) -> TranslationReport {
        let messages = collect_messages(scope);
        self.translate_messages(language, &messages).await
    }

    /// 逐条翻译已收集的消息
    pub async fn translate_messages(
        &self,
        language: &str,
        messages: &[TranslatableMessage],
    ) -> TranslationReport {
        let mut report = TranslationReport::default();

        for message in messages {
            report.removed += remove_children_by_class(&message.element, TRANSLATED_CONTENT_CLASS);

            if message.is_authored_by(self.local_user_id.as_deref()) {
                report.skipped_own += 1;
                continue;
            }

            let (original, source_text) = match (&message.original, message.original_text()) {
                (Some(original), Some(text)) => (original, text),
                _ => {
                    tracing::warn!(
                        "消息缺少原文节点，跳过 (author={:?})",
                        message.author_id
                    );
                    report.malformed += 1;
                    report.errors.push(TranslationError::MalformedMessage(format!(
                        "author={:?}",
                        message.author_id
                    )));
                    continue;
                }
            };

            match self.resolver.resolve(&source_text, language).await {
                Ok(translated) => {
                    let node = build_translated_node(original, &source_text, language, &translated);
                    // 等待期间其他翻译过程可能已经追加过，保证只留一个
                    remove_children_by_class(&message.element, TRANSLATED_CONTENT_CLASS);
                    append_child(&message.element, node);
                    report.translated += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "消息翻译失败，保留原文 (author={:?}): {}",
                        message.author_id,
                        e
                    );
                    report.errors.push(e);
                }
            }
        }

        tracing::debug!(
            "翻译完成 -> {}: 成功 {}，跳过自己 {}，失败 {}",
            language,
            report.translated,
            report.skipped_own,
            report.failed()
        );
        report
    }
}

fn build_translated_node(
    original: &Handle,
    source_text: &str,
    language: &str,
    translated: &str,
) -> Handle {
    let container = create_element("div", &[("class", TRANSLATED_CONTENT_CLASS)]);

    let label = create_element("span", &[]);
    append_child(&label, create_text(&source_label(source_text, language)));

    let body = create_element("span", &[]);
    append_child(&body, create_text(translated));

    append_child(&container, deep_clone(original));
    append_child(&container, label);
    append_child(&container, body);
    container
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::TranslationFetcher;
    use crate::parsers::html::{find_first, has_class, html_to_dom, serialize_node};
    use crate::translation::error::TranslationResult;
    use crate::translation::storage::{MemoryStore, TranslationCache};
    use async_trait::async_trait;
    use markup5ever_rcdom::RcDom;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct PrefixFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TranslationFetcher for PrefixFetcher {
        async fn fetch_translation(&self, text: &str, language: &str) -> TranslationResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.contains("unreachable") {
                return Err(TranslationError::NetworkError("timeout".to_string()));
            }
            Ok(format!("<{}> {}", language, text))
        }
    }

    fn injector(fetcher: Arc<PrefixFetcher>) -> DomTranslationInjector {
        let cache = TranslationCache::new(Arc::new(MemoryStore::new()));
        DomTranslationInjector::new(
            TranslationResolver::new(cache, fetcher),
            Some("@me:org1.helium".to_string()),
        )
    }

    // 文档释放时会清空整棵子树，测试期间保留 RcDom
    fn list(html: &str) -> (RcDom, Handle) {
        let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
        let root = find_first(&dom.document, &|n| has_class(n, "list")).unwrap();
        (dom, root)
    }

    fn translated_nodes(element: &Handle) -> Vec<Handle> {
        element
            .children
            .borrow()
            .iter()
            .filter(|c| has_class(c, TRANSLATED_CONTENT_CLASS))
            .cloned()
            .collect()
    }

    #[tokio::test]
    async fn test_translates_other_users_messages() {
        let fetcher = Arc::new(PrefixFetcher::default());
        let injector = injector(Arc::clone(&fetcher));
        let (_dom, root) = list(
            r#"<div class="list"><div class="mx_translatable" data-user-id="@bob:org1.helium"><span>hello</span></div></div>"#,
        );

        let report = injector.translate("zh-hans", &root).await;
        assert_eq!(report.translated, 1);

        let message = &collect_messages(&root)[0];
        let nodes = translated_nodes(&message.element);
        assert_eq!(nodes.len(), 1);
        assert_eq!(
            serialize_node(&nodes[0]).unwrap(),
            r#"<div class="mx_translate_content"><span>hello</span><span>(文本内容：hello-zh-hans)</span><span>&lt;zh-hans&gt; hello</span></div>"#
        );
        // 译文节点是最后一个子节点
        assert!(has_class(
            message.element.children.borrow().last().unwrap(),
            TRANSLATED_CONTENT_CLASS
        ));
    }

    #[tokio::test]
    async fn test_skips_own_messages() {
        let fetcher = Arc::new(PrefixFetcher::default());
        let injector = injector(Arc::clone(&fetcher));
        let (_dom, root) = list(
            r#"<div class="list"><div class="mx_translatable" data-user-id="@me:org1.helium"><span>mine</span><div class="mx_translate_content">stale</div></div></div>"#,
        );

        let report = injector.translate("en", &root).await;
        assert_eq!(report.skipped_own, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(report.translated, 0);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert!(translated_nodes(&collect_messages(&root)[0].element).is_empty());
    }

    #[tokio::test]
    async fn test_language_switch_replaces_translation() {
        let fetcher = Arc::new(PrefixFetcher::default());
        let injector = injector(Arc::clone(&fetcher));
        let (_dom, root) = list(
            r#"<div class="list"><div class="mx_translatable" data-user-id="@bob:org1.helium"><span>hello</span></div></div>"#,
        );

        injector.translate("en", &root).await;
        let report = injector.translate("zh-hans", &root).await;
        assert_eq!(report.removed, 1);

        let nodes = translated_nodes(&collect_messages(&root)[0].element);
        assert_eq!(nodes.len(), 1);
        assert!(text_content(&nodes[0]).ends_with("<zh-hans> hello"));
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_one_message() {
        let fetcher = Arc::new(PrefixFetcher::default());
        let injector = injector(Arc::clone(&fetcher));
        let (_dom, root) = list(
            r#"<div class="list"><div class="mx_translatable" data-user-id="@a:hs"><span>first</span></div><div class="mx_translatable" data-user-id="@b:hs"><span>unreachable</span></div><div class="mx_translatable" data-user-id="@c:hs"><span>third</span></div></div>"#,
        );

        let report = injector.translate("en", &root).await;
        assert_eq!(report.translated, 2);
        assert_eq!(report.failed(), 1);

        let messages = collect_messages(&root);
        assert_eq!(translated_nodes(&messages[0].element).len(), 1);
        assert!(translated_nodes(&messages[1].element).is_empty());
        assert_eq!(translated_nodes(&messages[2].element).len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_message_is_skipped() {
        let fetcher = Arc::new(PrefixFetcher::default());
        let injector = injector(Arc::clone(&fetcher));
        let (_dom, root) = list(
            r#"<div class="list"><div class="mx_translatable" data-user-id="@bob:hs"></div></div>"#,
        );

        let report = injector.translate("en", &root).await;
        assert_eq!(report.malformed, 1);
        assert!(matches!(
            report.errors[0],
            TranslationError::MalformedMessage(_)
        ));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_scope_root_itself_is_translated() {
        let fetcher = Arc::new(PrefixFetcher::default());
        let injector = injector(Arc::clone(&fetcher));
        let (_dom, root) = list(
            r#"<div class="list mx_translatable" data-user-id="@bob:hs"><span>direct</span></div>"#,
        );

        let report = injector.translate("en", &root).await;
        assert_eq!(report.translated, 1);
        assert_eq!(translated_nodes(&root).len(), 1);
    }

    #[test]
    fn test_missing_local_user_translates_everything_with_author() {
        let (_dom, root) = list(
            r#"<div class="list"><div class="mx_translatable" data-user-id="@a:hs"><span>x</span></div><div class="mx_translatable"><span>y</span></div></div>"#,
        );
        let messages = collect_messages(&root);
        assert!(!messages[0].is_authored_by(None));
        // 没有作者也没有本地用户时视为同一人
        assert!(messages[1].is_authored_by(None));
    }
}
