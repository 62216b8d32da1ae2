//! 房间时间线
//!
//! 持有已渲染的时间线 DOM，新消息通过 `append_tiles` 挂到消息列表容器下。
//! 每次追加都会向订阅者广播一条 `TimelineEvent::TilesAppended`，
//! 其中已经带好每个消息块的正文行和可翻译消息，订阅者无需再回头查 DOM。

use std::cell::RefCell;

use markup5ever_rcdom::{Handle, RcDom};
use tokio::sync::mpsc;

use crate::parsers::html::{
    append_child, find_first, get_child_node_by_class, has_class, html_to_dom,
    parse_fragment_elements, serialize_document,
};
use crate::translation::config::constants::{EVENT_TILE_LINE_CLASS, MESSAGE_LIST_CLASS};
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::injector::{collect_messages, TranslatableMessage};

/// 一个新追加的消息块
#[derive(Debug, Clone)]
pub struct AppendedTile {
    pub tile: Handle,
    /// `mx_EventTile_line` 直接子元素
    pub line: Option<Handle>,
    /// 正文行中的可翻译消息
    pub messages: Vec<TranslatableMessage>,
}

impl AppendedTile {
    fn from_tile(tile: Handle) -> Self {
        let line = get_child_node_by_class(&tile, EVENT_TILE_LINE_CLASS);
        let messages = line.as_ref().map(collect_messages).unwrap_or_default();
        Self {
            tile,
            line,
            messages,
        }
    }
}

/// 时间线事件
#[derive(Debug, Clone)]
pub enum TimelineEvent {
    TilesAppended(Vec<AppendedTile>),
}

pub struct Timeline {
    dom: RcDom,
    message_list: Handle,
    subscribers: RefCell<Vec<mpsc::UnboundedSender<TimelineEvent>>>,
}

impl Timeline {
    /// 解析时间线页面，要求存在消息列表容器
    pub fn parse(html: &str) -> TranslationResult<Self> {
        let dom = html_to_dom(html.as_bytes(), "utf-8")?;
        Self::from_dom(dom)
    }

    pub fn from_dom(dom: RcDom) -> TranslationResult<Self> {
        let message_list = find_first(&dom.document, &|node| has_class(node, MESSAGE_LIST_CLASS))
            .ok_or_else(|| {
                TranslationError::ParseError(format!("找不到消息列表容器 .{}", MESSAGE_LIST_CLASS))
            })?;

        Ok(Self {
            dom,
            message_list,
            subscribers: RefCell::new(Vec::new()),
        })
    }

    pub fn document(&self) -> &Handle {
        &self.dom.document
    }

    pub fn message_list(&self) -> &Handle {
        &self.message_list
    }

    /// 订阅追加事件
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<TimelineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.borrow_mut().push(tx);
        rx
    }

    /// 仍然存活的订阅者数量
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    pub fn append_tile(&self, tile: Handle) -> usize {
        self.append_tiles(vec![tile])
    }

    /// 把消息块挂到消息列表末尾并广播
    pub fn append_tiles(&self, tiles: Vec<Handle>) -> usize {
        if tiles.is_empty() {
            return 0;
        }

        let appended: Vec<AppendedTile> = tiles
            .into_iter()
            .map(|tile| {
                append_child(&self.message_list, tile.clone());
                AppendedTile::from_tile(tile)
            })
            .collect();
        let count = appended.len();

        let event = TimelineEvent::TilesAppended(appended);
        self.subscribers
            .borrow_mut()
            .retain(|tx| tx.send(event.clone()).is_ok());

        tracing::trace!("时间线追加 {} 个消息块", count);
        count
    }

    /// 解析 HTML 片段并追加其中的顶层元素
    pub fn append_html(&self, html: &str) -> TranslationResult<usize> {
        let tiles = parse_fragment_elements(html)?;
        Ok(self.append_tiles(tiles))
    }

    pub fn to_html(&self) -> TranslationResult<String> {
        let bytes = serialize_document(&self.dom.document, "utf-8")?;
        String::from_utf8(bytes).map_err(|e| TranslationError::ParseError(e.to_string()))
    }
}
