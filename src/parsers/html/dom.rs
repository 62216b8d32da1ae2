use std::cell::RefCell;
use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::interface::{Attribute, QualName};
use html5ever::parse_document;
use html5ever::tendril::{format_tendril, StrTendril, TendrilSink};
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

use crate::translation::error::{TranslationError, TranslationResult};

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> TranslationResult<RcDom> {
    let s: String = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => {
            let (string, _, _) = encoding.decode(data);
            string.to_string()
        }
        None => String::from_utf8_lossy(data).to_string(),
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
        .map_err(|e| TranslationError::ParseError(format!("HTML解析失败: {}", e)))
}

/// 解析 HTML 片段，返回 body 下的顶层元素（已与临时文档断开）
pub fn parse_fragment_elements(html: &str) -> TranslationResult<Vec<Handle>> {
    let wrapped = format!("<!DOCTYPE html><html><head></head><body>{}</body></html>", html);
    let dom = html_to_dom(wrapped.as_bytes(), "utf-8")?;

    let body = find_first(&dom.document, &|node| get_node_name(node) == Some("body"))
        .ok_or_else(|| TranslationError::ParseError("片段缺少 body".to_string()))?;

    let elements: Vec<Handle> = body
        .children
        .borrow()
        .iter()
        .filter(|child| is_element(child))
        .cloned()
        .collect();

    for element in &elements {
        detach(element);
    }

    Ok(elements)
}

/// 是否为元素节点
pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => {
            for attr in attrs.borrow().iter() {
                if &*attr.name.local == attr_name {
                    return Some(attr.value.to_string());
                }
            }
            None
        }
        _ => None,
    }
}

/// 节点的 class 属性中是否包含指定类名
pub fn has_class(node: &Handle, class_name: &str) -> bool {
    get_node_attr(node, "class")
        .map(|classes| classes.split_ascii_whitespace().any(|c| c == class_name))
        .unwrap_or(false)
}

/// 深度优先查找第一个满足条件的节点（包含自身）
pub fn find_first(node: &Handle, predicate: &dyn Fn(&Handle) -> bool) -> Option<Handle> {
    if predicate(node) {
        return Some(node.clone());
    }

    for child in node.children.borrow().iter() {
        if let Some(found) = find_first(child, predicate) {
            return Some(found);
        }
    }

    None
}

/// 按文档顺序收集带指定类名的元素
///
/// `include_self` 为 true 时根节点本身也参与匹配。
pub fn find_by_class(root: &Handle, class_name: &str, include_self: bool) -> Vec<Handle> {
    let mut found_nodes = Vec::new();

    if include_self && has_class(root, class_name) {
        found_nodes.push(root.clone());
    }

    for child in root.children.borrow().iter() {
        collect_by_class(child, class_name, &mut found_nodes);
    }

    found_nodes
}

fn collect_by_class(node: &Handle, class_name: &str, found_nodes: &mut Vec<Handle>) {
    if has_class(node, class_name) {
        found_nodes.push(node.clone());
    }

    for child in node.children.borrow().iter() {
        collect_by_class(child, class_name, found_nodes);
    }
}

/// 根据类名获取直接子元素
pub fn get_child_node_by_class(parent: &Handle, class_name: &str) -> Option<Handle> {
    let children = parent.children.borrow();
    children
        .iter()
        .find(|child| has_class(child, class_name))
        .cloned()
}

/// 第一个子节点（任意类型）
pub fn first_child(node: &Handle) -> Option<Handle> {
    node.children.borrow().first().cloned()
}

/// 节点及其后代的全部文本
pub fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    push_text(node, &mut text);
    text
}

fn push_text(node: &Handle, text: &mut String) {
    if let NodeData::Text { ref contents } = node.data {
        text.push_str(&contents.borrow());
    }

    for child in node.children.borrow().iter() {
        push_text(child, text);
    }
}

/// 创建元素节点
pub fn create_element(tag: &str, attrs: &[(&str, &str)]) -> Handle {
    let attrs = attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*name)),
            value: format_tendril!("{}", value),
        })
        .collect();

    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(tag)),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// 创建文本节点
pub fn create_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    })
}

/// 深拷贝节点（不带父节点）
pub fn deep_clone(node: &Handle) -> Handle {
    let data = match &node.data {
        NodeData::Document => NodeData::Document,
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => NodeData::Doctype {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
        NodeData::Text { contents } => NodeData::Text {
            contents: RefCell::new(contents.borrow().clone()),
        },
        NodeData::Comment { contents } => NodeData::Comment {
            contents: contents.clone(),
        },
        NodeData::Element {
            name,
            attrs,
            template_contents,
            mathml_annotation_xml_integration_point,
        } => NodeData::Element {
            name: name.clone(),
            attrs: RefCell::new(attrs.borrow().clone()),
            template_contents: RefCell::new(template_contents.borrow().as_ref().map(deep_clone)),
            mathml_annotation_xml_integration_point: *mathml_annotation_xml_integration_point,
        },
        NodeData::ProcessingInstruction { target, contents } => {
            NodeData::ProcessingInstruction {
                target: target.clone(),
                contents: contents.clone(),
            }
        }
    };

    let copy = Node::new(data);
    for child in node.children.borrow().iter() {
        append_child(&copy, deep_clone(child));
    }
    copy
}

/// 将节点追加为最后一个子节点
pub fn append_child(parent: &Handle, child: Handle) {
    detach(&child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// 将节点从父节点上摘下
pub fn detach(node: &Handle) {
    let parent = node.parent.take().and_then(|weak| weak.upgrade());
    if let Some(parent) = parent {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
}

/// 删除所有带指定类名的直接子元素，返回删除数量
pub fn remove_children_by_class(parent: &Handle, class_name: &str) -> usize {
    let removed: Vec<Handle> = parent
        .children
        .borrow()
        .iter()
        .filter(|child| has_class(child, class_name))
        .cloned()
        .collect();

    for node in &removed {
        detach(node);
    }

    removed.len()
}
