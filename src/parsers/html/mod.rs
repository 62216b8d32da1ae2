//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作（解析、查询、克隆、挂载）
//! - `serializer`: 序列化功能

pub mod dom;
pub mod serializer;

pub use dom::{
    append_child, create_element, create_text, deep_clone, detach, find_by_class, find_first,
    first_child, get_child_node_by_class, get_node_attr, get_node_name, has_class, html_to_dom,
    is_element, parse_fragment_elements, remove_children_by_class, text_content,
};
pub use serializer::{serialize_document, serialize_node};
