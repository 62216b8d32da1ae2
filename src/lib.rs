//! # Timeline Translate
//!
//! 聊天客户端房间时间线的机器翻译层：用户在房间头部选择目标语言后，
//! 时间线上其他人发送的消息下方会追加译文，新到的消息同样会被翻译。
//! 译文按内容哈希缓存，房间的语言选择在重新进入后恢复。
//!
//! ## 模块组织
//!
//! - `env` - 环境变量
//! - `network` - 远程翻译接口
//! - `parsers` - HTML 解析、查询和序列化
//! - `translation` - 翻译层本体
//! - `org` - 组织目录
//! - `recovery_key` - 备份密钥的账户数据读写

pub mod env;
pub mod network;
pub mod org;
pub mod parsers;
pub mod recovery_key;
pub mod translation;

// Re-export commonly used items for convenience
pub use network::*;
pub use parsers::*;
