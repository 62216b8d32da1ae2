//! 组织目录
//!
//! 查询组织列表并按 id / 别名 / 名称互相换算。

mod directory;

pub use directory::{org_id_from_user_id, OrgDirectory, OrgItem, ORGANIZATIONS_PATH};
