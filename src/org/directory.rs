use std::sync::{RwLock, RwLockReadGuard};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::translation::config::TranslationConfig;
use crate::translation::error::{TranslationError, TranslationResult};

/// 组织列表接口路径
pub const ORGANIZATIONS_PATH: &str = "/heliumos-org-api/v1/pubcc/organizations";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrgItem {
    pub id: String,
    pub name: String,
    pub alias: String,
    pub description: String,
    pub create_time: String,
    pub update_time: String,
}

#[derive(Debug, Deserialize)]
struct OrgListResponse {
    #[serde(default)]
    data: Option<Vec<OrgItem>>,
}

/// 从用户 ID 推出所在组织：服务器名的第二段
///
/// `@alice:org1.helium` → `helium`，取不到时为空串。
pub fn org_id_from_user_id(user_id: &str) -> String {
    user_id
        .split(':')
        .nth(1)
        .and_then(|server| server.split('.').nth(1))
        .unwrap_or_default()
        .to_string()
}

/// 组织目录服务
pub struct OrgDirectory {
    client: Client,
    base: Url,
    current_org_id: String,
    orgs: RwLock<Vec<OrgItem>>,
}

impl OrgDirectory {
    pub fn new(base: &str, user_id: &str) -> TranslationResult<Self> {
        let base = Url::parse(base)?;
        Ok(Self {
            client: Client::new(),
            base,
            current_org_id: org_id_from_user_id(user_id),
            orgs: RwLock::new(Vec::new()),
        })
    }

    /// 用配置中的 `org_api_base` 和 `user_id` 创建
    pub fn from_config(config: &TranslationConfig) -> TranslationResult<Self> {
        let user_id = config.user_id.as_deref().unwrap_or_default();
        Self::new(&config.org_api_base, user_id)
    }

    /// 请求组织列表，不修改本地列表
    pub async fn query_org_list(&self) -> TranslationResult<Vec<OrgItem>> {
        let url = self.base.join(ORGANIZATIONS_PATH)?;
        tracing::debug!("请求组织列表: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::NetworkError(format!(
                "组织接口返回 {}",
                status
            )));
        }

        let body: OrgListResponse = response.json().await?;
        Ok(body.data.unwrap_or_default())
    }

    /// 请求并替换本地列表，返回组织数量
    pub async fn refresh(&self) -> TranslationResult<usize> {
        let orgs = self.query_org_list().await?;
        let count = orgs.len();
        self.set_org_list(orgs);
        tracing::info!("组织列表已更新: {} 个", count);
        Ok(count)
    }

    pub fn org_list(&self) -> Vec<OrgItem> {
        self.read().clone()
    }

    pub fn set_org_list(&self, orgs: Vec<OrgItem>) {
        let mut guard = self.orgs.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = orgs;
    }

    pub fn current_org_id(&self) -> &str {
        &self.current_org_id
    }

    pub fn current_org_alias(&self) -> String {
        self.org_alias_by_id(&self.current_org_id)
    }

    pub fn current_org_name(&self) -> String {
        self.org_name_by_id(&self.current_org_id)
    }

    pub fn org_by_id(&self, id: &str) -> Option<OrgItem> {
        self.find(|org| org.id == id)
    }

    pub fn org_by_alias(&self, alias: &str) -> Option<OrgItem> {
        self.find(|org| org.alias == alias)
    }

    pub fn org_by_name(&self, name: &str) -> Option<OrgItem> {
        self.find(|org| org.name == name)
    }

    pub fn org_alias_by_id(&self, id: &str) -> String {
        self.org_by_id(id).map(|org| org.alias).unwrap_or_default()
    }

    pub fn org_name_by_id(&self, id: &str) -> String {
        self.org_by_id(id).map(|org| org.name).unwrap_or_default()
    }

    pub fn org_id_by_alias(&self, alias: &str) -> String {
        self.org_by_alias(alias).map(|org| org.id).unwrap_or_default()
    }

    pub fn org_name_by_alias(&self, alias: &str) -> String {
        self.org_by_alias(alias).map(|org| org.name).unwrap_or_default()
    }

    pub fn org_id_by_name(&self, name: &str) -> String {
        self.org_by_name(name).map(|org| org.id).unwrap_or_default()
    }

    pub fn org_alias_by_name(&self, name: &str) -> String {
        self.org_by_name(name).map(|org| org.alias).unwrap_or_default()
    }

    fn find(&self, predicate: impl Fn(&OrgItem) -> bool) -> Option<OrgItem> {
        self.read().iter().find(|org| predicate(org)).cloned()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<OrgItem>> {
        self.orgs.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
