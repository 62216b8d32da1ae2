//! 备份密钥
//!
//! 把恢复密钥存到账户数据 `m.secret_storage.backup_key` 下，或从本地缓存
//! / 服务端读回。账户数据的读写由聊天客户端实现，这里只是薄薄一层。

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::translation::error::TranslationResult;

/// 账户数据事件类型
pub const BACKUP_KEY_EVENT_TYPE: &str = "m.secret_storage.backup_key";

/// 聊天客户端的账户数据接口
#[async_trait]
pub trait AccountDataClient: Send + Sync {
    /// 写入账户数据
    async fn set_account_data(&self, event_type: &str, content: Value) -> TranslationResult<()>;

    /// 本地已同步的账户数据
    fn account_data(&self, event_type: &str) -> Option<Value>;

    /// 直接向服务端查询
    async fn account_data_from_server(&self, event_type: &str) -> TranslationResult<Option<Value>>;
}

pub async fn store_recovery_key(client: &dyn AccountDataClient, key: &str) -> TranslationResult<()> {
    client
        .set_account_data(BACKUP_KEY_EVENT_TYPE, json!({ "key": key }))
        .await
}

/// 从本地缓存的账户数据中取密钥
pub fn recovery_key_from_store(client: &dyn AccountDataClient) -> Option<String> {
    client
        .account_data(BACKUP_KEY_EVENT_TYPE)?
        .get("key")?
        .as_str()
        .map(str::to_string)
}

/// 服务端返回的原始内容
pub async fn recovery_key_from_server(
    client: &dyn AccountDataClient,
) -> TranslationResult<Option<Value>> {
    client.account_data_from_server(BACKUP_KEY_EVENT_TYPE).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::error::TranslationError;
    use dashmap::DashMap;

    #[derive(Default)]
    struct FakeClient {
        local: DashMap<String, Value>,
        server: DashMap<String, Value>,
        offline: bool,
    }

    #[async_trait]
    impl AccountDataClient for FakeClient {
        async fn set_account_data(&self, event_type: &str, content: Value) -> TranslationResult<()> {
            if self.offline {
                return Err(TranslationError::AccountDataError("M_UNKNOWN".to_string()));
            }
            self.server.insert(event_type.to_string(), content.clone());
            self.local.insert(event_type.to_string(), content);
            Ok(())
        }

        fn account_data(&self, event_type: &str) -> Option<Value> {
            self.local.get(event_type).map(|v| v.value().clone())
        }

        async fn account_data_from_server(&self, event_type: &str) -> TranslationResult<Option<Value>> {
            Ok(self.server.get(event_type).map(|v| v.value().clone()))
        }
    }

    #[tokio::test]
    async fn test_store_and_read_back() {
        let client = FakeClient::default();
        assert_eq!(recovery_key_from_store(&client), None);

        store_recovery_key(&client, "EsTc abcd").await.unwrap();
        assert_eq!(recovery_key_from_store(&client).as_deref(), Some("EsTc abcd"));
        assert_eq!(
            recovery_key_from_server(&client).await.unwrap(),
            Some(json!({ "key": "EsTc abcd" }))
        );
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let client = FakeClient {
            offline: true,
            ..Default::default()
        };
        assert!(store_recovery_key(&client, "k").await.is_err());
    }

    #[test]
    fn test_content_without_key() {
        let client = FakeClient::default();
        client
            .local
            .insert(BACKUP_KEY_EVENT_TYPE.to_string(), json!({ "other": 1 }));
        assert_eq!(recovery_key_from_store(&client), None);
    }
}
