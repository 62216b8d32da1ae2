//! 远程翻译接口
//!
//! 单次请求/响应：不重试、不限速。失败只影响调用它的那一条消息。

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::translation::config::TranslationConfig;
use crate::translation::error::{TranslationError, TranslationResult};

/// 翻译接口抽象
#[async_trait]
pub trait TranslationFetcher: Send + Sync {
    /// 把 `text` 翻译成 `language`
    async fn fetch_translation(&self, text: &str, language: &str) -> TranslationResult<String>;
}

/// 接口响应体 `{ "data": "<译文>" }`
#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: Option<String>,
}

/// 基于 reqwest 的 HTTP 实现
///
/// 请求形如 `GET <api_url>?text=<原文>&target_lang=<语言>`。
pub struct HttpFetcher {
    client: Client,
    endpoint: Url,
}

impl HttpFetcher {
    pub fn new(config: &TranslationConfig) -> TranslationResult<Self> {
        let endpoint = Url::parse(&config.api_url)?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TranslationError::ConfigError(format!("创建HTTP客户端失败: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TranslationFetcher for HttpFetcher {
    async fn fetch_translation(&self, text: &str, language: &str) -> TranslationResult<String> {
        tracing::debug!("请求翻译: {} 字符 -> {}", text.chars().count(), language);

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("text", text), ("target_lang", language)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::NetworkError(format!(
                "翻译接口返回 {}",
                status
            )));
        }

        let body: TranslateResponse = response.json().await?;
        body.data
            .ok_or_else(|| TranslationError::ParseError("响应缺少 data 字段".to_string()))
    }
}
