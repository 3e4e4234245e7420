//! 搜索能力抽象与Tavily客户端

use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::SearchConfig;

/// 搜索主题过滤（provider侧的结果倾向提示）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTopic {
    News,
    Finance,
}

impl SearchTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchTopic::News => "news",
            SearchTopic::Finance => "finance",
        }
    }
}

/// 单次搜索的请求参数
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// 搜索深度（basic/advanced）
    pub search_depth: String,
    /// 主题过滤
    pub topic: Option<SearchTopic>,
    /// 最大结果数
    pub max_results: u32,
}

impl SearchParams {
    /// 按配置构建默认参数
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            search_depth: config.search_depth.clone(),
            topic: None,
            max_results: config.max_results,
        }
    }

    pub fn with_topic(mut self, topic: Option<SearchTopic>) -> Self {
        self.topic = topic;
        self
    }
}

/// 搜索结果条目
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: f64,
}

/// 搜索能力抽象
///
/// 调研管线仅依赖该能力，便于在测试中替换为mock实现。
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, params: &SearchParams) -> Result<Vec<SearchHit>>;
}

/// Tavily搜索客户端
#[derive(Clone)]
pub struct TavilyClient {
    config: SearchConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

impl TavilyClient {
    /// 创建新的搜索客户端
    pub fn new(config: SearchConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl SearchBackend for TavilyClient {
    async fn search(&self, query: &str, params: &SearchParams) -> Result<Vec<SearchHit>> {
        let url = format!("{}/search", self.config.api_base_url.trim_end_matches('/'));

        let mut body = json!({
            "api_key": self.config.api_key,
            "query": query,
            "search_depth": params.search_depth,
            "include_raw_content": false,
            "max_results": params.max_results,
        });
        if let Some(topic) = params.topic {
            body["topic"] = json!(topic.as_str());
        }

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("搜索服务返回{}: {}", status, detail));
        }

        let parsed: TavilyResponse = response.json().await?;
        Ok(parsed.results)
    }
}
