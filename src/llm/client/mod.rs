//! LLM客户端 - 提供统一的LLM服务接口

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::LLMConfig;
use crate::llm::{CompletionBackend, TokenStream};

mod providers;
mod streaming;
pub mod utils;

use providers::ProviderClient;
use utils::evaluate_befitting_model;

/// LLM客户端
///
/// 非流式调用经由rig的provider客户端，流式调用走OpenAI兼容SSE端点。
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    client: ProviderClient,
    http: reqwest::Client,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = ProviderClient::new(&config)?;
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            config,
            client,
            http,
        })
    }

    /// 检查模型连接和功能是否正常
    pub async fn check_connection(&self) -> Result<()> {
        println!("🔄 正在检查模型连接...");
        match self
            .prompt("System: You are a helpful assistant.", "Hello")
            .await
        {
            Ok(_) => {
                println!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ 模型连接失败: {}", e);
                Err(e)
            }
        }
    }

    /// 通用重试逻辑，用于处理异步操作的重试机制
    async fn retry_with_backoff<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        let max_retries = self.config.retry_attempts;
        let retry_delay_ms = self.config.retry_delay_ms;
        let mut retries = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    retries += 1;
                    eprintln!(
                        "❌ 调用模型服务出错，重试中 (第 {} / {}次尝试): {}",
                        retries, max_retries, err
                    );
                    if retries >= max_retries {
                        return Err(err);
                    }
                    tokio::time::sleep(Duration::from_millis(retry_delay_ms)).await;
                }
            }
        }
    }

    /// 单轮非流式对话
    ///
    /// 按prompt规模选择模型，efficient失效时以powerful模型兜底。
    pub async fn prompt(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let (befitting_model, fallover_model) =
            evaluate_befitting_model(&self.config, system_prompt, user_prompt);

        let agent = self
            .client
            .create_agent(&befitting_model, system_prompt, &self.config);

        match self
            .retry_with_backoff(|| async { agent.prompt(user_prompt).await })
            .await
        {
            Ok(text) => Ok(text),
            Err(err) => match fallover_model {
                Some(model) => {
                    eprintln!(
                        "❌ 调用模型服务出错，尝试 {} 次均失败，尝试使用备选模型{}...{}",
                        self.config.retry_attempts, model, err
                    );
                    let agent = self.client.create_agent(&model, system_prompt, &self.config);
                    self.retry_with_backoff(|| async { agent.prompt(user_prompt).await })
                        .await
                }
                None => Err(err),
            },
        }
    }

    /// 流式对话（SSE）
    ///
    /// 流式路径不做客户端级重试，重试策略由调用方（查询生成器）掌握。
    pub async fn prompt_streaming(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<TokenStream> {
        streaming::open_stream(
            &self.http,
            &self.config,
            &self.config.model_efficient,
            system_prompt,
            user_prompt,
        )
        .await
    }
}

#[async_trait]
impl CompletionBackend for LLMClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.prompt(system_prompt, user_prompt).await
    }

    async fn complete_stream(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<TokenStream> {
        self.prompt_streaming(system_prompt, user_prompt).await
    }
}
