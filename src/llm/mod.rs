//! LLM能力抽象与客户端实现

use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;

use crate::error::PipelineError;

pub mod client;

pub use client::LLMClient;

/// 流式补全的token序列
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, PipelineError>> + Send>>;

/// 补全能力抽象
///
/// 调研管线各阶段仅依赖该能力，便于在测试中替换为mock实现。
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// 单次非流式补全
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// 流式补全，按token批次产出文本增量
    async fn complete_stream(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<TokenStream>;
}
