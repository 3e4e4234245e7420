//! 查询生成器 - 流式生成检索查询，带超时重试与确定性兜底

use std::time::Duration;

use chrono::{Datelike, Utc};
use futures::StreamExt;
use serde_json::json;

use crate::error::PipelineError;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::types::Category;
use crate::prompts;

/// 单次生成最多保留的查询数
pub const MAX_QUERIES: usize = 4;

/// 将流式token切分为离散查询的缓冲状态机
///
/// token追加到增长缓冲；每个换行边界把换行前的内容定稿为一条查询，
/// 缓冲重置为剩余部分；流结束时非空的尾部缓冲同样定稿。
#[derive(Debug, Default)]
pub struct QueryStreamParser {
    buffer: String,
}

impl QueryStreamParser {
    /// 送入一个token批次，返回其中定稿的查询
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        if !self.buffer.contains('\n') {
            return Vec::new();
        }
        let mut parts: Vec<String> = self.buffer.split('\n').map(str::to_string).collect();
        // 最后一段是下一条查询的开头
        self.buffer = parts.pop().unwrap_or_default();
        parts
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// 当前未定稿的缓冲内容
    pub fn current(&self) -> &str {
        &self.buffer
    }

    /// 流结束，定稿剩余缓冲
    pub fn finish(self) -> Option<String> {
        let rest = self.buffer.trim();
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }
}

/// 查询生成器，按分析师角色（类目）构造
pub struct QueryGenerator {
    category: Category,
}

impl QueryGenerator {
    pub fn new(category: Category) -> Self {
        Self { category }
    }

    /// 生成检索查询
    ///
    /// 每次尝试整体受超时约束；重试间隔按尝试序号指数递增；
    /// 重试耗尽后返回确定性兜底查询，从不向调用方抛错。
    pub async fn generate(&self, ctx: &PipelineContext) -> Vec<String> {
        let company = ctx.profile.company.clone();
        let attempts = ctx.config.pipeline.query_retry_attempts.max(1);
        let timeout = Duration::from_secs(ctx.config.pipeline.query_timeout_seconds);
        let base_delay_ms = ctx.config.pipeline.query_retry_delay_ms;
        let mut last_error = String::new();

        for attempt in 0..attempts {
            println!(
                "🔍 正在为 {} 生成 {} 类检索查询 (第 {}/{} 次尝试)...",
                company,
                self.category,
                attempt + 1,
                attempts
            );

            match tokio::time::timeout(timeout, self.attempt(ctx)).await {
                Ok(Ok(queries)) => {
                    println!(
                        "✓ 已为 {} 生成 {} 条 {} 类查询",
                        company,
                        queries.len(),
                        self.category
                    );
                    return queries;
                }
                Ok(Err(err)) => {
                    last_error = err.to_string();
                    eprintln!("❌ {} 类查询生成失败: {}", self.category, last_error);
                }
                Err(_) => {
                    last_error =
                        PipelineError::Timeout(format!("{}秒", timeout.as_secs())).to_string();
                    eprintln!("❌ {} 类查询生成超时", self.category);
                }
            }

            if attempt + 1 < attempts {
                // 指数退避：base * 2^attempt
                let delay = base_delay_ms.saturating_mul(1u64 << attempt.min(16));
                println!("⏳ {}毫秒后重试...", delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        ctx.notify(
            "warning",
            &format!(
                "Using fallback queries for {} after {} failed attempts",
                company, attempts
            ),
            Some(json!({
                "step": "Research",
                "substep": "query_generation_fallback",
                "analyst": self.category.as_str(),
                "error": last_error,
            })),
        )
        .await;

        self.fallback_queries(&company, Utc::now().year())
    }

    /// 单次流式生成尝试
    async fn attempt(&self, ctx: &PipelineContext) -> Result<Vec<String>, PipelineError> {
        let system_prompt = prompts::query_system_prompt(&ctx.profile);
        let user_prompt = prompts::query_user_prompt(self.category, &ctx.profile);

        let mut stream = ctx
            .llm
            .complete_stream(&system_prompt, &user_prompt)
            .await
            .map_err(PipelineError::from)?;

        let mut parser = QueryStreamParser::default();
        let mut queries: Vec<String> = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            let completed = parser.push(&chunk);

            ctx.notify(
                "query_generating",
                &format!("Generating research query for {}", ctx.profile.company),
                Some(json!({
                    "query": parser.current(),
                    "query_number": queries.len() + completed.len() + 1,
                    "category": self.category.as_str(),
                    "is_complete": false,
                })),
            )
            .await;

            for query in completed {
                queries.push(query.clone());
                ctx.notify(
                    "query_generated",
                    &format!("Generated new research query for {}", ctx.profile.company),
                    Some(json!({
                        "query": query,
                        "query_number": queries.len(),
                        "category": self.category.as_str(),
                        "is_complete": true,
                    })),
                )
                .await;
            }
        }

        if let Some(rest) = parser.finish() {
            queries.push(rest.clone());
            ctx.notify(
                "query_generated",
                &format!("Generated final research query for {}", ctx.profile.company),
                Some(json!({
                    "query": rest,
                    "query_number": queries.len(),
                    "category": self.category.as_str(),
                    "is_complete": true,
                })),
            )
            .await;
        }

        if queries.is_empty() {
            return Err(PipelineError::EmptyResult(format!(
                "No queries generated for {}",
                ctx.profile.company
            )));
        }

        // 无论流式产出多少条，最多保留4条
        queries.truncate(MAX_QUERIES);
        Ok(queries)
    }

    /// 确定性兜底查询，由类目、公司名与当前年份导出
    pub fn fallback_queries(&self, company: &str, year: i32) -> Vec<String> {
        match self.category {
            Category::Company => vec![
                format!("{company} company overview {year}"),
                format!("{company} business model"),
                format!("{company} products and services"),
                format!("{company} leadership team"),
            ],
            Category::Financial => vec![
                format!("{company} financial performance {year}"),
                format!("{company} revenue {year}"),
                format!("{company} financial reports {year}"),
                format!("{company} profit margin"),
            ],
            Category::Industry => vec![
                format!("{company} industry position {year}"),
                format!("{company} market share"),
                format!("{company} competitors analysis"),
                format!("{company} industry trends {year}"),
            ],
            Category::News => vec![
                format!("{company} latest news {year}"),
                format!("{company} recent developments"),
                format!("{company} press releases {year}"),
                format!("{company} recent announcements"),
            ],
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
