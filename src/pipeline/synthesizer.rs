//! 章节合成器 - 限并发地将curated文档合成为各类目简报

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::Semaphore;

use crate::pipeline::context::PipelineContext;
use crate::pipeline::types::{Briefing, Category, Document};
use crate::prompts;

/// 单篇文档正文的最大长度（字符）
pub const MAX_DOC_LENGTH: usize = 8000;

/// 文档块累计长度上限（字符），超出即整篇截断不再追加
pub const MAX_PROMPT_LENGTH: usize = 120_000;

/// 同时进行的简报请求上限
pub const MAX_CONCURRENT_BRIEFINGS: usize = 2;

/// 章节合成器
#[derive(Default)]
pub struct SectionSynthesizer;

impl SectionSynthesizer {
    /// 为全部类目生成简报
    ///
    /// 有curated输入的类目在并发额度（2）内并行合成；
    /// 无输入的类目直接写入空简报，不占用额度也不发起请求。
    /// 每个类目的简报槽位只写入一次。
    pub async fn synthesize_all(&self, ctx: &PipelineContext) -> HashMap<Category, String> {
        ctx.notify(
            "processing",
            "Starting research briefings",
            Some(json!({ "step": "Briefing" })),
        )
        .await;
        println!("📝 开始为 {} 生成章节简报...", ctx.profile.company);

        let mut pending = Vec::new();
        for category in Category::ALL {
            let docs = ctx.curated_documents(category).await;
            if docs.is_empty() {
                println!("ℹ️ {} 类目无可用资料，跳过简报生成", category);
                ctx.set_briefing(category, String::new()).await;
            } else {
                println!("📄 {} 类目共 {} 篇curated文档", category, docs.len());
                pending.push((category, docs));
            }
        }

        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_BRIEFINGS));
        let tasks = pending.into_iter().map(|(category, docs)| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return (category, Briefing::empty(category));
                };
                let briefing = self.generate_category_briefing(ctx, category, &docs).await;
                (category, briefing)
            }
        });

        let results = futures::future::join_all(tasks).await;

        let mut briefings = HashMap::new();
        for (category, briefing) in results {
            ctx.set_briefing(category, briefing.content.clone()).await;
            if briefing.is_empty() {
                eprintln!("❌ {} 类简报生成失败", category);
            } else {
                briefings.insert(category, briefing.content);
            }
        }

        println!(
            "✓ 简报生成完成：{}/{} 个类目成功",
            briefings.len(),
            Category::ALL.len()
        );
        briefings
    }

    /// 为单个类目生成简报，失败吸收为空简报
    pub async fn generate_category_briefing(
        &self,
        ctx: &PipelineContext,
        category: Category,
        docs: &HashMap<String, Document>,
    ) -> Briefing {
        ctx.notify(
            "briefing_start",
            &format!("Generating {} briefing", category),
            Some(json!({
                "step": "Briefing",
                "category": category.as_str(),
                "total_docs": docs.len(),
            })),
        )
        .await;

        let doc_block = assemble_documents(docs);
        let prompt = prompts::briefing_prompt(category, &ctx.profile, &doc_block);

        match ctx
            .llm
            .complete(prompts::BRIEFING_SYSTEM_PROMPT, &prompt)
            .await
        {
            Ok(content) if !content.trim().is_empty() => {
                ctx.notify(
                    "briefing_complete",
                    &format!("Completed {} briefing", category),
                    Some(json!({
                        "step": "Briefing",
                        "category": category.as_str(),
                    })),
                )
                .await;

                Briefing {
                    category,
                    content: content.trim().to_string(),
                }
            }
            Ok(_) => {
                eprintln!("❌ {} 类简报返回为空", category);
                Briefing::empty(category)
            }
            Err(err) => {
                eprintln!("❌ {} 类简报生成出错: {}", category, err);
                Briefing::empty(category)
            }
        }
    }
}

/// 装配文档块
///
/// 按curator评分降序排列（同分按URL稳定排序），
/// 单篇正文超过[`MAX_DOC_LENGTH`]截断并加注标记，
/// 累计长度达到[`MAX_PROMPT_LENGTH`]即停止追加（整篇丢弃，不做部分截取）。
pub(crate) fn assemble_documents(docs: &HashMap<String, Document>) -> String {
    let mut items: Vec<&Document> = docs.values().collect();
    items.sort_by(|a, b| {
        b.evaluation_score()
            .partial_cmp(&a.evaluation_score())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.url.cmp(&b.url))
    });

    let separator = format!("\n{}\n", "-".repeat(40));
    let mut doc_texts: Vec<String> = Vec::new();
    let mut total_length = 0usize;

    for doc in items {
        let mut content = doc.content.clone();
        if content.chars().count() > MAX_DOC_LENGTH {
            let truncated: String = content.chars().take(MAX_DOC_LENGTH).collect();
            content = format!("{}... [content truncated]", truncated);
        }

        let entry = format!("Title: {}\n\nContent: {}", doc.title, content);
        let entry_length = entry.chars().count();
        if total_length + entry_length >= MAX_PROMPT_LENGTH {
            break;
        }
        total_length += entry_length;
        doc_texts.push(entry);
    }

    format!("{}{}{}", separator, doc_texts.join(&separator), separator)
}

// Include tests
#[cfg(test)]
mod tests;
