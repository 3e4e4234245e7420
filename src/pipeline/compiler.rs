//! 报告编译器 - 两阶段编译：合并结构化 → 流式整理分块下发
//!
//! 每个阶段都有降级路径，编译器从不向调用方抛错，
//! 总是返回当前能拿到的最好文本。

use futures::StreamExt;
use serde_json::json;

use crate::pipeline::context::PipelineContext;
use crate::pipeline::types::Category;
use crate::prompts;
use crate::utils::references::format_references_section;

/// 广播缓冲的最小冲刷长度（字符）
const MIN_CHUNK_LEN: usize = 10;

/// 句读/行边界字符，缓冲包含其一且达到长度阈值时冲刷
const BOUNDARY_CHARS: [char; 4] = ['.', '!', '?', '\n'];

/// 流式整理阶段的分块下发缓冲
///
/// 缓冲→冲刷两态：push累积token，当缓冲长度超过阈值且包含
/// 边界字符时整体冲刷；流结束时非空缓冲无条件冲刷一次。
#[derive(Debug, Default)]
pub struct ChunkFlusher {
    buffer: String,
}

impl ChunkFlusher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加token，达到冲刷条件时返回待下发的块
    pub fn push(&mut self, text: &str) -> Option<String> {
        self.buffer.push_str(text);
        if self.buffer.chars().count() > MIN_CHUNK_LEN && self.buffer.contains(BOUNDARY_CHARS) {
            Some(std::mem::take(&mut self.buffer))
        } else {
            None
        }
    }

    /// 流结束时的最终冲刷
    pub fn finish(self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer)
        }
    }
}

/// 报告编译器
#[derive(Default)]
pub struct ReportCompiler;

impl ReportCompiler {
    /// 执行两阶段编译，返回最终报告文本
    pub async fn run(&self, ctx: &PipelineContext) -> String {
        let company = ctx.profile.company.clone();

        ctx.notify(
            "processing",
            &format!("Starting report compilation for {}", company),
            Some(json!({ "step": "Editor", "substep": "initialization" })),
        )
        .await;
        println!("📑 开始编译 {} 的最终报告...", company);

        ctx.notify(
            "processing",
            "Collecting section briefings",
            Some(json!({ "step": "Editor", "substep": "collecting_briefings" })),
        )
        .await;

        let briefings = self.collect_briefings(ctx).await;
        if briefings.is_empty() {
            eprintln!("⚠️ 没有可编译的简报内容");
            let report = placeholder_report(&company);
            self.store_report(ctx, &report).await;
            self.notify_complete(ctx, &report).await;
            return report;
        }

        ctx.notify(
            "processing",
            "Compiling initial research report",
            Some(json!({ "step": "Editor", "substep": "compilation" })),
        )
        .await;
        let compiled = self.compile_content(ctx, &briefings).await;

        ctx.notify(
            "processing",
            "Cleaning up and organizing report",
            Some(json!({ "step": "Editor", "substep": "cleanup" })),
        )
        .await;
        ctx.notify(
            "processing",
            "Formatting final report",
            Some(json!({ "step": "Editor", "substep": "format" })),
        )
        .await;
        let final_report = self.content_sweep(ctx, &compiled).await;

        let final_report = final_report.trim().to_string();
        if final_report.is_empty() {
            eprintln!("❌ 所有降级路径后最终报告仍为空");
        } else {
            println!("✓ 最终报告编译完成（{} 字符）", final_report.chars().count());
        }

        self.store_report(ctx, &final_report).await;
        self.notify_complete(ctx, &final_report).await;
        final_report
    }

    /// 按固定类目顺序收集非空简报
    async fn collect_briefings(&self, ctx: &PipelineContext) -> Vec<(Category, String)> {
        let state = ctx.state.read().await;
        let mut briefings = Vec::new();
        for category in Category::ALL {
            match state.briefings.get(&category) {
                Some(content) if !content.is_empty() => {
                    println!("📄 已收集 {} 简报（{} 字符）", category, content.chars().count());
                    briefings.push((category, content.clone()));
                }
                _ => {
                    println!("ℹ️ {} 简报缺失", category);
                }
            }
        }
        briefings
    }

    /// 初始编译：合并简报为四节结构，并在模型输出后追加引用章节
    ///
    /// 引用章节由curator元数据直接装配，不经过模型。
    /// 编译失败时降级为简报原文拼接。
    async fn compile_content(
        &self,
        ctx: &PipelineContext,
        briefings: &[(Category, String)],
    ) -> String {
        let combined_content = briefings
            .iter()
            .map(|(_, content)| content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let reference_text = {
            let state = ctx.state.read().await;
            format_references_section(&state.references, &state.reference_titles)
        };

        let prompt = prompts::compile_prompt(&ctx.profile, &combined_content);

        match ctx.llm.complete(prompts::COMPILE_SYSTEM_PROMPT, &prompt).await {
            Ok(text) if !text.trim().is_empty() => {
                let mut report = text.trim().to_string();
                if !reference_text.is_empty() {
                    report = format!("{}\n\n{}", report, reference_text);
                    println!("📎 已追加 {} 条引用", ctx.state.read().await.references.len());
                }
                report
            }
            Ok(_) => {
                eprintln!("❌ 初始编译返回为空，使用简报拼接降级");
                combined_content.trim().to_string()
            }
            Err(err) => {
                eprintln!("❌ 初始编译出错: {}，使用简报拼接降级", err);
                combined_content.trim().to_string()
            }
        }
    }

    /// 流式整理：去重并强制五节结构，边到达边分块下发
    ///
    /// 任何失败降级为返回整理前的编译文本。
    async fn content_sweep(&self, ctx: &PipelineContext, content: &str) -> String {
        let prompt = prompts::cleanup_prompt(&ctx.profile, content);

        let mut stream = match ctx
            .llm
            .complete_stream(prompts::CLEANUP_SYSTEM_PROMPT, &prompt)
            .await
        {
            Ok(stream) => stream,
            Err(err) => {
                eprintln!("❌ 流式整理启动失败: {}", err);
                return content.trim().to_string();
            }
        };

        let mut accumulated = String::new();
        let mut flusher = ChunkFlusher::new();

        while let Some(item) = stream.next().await {
            match item {
                Ok(token) => {
                    accumulated.push_str(&token);
                    if let Some(chunk) = flusher.push(&token) {
                        self.notify_chunk(ctx, chunk).await;
                    }
                }
                Err(err) => {
                    eprintln!("❌ 流式整理中断: {}", err);
                    return content.trim().to_string();
                }
            }
        }

        if let Some(chunk) = flusher.finish() {
            self.notify_chunk(ctx, chunk).await;
        }

        let final_text = accumulated.trim();
        if final_text.is_empty() {
            content.trim().to_string()
        } else {
            final_text.to_string()
        }
    }

    async fn notify_chunk(&self, ctx: &PipelineContext, chunk: String) {
        ctx.notify(
            "report_chunk",
            "Formatting final report",
            Some(json!({ "chunk": chunk, "step": "Editor" })),
        )
        .await;
    }

    /// 报告写入共享状态，并镜像到editor命名空间
    async fn store_report(&self, ctx: &PipelineContext, report: &str) {
        let mut state = ctx.state.write().await;
        state.report = report.to_string();
        state.editor_report = report.to_string();
        state.status = "editor_complete".to_string();
    }

    async fn notify_complete(&self, ctx: &PipelineContext, report: &str) {
        ctx.notify(
            "editor_complete",
            "Research report completed",
            Some(json!({
                "step": "Editor",
                "report": report,
                "company": ctx.profile.company,
                "is_final": true,
                "status": "completed",
            })),
        )
        .await;
    }
}

/// 零简报时的占位报告，不发起任何编译调用
fn placeholder_report(company: &str) -> String {
    format!(
        "# {company}研究报告\n\n未能生成任何研究简报，无法编译完整报告。请检查检索与模型配置后重试。"
    )
}
