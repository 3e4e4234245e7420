//! 调研流程编排器 - 按阶段驱动查询生成、检索、筛选、合成与编译

use std::sync::Arc;

use anyhow::Result;

use crate::pipeline::compiler::ReportCompiler;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::curator::{Curator, PassthroughCurator};
use crate::pipeline::query_generator::QueryGenerator;
use crate::pipeline::search_fanout::SearchFanout;
use crate::pipeline::synthesizer::SectionSynthesizer;
use crate::pipeline::types::Category;

/// 调研流程编排器
pub struct ResearchOrchestrator {
    curator: Arc<dyn Curator>,
}

impl Default for ResearchOrchestrator {
    fn default() -> Self {
        Self::new(Arc::new(PassthroughCurator))
    }
}

impl ResearchOrchestrator {
    pub fn new(curator: Arc<dyn Curator>) -> Self {
        Self { curator }
    }

    /// 执行完整调研流程，返回最终报告
    pub async fn execute_research_pipeline(&self, ctx: &PipelineContext) -> Result<String> {
        println!("🚀 开始执行 {} 的公司调研流程...", ctx.profile.company);

        // 第一阶段：各类目的查询生成与检索扇出
        for category in Category::ALL {
            println!("🤖 执行 {} 类目调研...", category);
            let queries = QueryGenerator::new(category).generate(ctx).await;
            let docs = SearchFanout::new(category)
                .search_documents(ctx, &queries)
                .await;
            println!("✓ {} 类目采集到 {} 篇文档", category, docs.len());
            ctx.set_collected(category, docs).await;
        }

        // 第二阶段：外部协作方筛选评分；失败不终止管线
        if let Err(err) = self.curator.curate(ctx).await {
            eprintln!("❌ 文档筛选失败: {}", err);
        }

        // 第三阶段：限并发的章节简报合成
        SectionSynthesizer.synthesize_all(ctx).await;

        // 第四阶段：两段式报告编译
        let report = ReportCompiler.run(ctx).await;

        println!("✓ 调研流程执行完毕");
        Ok(report)
    }
}
