//! 结果筛选（curation）接口 - 评分与过滤由外部协作方承担

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::pipeline::context::PipelineContext;
use crate::pipeline::types::Category;

/// curation能力抽象
///
/// 在检索采集与简报合成之间，对采集文档评分、筛选，
/// 并整理引用元数据。核心管线只依赖该接口。
#[async_trait]
pub trait Curator: Send + Sync {
    async fn curate(&self, ctx: &PipelineContext) -> Result<()>;
}

/// 透传curator - 采集结果原样进入curated槽位
///
/// 不做评分过滤；引用元数据取各类目provider评分最高的文档。
#[derive(Debug, Default)]
pub struct PassthroughCurator;

#[async_trait]
impl Curator for PassthroughCurator {
    async fn curate(&self, ctx: &PipelineContext) -> Result<()> {
        let collected = ctx.state.read().await.collected.clone();

        let mut references: Vec<String> = Vec::new();
        let mut titles: HashMap<String, String> = HashMap::new();
        for category in Category::ALL {
            let Some(docs) = collected.get(&category) else {
                continue;
            };
            let mut ranked: Vec<_> = docs.values().collect();
            ranked.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.url.cmp(&b.url))
            });
            for doc in ranked.into_iter().take(3) {
                if !references.contains(&doc.url) {
                    references.push(doc.url.clone());
                    if !doc.title.is_empty() {
                        titles.insert(doc.url.clone(), doc.title.clone());
                    }
                }
            }
        }

        let mut state = ctx.state.write().await;
        state.curated = collected;
        state.references = references;
        state.reference_titles.extend(titles);
        Ok(())
    }
}
