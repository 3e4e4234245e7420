//! 检索扇出 - 多查询并发检索与按URL合并

use std::collections::HashMap;

use serde_json::json;

use crate::pipeline::context::PipelineContext;
use crate::pipeline::types::{Category, Document};
use crate::search::{SearchHit, SearchParams};
use crate::utils::references::normalize_title;

/// 有效查询的最小词数，低于该值按噪声丢弃（不算错误）
const MIN_QUERY_WORDS: usize = 3;

/// 检索扇出，按分析师角色（类目）构造
pub struct SearchFanout {
    category: Category,
}

impl SearchFanout {
    pub fn new(category: Category) -> Self {
        Self { category }
    }

    fn search_params(&self, ctx: &PipelineContext) -> SearchParams {
        SearchParams::from_config(&ctx.config.search).with_topic(self.category.search_topic())
    }

    /// 并发执行全部查询并合并结果
    ///
    /// gather是整体成败的：任一查询失败则整批降级为空结果，
    /// 不保留部分结果（单查询路径是独立成败的，见
    /// [`SearchFanout::search_single_query`]）。
    pub async fn search_documents(
        &self,
        ctx: &PipelineContext,
        queries: &[String],
    ) -> HashMap<String, Document> {
        let valid: Vec<String> = queries
            .iter()
            .filter(|q| is_substantial_query(q))
            .cloned()
            .collect();

        if valid.is_empty() {
            eprintln!("⚠️ {} 类没有可用的检索查询", self.category);
            return HashMap::new();
        }

        ctx.notify(
            "queries_generated",
            &format!("Generated {} queries for {}", valid.len(), self.category),
            Some(json!({
                "step": "Searching",
                "analyst": self.category.as_str(),
                "queries": valid,
                "total_queries": valid.len(),
            })),
        )
        .await;

        ctx.notify(
            "search_started",
            &format!("Searching {} queries", valid.len()),
            Some(json!({
                "step": "Searching",
                "total_queries": valid.len(),
            })),
        )
        .await;

        let params = self.search_params(ctx);
        let tasks = valid.iter().map(|query| ctx.search.search(query, &params));

        let results = match futures::future::try_join_all(tasks).await {
            Ok(results) => results,
            Err(err) => {
                eprintln!("❌ 并行检索执行失败: {}", err);
                return HashMap::new();
            }
        };

        let merged = merge_results(&valid, results);

        ctx.notify(
            "search_complete",
            &format!("Search completed with {} documents found", merged.len()),
            Some(json!({
                "step": "Searching",
                "total_documents": merged.len(),
                "queries_processed": valid.len(),
            })),
        )
        .await;

        merged
    }

    /// 执行单条查询，失败独立降级为空结果
    pub async fn search_single_query(
        &self,
        ctx: &PipelineContext,
        query: &str,
    ) -> HashMap<String, Document> {
        if !is_substantial_query(query) {
            return HashMap::new();
        }

        ctx.notify(
            "query_searching",
            &format!("Searching: {}", query),
            Some(json!({
                "step": "Searching",
                "query": query,
            })),
        )
        .await;

        let params = self.search_params(ctx);
        match ctx.search.search(query, &params).await {
            Ok(hits) => {
                let mut docs = HashMap::new();
                merge_hits(&mut docs, query, hits);

                ctx.notify(
                    "query_searched",
                    &format!("Found {} results for: {}", docs.len(), query),
                    Some(json!({
                        "step": "Searching",
                        "query": query,
                        "results_count": docs.len(),
                    })),
                )
                .await;

                docs
            }
            Err(err) => {
                eprintln!("❌ 查询 '{}' 检索失败: {}", query, err);
                ctx.notify(
                    "query_error",
                    &format!("Search failed for: {}", query),
                    Some(json!({
                        "step": "Searching",
                        "query": query,
                        "error": err.to_string(),
                    })),
                )
                .await;
                HashMap::new()
            }
        }
    }
}

fn is_substantial_query(query: &str) -> bool {
    query.split_whitespace().count() >= MIN_QUERY_WORDS
}

/// 按固定的查询顺序合并各查询的结果
///
/// 合并键是URL而非到达顺序，后续查询对同一URL的命中覆盖先前的。
fn merge_results(
    queries: &[String],
    per_query: Vec<Vec<SearchHit>>,
) -> HashMap<String, Document> {
    let mut merged = HashMap::new();
    for (query, hits) in queries.iter().zip(per_query) {
        merge_hits(&mut merged, query, hits);
    }
    merged
}

fn merge_hits(merged: &mut HashMap<String, Document>, query: &str, hits: Vec<SearchHit>) {
    for hit in hits {
        if hit.content.is_empty() || hit.url.is_empty() {
            continue;
        }

        // 标题与URL重复时置空，向下游标记"需要抽取"
        let title = normalize_title(&hit.title, &hit.url);

        merged.insert(
            hit.url.clone(),
            Document {
                url: hit.url,
                title,
                content: hit.content,
                source_query: query.to_string(),
                source: "web_search".to_string(),
                score: hit.score,
                evaluation: None,
            },
        );
    }
}
