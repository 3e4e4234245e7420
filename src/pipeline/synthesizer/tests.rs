#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use serde_json::json;

    use crate::pipeline::synthesizer::{
        MAX_CONCURRENT_BRIEFINGS, MAX_DOC_LENGTH, SectionSynthesizer, assemble_documents,
    };
    use crate::pipeline::test_support::{
        CountingCompleter, RecordingBroadcaster, UnusedSearch, test_context,
    };
    use crate::pipeline::types::{Category, Document, DocumentEvaluation};

    fn doc(url: &str, title: &str, content: &str, score: &str) -> Document {
        Document {
            url: url.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            source_query: "test query words".to_string(),
            source: "web_search".to_string(),
            score: 0.5,
            evaluation: Some(DocumentEvaluation {
                overall_score: json!(score),
            }),
        }
    }

    fn docs_map(docs: Vec<Document>) -> HashMap<String, Document> {
        docs.into_iter().map(|d| (d.url.clone(), d)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_gate_never_exceeds_limit() {
        let llm = Arc::new(CountingCompleter::new("简报内容"));
        let ctx = test_context(Arc::clone(&llm) as _, Arc::new(UnusedSearch));

        {
            let mut state = ctx.state.write().await;
            for category in Category::ALL {
                state.curated.insert(
                    category,
                    docs_map(vec![doc("https://a.com", "标题", "正文", "5")]),
                );
            }
        }

        let briefings = SectionSynthesizer.synthesize_all(&ctx).await;

        assert_eq!(briefings.len(), 4);
        assert_eq!(llm.complete_calls.load(Ordering::SeqCst), 4);
        // 四个类目同时有输入，同时进行的请求也不超过并发额度
        assert!(llm.max_concurrent.load(Ordering::SeqCst) <= MAX_CONCURRENT_BRIEFINGS);
    }

    #[tokio::test]
    async fn test_empty_category_short_circuits_without_request() {
        let llm = Arc::new(CountingCompleter::new("简报内容"));
        let ctx = test_context(Arc::clone(&llm) as _, Arc::new(UnusedSearch));

        ctx.state.write().await.curated.insert(
            Category::Company,
            docs_map(vec![doc("https://a.com", "标题", "正文", "5")]),
        );

        let briefings = SectionSynthesizer.synthesize_all(&ctx).await;

        // 只有company发起了请求
        assert_eq!(llm.complete_calls.load(Ordering::SeqCst), 1);
        assert_eq!(briefings.len(), 1);
        assert!(briefings.contains_key(&Category::Company));

        // 其余类目的槽位写入空简报
        let state = ctx.snapshot().await;
        for category in [Category::Industry, Category::Financial, Category::News] {
            assert_eq!(state.briefings.get(&category).map(String::as_str), Some(""));
        }
        assert_eq!(
            state.briefings.get(&Category::Company).map(String::as_str),
            Some("简报内容")
        );
    }

    #[tokio::test]
    async fn test_failure_is_absorbed_as_empty_briefing() {
        // 空应答脚本使complete返回错误
        let llm = Arc::new(CountingCompleter::new(""));
        let ctx = test_context(Arc::clone(&llm) as _, Arc::new(UnusedSearch));

        ctx.state.write().await.curated.insert(
            Category::Financial,
            docs_map(vec![doc("https://a.com", "标题", "正文", "5")]),
        );

        let briefings = SectionSynthesizer.synthesize_all(&ctx).await;

        assert!(briefings.is_empty());
        let state = ctx.snapshot().await;
        assert_eq!(
            state.briefings.get(&Category::Financial).map(String::as_str),
            Some("")
        );
    }

    #[tokio::test]
    async fn test_briefing_notifications_are_sent() {
        let llm = Arc::new(CountingCompleter::new("简报内容"));
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let ctx = test_context(Arc::clone(&llm) as _, Arc::new(UnusedSearch))
            .with_broadcaster(Arc::clone(&broadcaster) as _);

        ctx.state.write().await.curated.insert(
            Category::News,
            docs_map(vec![doc("https://a.com", "标题", "正文", "5")]),
        );

        SectionSynthesizer.synthesize_all(&ctx).await;

        let statuses = broadcaster.statuses();
        assert!(statuses.contains(&"briefing_start".to_string()));
        assert!(statuses.contains(&"briefing_complete".to_string()));

        let start = &broadcaster.results_for("briefing_start")[0];
        assert_eq!(start["category"], "news");
        assert_eq!(start["total_docs"], 1);
    }

    #[test]
    fn test_assemble_documents_orders_by_score_desc() {
        let docs = docs_map(vec![
            doc("https://low.com", "低分", "低分正文", "1.0"),
            doc("https://high.com", "高分", "高分正文", "9.0"),
            doc("https://none.com", "无分", "无分正文", "not a number"),
        ]);

        let block = assemble_documents(&docs);

        let high = block.find("高分正文").unwrap();
        let low = block.find("低分正文").unwrap();
        let none = block.find("无分正文").unwrap();
        assert!(high < low);
        assert!(low < none);
    }

    #[test]
    fn test_assemble_documents_truncates_long_content() {
        let long_content = "长".repeat(MAX_DOC_LENGTH + 100);
        let docs = docs_map(vec![doc("https://a.com", "标题", &long_content, "5")]);

        let block = assemble_documents(&docs);

        assert!(block.contains("... [content truncated]"));
        // 截断后正文不超过上限
        let content_start = block.find("Content: ").unwrap() + "Content: ".len();
        let content = &block[content_start..];
        assert!(content.chars().count() < MAX_DOC_LENGTH + 100);
    }

    #[test]
    fn test_assemble_documents_stops_at_cumulative_ceiling() {
        // 两篇近8000字的文档加上一篇小文档，超出上限的整篇被丢弃
        let big = "容".repeat(MAX_DOC_LENGTH);
        let mut docs = Vec::new();
        for i in 0..20 {
            let mut d = doc(&format!("https://site{i:02}.com"), "标题", &big, "5");
            d.evaluation = Some(DocumentEvaluation {
                overall_score: json!(format!("{}", 20 - i)),
            });
            docs.push(d);
        }

        let block = assemble_documents(&docs_map(docs));

        // 8020字/篇，120000上限下最多容纳14篇
        let included = block.matches("Title: ").count();
        assert!(included < 20);
        assert!(block.chars().count() < 121_000);
    }
}
