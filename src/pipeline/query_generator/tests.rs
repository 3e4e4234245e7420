#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use chrono::{Datelike, Utc};

    use crate::pipeline::query_generator::{MAX_QUERIES, QueryGenerator, QueryStreamParser};
    use crate::pipeline::test_support::{
        RecordingBroadcaster, ScriptedStreamCompleter, StreamScript, UnusedSearch, test_context,
    };
    use crate::pipeline::types::Category;

    #[test]
    fn test_parser_splits_on_newline_boundaries() {
        let mut parser = QueryStreamParser::default();

        assert!(parser.push("示例科技 ").is_empty());
        assert_eq!(parser.push("产品\n示例"), vec!["示例科技 产品"]);
        assert_eq!(parser.current(), "示例");
        assert_eq!(parser.push("科技 融资\n"), vec!["示例 科技 融资"]);
        assert_eq!(parser.current(), "");
        assert!(parser.finish().is_none());
    }

    #[test]
    fn test_parser_finalizes_trailing_buffer() {
        let mut parser = QueryStreamParser::default();
        parser.push("A\nB");
        assert_eq!(parser.finish().as_deref(), Some("B"));
    }

    #[test]
    fn test_parser_skips_blank_lines() {
        let mut parser = QueryStreamParser::default();
        assert_eq!(parser.push("A\n   \nB\n"), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_three_token_stream_yields_three_queries() {
        let llm = Arc::new(ScriptedStreamCompleter::new(vec![StreamScript::Tokens(
            vec!["A", "\n", "B", "\n", "C"],
        )]));
        let ctx = test_context(llm, Arc::new(UnusedSearch));

        let queries = QueryGenerator::new(Category::Company).generate(&ctx).await;

        assert_eq!(queries, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_queries_truncated_to_limit() {
        let llm = Arc::new(ScriptedStreamCompleter::new(vec![StreamScript::Tokens(
            vec!["q one a\nq two b\nq three c\nq four d\nq five e\nq six f"],
        )]));
        let ctx = test_context(llm, Arc::new(UnusedSearch));

        let queries = QueryGenerator::new(Category::News).generate(&ctx).await;

        assert_eq!(queries.len(), MAX_QUERIES);
        assert_eq!(queries[0], "q one a");
        assert_eq!(queries[3], "q four d");
    }

    #[tokio::test]
    async fn test_finalized_queries_are_notified_in_order() {
        let llm = Arc::new(ScriptedStreamCompleter::new(vec![StreamScript::Tokens(
            vec!["A\nB", "\nC"],
        )]));
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let ctx = test_context(llm, Arc::new(UnusedSearch))
            .with_broadcaster(Arc::clone(&broadcaster) as _);

        let queries = QueryGenerator::new(Category::Company).generate(&ctx).await;

        assert_eq!(queries, vec!["A", "B", "C"]);
        let generated: Vec<String> = broadcaster
            .results_for("query_generated")
            .iter()
            .map(|r| r["query"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(generated, vec!["A", "B", "C"]);
        assert!(
            broadcaster
                .results_for("query_generated")
                .iter()
                .all(|r| r["is_complete"] == true)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_streams_exhaust_retries_then_fall_back() {
        let llm = Arc::new(ScriptedStreamCompleter::new(vec![
            StreamScript::Tokens(vec![]),
            StreamScript::Tokens(vec![]),
            StreamScript::Tokens(vec![]),
        ]));
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let ctx = test_context(Arc::clone(&llm) as _, Arc::new(UnusedSearch))
            .with_broadcaster(Arc::clone(&broadcaster) as _);

        let generator = QueryGenerator::new(Category::Financial);
        let queries = generator.generate(&ctx).await;

        // 三次尝试全部消耗
        assert_eq!(llm.stream_calls.load(Ordering::SeqCst), 3);
        // 返回确定性兜底查询
        let expected = generator.fallback_queries("示例科技", Utc::now().year());
        assert_eq!(queries, expected);
        assert!(broadcaster.statuses().contains(&"warning".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_attempt_failure() {
        let llm = Arc::new(ScriptedStreamCompleter::new(vec![
            StreamScript::Hang,
            StreamScript::Tokens(vec!["A", "\nB\nC"]),
        ]));
        let ctx = test_context(Arc::clone(&llm) as _, Arc::new(UnusedSearch));

        let queries = QueryGenerator::new(Category::Industry).generate(&ctx).await;

        assert_eq!(llm.stream_calls.load(Ordering::SeqCst), 2);
        assert_eq!(queries, vec!["A", "B", "C"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mid_stream_error_retries_then_succeeds() {
        let llm = Arc::new(ScriptedStreamCompleter::new(vec![
            StreamScript::ErrorMidStream(vec!["partial"], "连接中断"),
            StreamScript::Fail("限流"),
            StreamScript::Tokens(vec!["final query one\n"]),
        ]));
        let ctx = test_context(Arc::clone(&llm) as _, Arc::new(UnusedSearch));

        let queries = QueryGenerator::new(Category::Company).generate(&ctx).await;

        assert_eq!(llm.stream_calls.load(Ordering::SeqCst), 3);
        assert_eq!(queries, vec!["final query one"]);
    }

    #[test]
    fn test_fallback_queries_are_deterministic_and_bounded() {
        for category in Category::ALL {
            let generator = QueryGenerator::new(category);
            let first = generator.fallback_queries("示例科技", 2026);
            let second = generator.fallback_queries("示例科技", 2026);

            assert_eq!(first, second);
            assert_eq!(first.len(), 4);
            assert!(first.iter().all(|q| q.contains("示例科技")));
        }
    }

    #[test]
    fn test_fallback_queries_differ_per_category() {
        let company = QueryGenerator::new(Category::Company).fallback_queries("Acme", 2026);
        let news = QueryGenerator::new(Category::News).fallback_queries("Acme", 2026);
        assert_ne!(company, news);
    }
}
