//! 测试辅助 - 各阶段单元测试共用的mock后端

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;

use crate::broadcast::StatusBroadcaster;
use crate::config::Config;
use crate::error::PipelineError;
use crate::llm::{CompletionBackend, TokenStream};
use crate::pipeline::context::{CompanyProfile, PipelineContext};
use crate::search::{SearchBackend, SearchHit, SearchParams, SearchTopic};

/// 构建测试用管线上下文
pub fn test_context(
    llm: Arc<dyn CompletionBackend>,
    search: Arc<dyn SearchBackend>,
) -> PipelineContext {
    let profile = CompanyProfile::new(
        Some("示例科技".to_string()),
        Some("人工智能".to_string()),
        Some("上海".to_string()),
    );
    PipelineContext::new(llm, search, profile, Config::default())
}

/// 不应被调用的补全后端
pub struct UnusedCompleter;

#[async_trait]
impl CompletionBackend for UnusedCompleter {
    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        Err(anyhow!("补全后端不应被调用"))
    }

    async fn complete_stream(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<TokenStream> {
        Err(anyhow!("流式后端不应被调用"))
    }
}

/// 不应被调用的搜索后端
pub struct UnusedSearch;

#[async_trait]
impl SearchBackend for UnusedSearch {
    async fn search(&self, _query: &str, _params: &SearchParams) -> Result<Vec<SearchHit>> {
        Err(anyhow!("搜索后端不应被调用"))
    }
}

/// 流式补全脚本
pub enum StreamScript {
    /// 正常产出给定token批次后结束
    Tokens(Vec<&'static str>),
    /// 打开流即失败
    Fail(&'static str),
    /// 产出部分token后流中断
    ErrorMidStream(Vec<&'static str>, &'static str),
    /// 永不产出（用于触发超时）
    Hang,
}

/// 按脚本逐次应答的流式补全mock，每次调用消费一份脚本
pub struct ScriptedStreamCompleter {
    scripts: Mutex<VecDeque<StreamScript>>,
    pub stream_calls: AtomicUsize,
}

impl ScriptedStreamCompleter {
    pub fn new(scripts: Vec<StreamScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            stream_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CompletionBackend for ScriptedStreamCompleter {
    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        Err(anyhow!("该mock仅支持流式调用"))
    }

    async fn complete_stream(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<TokenStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .expect("脚本锁")
            .pop_front()
            .unwrap_or(StreamScript::Fail("脚本耗尽"));

        match script {
            StreamScript::Tokens(tokens) => {
                let items: Vec<Result<String, PipelineError>> =
                    tokens.into_iter().map(|t| Ok(t.to_string())).collect();
                Ok(futures::stream::iter(items).boxed())
            }
            StreamScript::Fail(message) => Err(anyhow!("{}", message)),
            StreamScript::ErrorMidStream(tokens, message) => {
                let mut items: Vec<Result<String, PipelineError>> =
                    tokens.into_iter().map(|t| Ok(t.to_string())).collect();
                items.push(Err(PipelineError::Provider(message.to_string())));
                Ok(futures::stream::iter(items).boxed())
            }
            StreamScript::Hang => {
                Ok(futures::stream::pending::<Result<String, PipelineError>>().boxed())
            }
        }
    }
}

/// 固定应答的补全mock，并记录并发水位
pub struct CountingCompleter {
    pub response: String,
    pub delay_ms: u64,
    pub complete_calls: AtomicUsize,
    current: AtomicUsize,
    pub max_concurrent: AtomicUsize,
    pub prompts_seen: Mutex<Vec<String>>,
}

impl CountingCompleter {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            delay_ms: 50,
            complete_calls: AtomicUsize::new(0),
            current: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
            prompts_seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionBackend for CountingCompleter {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts_seen
            .lock()
            .expect("记录锁")
            .push(user_prompt.to_string());

        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);

        if self.response.is_empty() {
            Err(anyhow!("脚本化失败"))
        } else {
            Ok(self.response.clone())
        }
    }

    async fn complete_stream(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<TokenStream> {
        Err(anyhow!("该mock仅支持非流式调用"))
    }
}

/// 按查询关键字应答的搜索mock
#[derive(Default)]
pub struct ScriptedSearch {
    pub hits: HashMap<String, Vec<SearchHit>>,
    pub failing: HashSet<String>,
    pub calls: Mutex<Vec<(String, Option<SearchTopic>)>>,
}

impl ScriptedSearch {
    pub fn with_hits(mut self, query: &str, hits: Vec<SearchHit>) -> Self {
        self.hits.insert(query.to_string(), hits);
        self
    }

    pub fn with_failure(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    pub fn recorded_queries(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("记录锁")
            .iter()
            .map(|(q, _)| q.clone())
            .collect()
    }
}

#[async_trait]
impl SearchBackend for ScriptedSearch {
    async fn search(&self, query: &str, params: &SearchParams) -> Result<Vec<SearchHit>> {
        self.calls
            .lock()
            .expect("记录锁")
            .push((query.to_string(), params.topic));

        if self.failing.contains(query) {
            return Err(anyhow!("搜索服务不可用"));
        }
        Ok(self.hits.get(query).cloned().unwrap_or_default())
    }
}

/// 记录全部进度事件的广播mock
#[derive(Default)]
pub struct RecordingBroadcaster {
    pub updates: Mutex<Vec<(String, String, Option<Value>)>>,
}

impl RecordingBroadcaster {
    pub fn statuses(&self) -> Vec<String> {
        self.updates
            .lock()
            .expect("记录锁")
            .iter()
            .map(|(status, _, _)| status.clone())
            .collect()
    }

    pub fn results_for(&self, status: &str) -> Vec<Value> {
        self.updates
            .lock()
            .expect("记录锁")
            .iter()
            .filter(|(s, _, _)| s == status)
            .filter_map(|(_, _, result)| result.clone())
            .collect()
    }
}

#[async_trait]
impl StatusBroadcaster for RecordingBroadcaster {
    async fn send_status_update(
        &self,
        _job_id: &str,
        status: &str,
        message: &str,
        result: Option<Value>,
    ) {
        self.updates
            .lock()
            .expect("记录锁")
            .push((status.to_string(), message.to_string(), result));
    }
}

/// 构造一条检索结果
pub fn hit(url: &str, title: &str, content: &str, score: f64) -> SearchHit {
    SearchHit {
        url: url.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        score,
    }
}
