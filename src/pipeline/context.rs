//! 管线上下文与共享状态

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::broadcast::{NoopBroadcaster, StatusBroadcaster};
use crate::config::Config;
use crate::error::PipelineError;
use crate::llm::CompletionBackend;
use crate::pipeline::types::{Category, Document};
use crate::search::SearchBackend;

/// 公司身份上下文 - 初始化后不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub company: String,
    pub industry: String,
    pub hq_location: String,
}

impl CompanyProfile {
    /// 缺失或空白的字段降级为Unknown默认值，而非报错
    pub fn new(
        company: Option<String>,
        industry: Option<String>,
        hq_location: Option<String>,
    ) -> Self {
        fn or_default(value: Option<String>, fallback: &str) -> String {
            match value {
                Some(v) if !v.trim().is_empty() => v,
                _ => fallback.to_string(),
            }
        }

        Self {
            company: or_default(company, "Unknown Company"),
            industry: or_default(industry, "Unknown"),
            hq_location: or_default(hq_location, "Unknown"),
        }
    }
}

impl Default for CompanyProfile {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

/// 调研过程的共享可变状态
///
/// 每个调研任务创建一份，经由`Arc<RwLock<_>>`在各阶段间共享，
/// 任务结束后整体丢弃。各简报槽位只有对应类目的合成任务会写入，
/// 跨槽位不写是并发安全的约定，锁只用来串行化槽位更新本身。
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ResearchState {
    /// 检索阶段采集的原始文档（按类目）
    #[serde(default)]
    pub collected: HashMap<Category, HashMap<String, Document>>,
    /// 外部curator筛选评分后的文档（按类目）
    #[serde(default)]
    pub curated: HashMap<Category, HashMap<String, Document>>,
    /// 各类目简报，失败的类目为空串
    #[serde(default)]
    pub briefings: HashMap<Category, String>,
    /// curator整理的引用URL列表
    #[serde(default)]
    pub references: Vec<String>,
    /// 引用URL到展示标题的映射
    #[serde(default)]
    pub reference_titles: HashMap<String, String>,
    /// 最终报告（唯一写者：ReportCompiler）
    #[serde(default)]
    pub report: String,
    /// editor命名空间的报告镜像
    #[serde(default)]
    pub editor_report: String,
    /// 管线状态标签
    #[serde(default)]
    pub status: String,
}

impl ResearchState {
    /// 按`curated_<category>_data`字段命名约定注入curated数据
    ///
    /// 外部curator写入状态的入口。
    pub fn set_curated_by_key(
        &mut self,
        key: &str,
        docs: HashMap<String, Document>,
    ) -> Result<(), PipelineError> {
        let category = Category::from_curated_key(key)
            .ok_or_else(|| PipelineError::MalformedInput(key.to_string()))?;
        self.curated.insert(category, docs);
        Ok(())
    }
}

/// 管线上下文 - 贯穿所有阶段的句柄集合
///
/// 身份上下文不可变，状态累加器按类目限定写入范围。
#[derive(Clone)]
pub struct PipelineContext {
    pub llm: Arc<dyn CompletionBackend>,
    pub search: Arc<dyn SearchBackend>,
    pub broadcaster: Arc<dyn StatusBroadcaster>,
    pub profile: CompanyProfile,
    pub job_id: String,
    pub config: Config,
    pub state: Arc<RwLock<ResearchState>>,
}

impl PipelineContext {
    /// 创建新的管线上下文，默认不接入实时客户端（空广播器）
    pub fn new(
        llm: Arc<dyn CompletionBackend>,
        search: Arc<dyn SearchBackend>,
        profile: CompanyProfile,
        config: Config,
    ) -> Self {
        Self {
            llm,
            search,
            broadcaster: Arc::new(NoopBroadcaster),
            profile,
            job_id: Uuid::new_v4().to_string(),
            config,
            state: Arc::new(RwLock::new(ResearchState::default())),
        }
    }

    /// 接入状态广播器
    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn StatusBroadcaster>) -> Self {
        self.broadcaster = broadcaster;
        self
    }

    /// 发送进度通知（尽力而为，不会失败）
    pub async fn notify(&self, status: &str, message: &str, result: Option<Value>) {
        self.broadcaster
            .send_status_update(&self.job_id, status, message, result)
            .await;
    }

    /// 写入某类目的采集文档
    pub async fn set_collected(&self, category: Category, docs: HashMap<String, Document>) {
        let mut state = self.state.write().await;
        state.collected.insert(category, docs);
    }

    /// 读取某类目的curated文档
    pub async fn curated_documents(&self, category: Category) -> HashMap<String, Document> {
        let state = self.state.read().await;
        state.curated.get(&category).cloned().unwrap_or_default()
    }

    /// 写入某类目的简报槽位（每类目至多一次）
    pub async fn set_briefing(&self, category: Category, content: String) {
        let mut state = self.state.write().await;
        state.briefings.insert(category, content);
    }

    /// 读取状态快照
    pub async fn snapshot(&self) -> ResearchState {
        self.state.read().await.clone()
    }
}
