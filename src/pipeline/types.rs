//! 调研管线核心数据模型

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::search::SearchTopic;

/// 调研类目 - 固定的四个报告章节
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Company,
    Industry,
    Financial,
    News,
}

impl Category {
    /// 固定的报告编译顺序
    pub const ALL: [Category; 4] = [
        Category::Company,
        Category::Industry,
        Category::Financial,
        Category::News,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Company => "company",
            Category::Industry => "industry",
            Category::Financial => "financial",
            Category::News => "news",
        }
    }

    /// 报告章节标题
    pub fn heading(&self) -> &'static str {
        match self {
            Category::Company => "公司概览",
            Category::Industry => "行业概览",
            Category::Financial => "财务概览",
            Category::News => "新闻",
        }
    }

    /// 入站curated数据的字段命名约定
    pub fn curated_key(&self) -> String {
        format!("curated_{}_data", self.as_str())
    }

    /// 从字段命名约定解析类目
    pub fn from_curated_key(key: &str) -> Option<Category> {
        let inner = key.strip_prefix("curated_")?.strip_suffix("_data")?;
        Category::ALL.iter().copied().find(|c| c.as_str() == inner)
    }

    /// 类目到搜索主题的固定映射（不可配置）
    pub fn search_topic(&self) -> Option<SearchTopic> {
        match self {
            Category::News => Some(SearchTopic::News),
            Category::Financial => Some(SearchTopic::Finance),
            Category::Company | Category::Industry => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 外部curator给出的文档评估结果
///
/// overall_score可能是数字或数字字符串，解析失败按0处理。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentEvaluation {
    #[serde(default)]
    pub overall_score: Value,
}

/// 检索得到的单篇文档，在合并结果中按URL唯一
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// 产生该文档的搜索查询
    #[serde(default, rename = "query")]
    pub source_query: String,
    /// 文档来源标记
    #[serde(default)]
    pub source: String,
    /// 搜索provider给出的相关性评分
    #[serde(default)]
    pub score: f64,
    /// curator评估结果
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<DocumentEvaluation>,
}

impl Document {
    /// 文档的curator评分，缺失或非数字按0
    pub fn evaluation_score(&self) -> f64 {
        let Some(evaluation) = &self.evaluation else {
            return 0.0;
        };
        match &evaluation.overall_score {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

/// 单类目简报
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Briefing {
    pub category: Category,
    /// 失败时为空串，失败不向外传播
    pub content: String,
}

impl Briefing {
    pub fn empty(category: Category) -> Self {
        Self {
            category,
            content: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
