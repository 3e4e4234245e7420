use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// LLM Provider类型
///
/// 流式调用走OpenAI兼容的chat completions协议，
/// 因此仅支持提供该协议的provider。
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "moonshot")]
    Moonshot,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "mistral")]
    Mistral,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Moonshot => write!(f, "moonshot"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Mistral => write!(f, "mistral"),
            LLMProvider::OpenRouter => write!(f, "openrouter"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "moonshot" => Ok(LLMProvider::Moonshot),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "mistral" => Ok(LLMProvider::Mistral),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 调研对象公司名称
    pub company: Option<String>,

    /// 公司所属行业
    pub industry: Option<String>,

    /// 公司总部所在地
    pub hq_location: Option<String>,

    /// 报告输出目录
    pub output_path: PathBuf,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 搜索服务配置
    pub search: SearchConfig,

    /// 调研管线配置
    pub pipeline: PipelineConfig,

    /// 是否启用详细日志（包含流式report_chunk输出）
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址（需为OpenAI兼容端点以支持流式调用）
    pub api_base_url: String,

    /// 高能效模型，优先用于常规推理任务（查询生成、流式整理）
    pub model_efficient: String,

    /// 高质量模型，用于复杂推理任务（报告编译），以及efficient失效时的兜底
    pub model_powerful: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 非流式调用的重试次数
    pub retry_attempts: u32,

    /// 非流式调用的重试间隔（毫秒）
    pub retry_delay_ms: u64,
}

/// 搜索服务（Tavily）配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    /// 搜索API KEY
    pub api_key: String,

    /// 搜索API基地址
    pub api_base_url: String,

    /// 搜索深度（basic/advanced）
    pub search_depth: String,

    /// 单次查询返回的最大结果数
    pub max_results: u32,

    /// 请求超时时间（秒）
    pub timeout_seconds: u64,
}

/// 调研管线配置
///
/// 文档长度上限、简报并发额度等固定策略见各阶段模块内的常量。
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    /// 查询生成单次尝试的超时时间（秒）
    pub query_timeout_seconds: u64,

    /// 查询生成的最大尝试次数
    pub query_retry_attempts: u32,

    /// 查询生成的重试基础延迟（毫秒），按尝试次数指数递增
    pub query_retry_delay_ms: u64,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            company: None,
            industry: None,
            hq_location: None,
            output_path: PathBuf::from("./research.docs"),
            llm: LLMConfig::default(),
            search: SearchConfig::default(),
            pipeline: PipelineConfig::default(),
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var("DEEPRESEARCH_LLM_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api-inference.modelscope.cn/v1"),
            model_efficient: String::from("Qwen/Qwen3-Next-80B-A3B-Instruct"),
            model_powerful: String::from("Qwen/Qwen3-235B-A22B-Instruct-2507"),
            max_tokens: 16384,
            temperature: 0.0,
            retry_attempts: 3,
            retry_delay_ms: 2000,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("TAVILY_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api.tavily.com"),
            search_depth: String::from("basic"),
            max_results: 5,
            timeout_seconds: 30,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            query_timeout_seconds: 30,
            query_retry_attempts: 3,
            query_retry_delay_ms: 2000,
        }
    }
}
