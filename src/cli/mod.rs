use clap::Parser;
use std::path::PathBuf;

use crate::config::{Config, LLMProvider};

/// deepresearch-rs - 由Rust与AI驱动的公司研究报告生成引擎
#[derive(Parser, Debug)]
#[command(name = "deepresearch-rs")]
#[command(
    about = "AI-based company research engine. It coordinates LLM query generation, concurrent web search and section synthesis into a polished research report."
)]
#[command(version)]
pub struct Args {
    /// 调研对象公司名称
    #[arg(short, long)]
    pub company: Option<String>,

    /// 公司所属行业
    #[arg(short, long)]
    pub industry: Option<String>,

    /// 公司总部所在地
    #[arg(long)]
    pub hq_location: Option<String>,

    /// 报告输出目录
    #[arg(short, long)]
    pub output_path: Option<PathBuf>,

    /// 配置文件路径
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// LLM Provider (openai, moonshot, deepseek, mistral, openrouter, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 高能效模型，优先用于常规推理任务
    #[arg(long)]
    pub model_efficient: Option<String>,

    /// 高质量模型，优先用于复杂推理任务，以及作为efficient失效情况下的兜底
    #[arg(long)]
    pub model_powerful: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// 搜索API KEY
    #[arg(long)]
    pub search_api_key: Option<String>,

    /// 单次查询返回的最大搜索结果数
    #[arg(long)]
    pub max_results: Option<u32>,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 将CLI参数合并到配置之上
    ///
    /// 优先级：CLI参数 > 配置文件 > 默认值。
    pub fn into_config(self) -> Config {
        let mut config = if let Some(config_path) = &self.config {
            Config::from_file(config_path).unwrap_or_else(|err| {
                eprintln!("⚠️ 警告: 无法读取配置文件 {:?}（{}），使用默认配置", config_path, err);
                Config::default()
            })
        } else {
            // 未显式指定时尝试默认位置
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("deepresearch.toml");

            if default_config_path.exists() {
                Config::from_file(&default_config_path).unwrap_or_else(|err| {
                    eprintln!(
                        "⚠️ 警告: 无法读取默认配置文件 {:?}（{}），使用默认配置",
                        default_config_path, err
                    );
                    Config::default()
                })
            } else {
                Config::default()
            }
        };

        // 公司身份上下文
        if self.company.is_some() {
            config.company = self.company;
        }
        if self.industry.is_some() {
            config.industry = self.industry;
        }
        if self.hq_location.is_some() {
            config.hq_location = self.hq_location;
        }
        if let Some(output_path) = self.output_path {
            config.output_path = output_path;
        }

        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            if let Ok(provider) = provider_str.parse::<LLMProvider>() {
                config.llm.provider = provider;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的provider: {}，使用默认provider",
                    provider_str
                );
            }
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(model_efficient) = self.model_efficient {
            config.llm.model_efficient = model_efficient;
        }
        if let Some(model_powerful) = self.model_powerful {
            config.llm.model_powerful = model_powerful;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }

        // 覆盖搜索配置
        if let Some(search_api_key) = self.search_api_key {
            config.search.api_key = search_api_key;
        }
        if let Some(max_results) = self.max_results {
            config.search.max_results = max_results;
        }

        config.verbose = self.verbose;

        config
    }
}
