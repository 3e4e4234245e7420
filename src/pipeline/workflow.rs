//! 调研工作流入口 - 装配各后端并驱动编排器

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;

use crate::broadcast::{ChannelBroadcaster, StatusBroadcaster};
use crate::config::Config;
use crate::llm::LLMClient;
use crate::pipeline::context::{CompanyProfile, PipelineContext};
use crate::pipeline::orchestrator::ResearchOrchestrator;
use crate::search::TavilyClient;

/// 启动公司调研工作流
pub async fn launch(config: &Config) -> Result<String> {
    let llm = LLMClient::new(config.llm.clone())?;

    // 启动时检查模型连接
    llm.check_connection().await?;

    let search = TavilyClient::new(config.search.clone())?;

    let broadcaster = Arc::new(ChannelBroadcaster::new(256));
    let printer = spawn_status_printer(&broadcaster, config.verbose);

    let profile = CompanyProfile::new(
        config.company.clone(),
        config.industry.clone(),
        config.hq_location.clone(),
    );
    let ctx = PipelineContext::new(Arc::new(llm), Arc::new(search), profile, config.clone())
        .with_broadcaster(broadcaster as Arc<dyn StatusBroadcaster>);

    let orchestrator = ResearchOrchestrator::default();
    let report = orchestrator.execute_research_pipeline(&ctx).await?;

    let path = save_report(config, &ctx.profile.company, &report)?;
    println!("💾 报告已保存至 {}", path.display());

    printer.abort();
    Ok(report)
}

/// 订阅进度事件并打印到控制台（实时客户端的最小实现）
fn spawn_status_printer(
    broadcaster: &Arc<ChannelBroadcaster>,
    verbose: bool,
) -> tokio::task::JoinHandle<()> {
    let mut updates = broadcaster.subscribe();
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => {
                    // token级高频事件仅在verbose模式下打印
                    let chatty =
                        matches!(update.status.as_str(), "query_generating" | "report_chunk");
                    if chatty && !verbose {
                        continue;
                    }
                    println!("📡 [{}] {}", update.status, update.message);
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// 报告落盘到输出目录
fn save_report(config: &Config, company: &str, report: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(&config.output_path).context("创建输出目录失败")?;
    let path = config.output_path.join(format!("{}研究报告.md", company));
    std::fs::write(&path, report).context("写入报告文件失败")?;
    Ok(path)
}
