//! 管线错误类型
//!
//! `PipelineError` 是各调研阶段内部使用的类型化错误。所有面向服务方的错误在
//! 阶段边界被转换为降级但有效的结果（见 SPEC §7）。

use thiserror::Error;

/// 调研管线错误taxonomy
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 单次操作超时
    #[error("操作超时: {0}")]
    Timeout(String),

    /// 结果为空
    #[error("空结果: {0}")]
    EmptyResult(String),

    /// 服务方（LLM/搜索）返回错误
    #[error("服务错误: {0}")]
    Provider(String),

    /// 输入数据缺失或格式错误
    #[error("输入错误: {0}")]
    MalformedInput(String),
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Provider(err.to_string())
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        PipelineError::Provider(err.to_string())
    }
}
