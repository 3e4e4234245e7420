//! 状态广播 - 面向实时客户端的进度事件下发
//!
//! 广播是尽力而为的：没有订阅者、通道滞后或实现缺失
//! 都不会影响调研管线本身。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// 单条进度事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// 调研任务标识
    pub job_id: String,
    /// 状态标签（query_generating、briefing_start、report_chunk等）
    pub status: String,
    /// 人类可读的进度描述
    pub message: String,
    /// 状态附带的结构化数据
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// 事件时间戳
    pub timestamp: DateTime<Utc>,
}

/// 状态广播能力抽象
///
/// 空对象实现（[`NoopBroadcaster`]）使调用点无需判空，
/// 任何实现都不得让发送失败影响调用方。
#[async_trait]
pub trait StatusBroadcaster: Send + Sync {
    async fn send_status_update(
        &self,
        job_id: &str,
        status: &str,
        message: &str,
        result: Option<Value>,
    );
}

/// 空广播器 - 所有通知静默丢弃
#[derive(Debug, Default, Clone)]
pub struct NoopBroadcaster;

#[async_trait]
impl StatusBroadcaster for NoopBroadcaster {
    async fn send_status_update(
        &self,
        _job_id: &str,
        _status: &str,
        _message: &str,
        _result: Option<Value>,
    ) {
    }
}

/// 基于tokio broadcast通道的广播器
///
/// 订阅端各自持有Receiver，慢速订阅者滞后时事件被覆盖而非阻塞发送。
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    tx: broadcast::Sender<StatusUpdate>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// 订阅事件流
    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl StatusBroadcaster for ChannelBroadcaster {
    async fn send_status_update(
        &self,
        job_id: &str,
        status: &str,
        message: &str,
        result: Option<Value>,
    ) {
        let update = StatusUpdate {
            job_id: job_id.to_string(),
            status: status.to_string(),
            message: message.to_string(),
            result,
            timestamp: Utc::now(),
        };
        // 无订阅者时send返回Err，按尽力而为语义忽略
        let _ = self.tx.send(update);
    }
}
