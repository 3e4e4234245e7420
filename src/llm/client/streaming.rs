//! OpenAI兼容chat completions协议的流式（SSE）调用
//!
//! rig的非流式调用不产出token增量，查询生成与报告整理
//! 需要逐token推进，因此流式路径直接走SSE。

use anyhow::{Result, anyhow};
use futures::StreamExt;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::config::LLMConfig;
use crate::error::PipelineError;
use crate::llm::TokenStream;

/// SSE行缓冲
///
/// 字节块按行切分，跨块的半行留待下一块补齐。
/// 按字节找换行再整行解码，避免把多字节字符切坏。
#[derive(Debug, Default)]
struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            lines.push(text.trim_end_matches(['\n', '\r']).to_string());
        }
        lines
    }
}

enum TokenEvent {
    Token(String),
    Done,
}

/// 解析单条SSE行，提取其中的文本增量
fn parse_sse_line(line: &str) -> Option<TokenEvent> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let data = line.strip_prefix("data:")?.trim();
    if data == "[DONE]" {
        return Some(TokenEvent::Done);
    }
    let value: Value = serde_json::from_str(data).ok()?;
    let content = value
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()?;
    if content.is_empty() {
        return None;
    }
    Some(TokenEvent::Token(content.to_string()))
}

/// 发起流式补全请求，返回token流
pub(crate) async fn open_stream(
    http: &reqwest::Client,
    config: &LLMConfig,
    model: &str,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<TokenStream> {
    let url = format!(
        "{}/chat/completions",
        config.api_base_url.trim_end_matches('/')
    );

    let body = json!({
        "model": model,
        "messages": [
            { "role": "system", "content": system_prompt },
            { "role": "user", "content": user_prompt },
        ],
        "temperature": config.temperature,
        "max_tokens": config.max_tokens,
        "stream": true,
    });

    let mut request = http
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&body);
    if !config.api_key.is_empty() {
        request = request.header("Authorization", format!("Bearer {}", config.api_key));
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(anyhow!("模型服务返回{}: {}", status, detail));
    }

    let (tx, rx) = mpsc::channel::<Result<String, PipelineError>>(64);

    tokio::spawn(async move {
        let mut bytes = response.bytes_stream();
        let mut buffer = SseLineBuffer::default();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = tx.send(Err(PipelineError::from(err))).await;
                    return;
                }
            };
            for line in buffer.push(&chunk) {
                match parse_sse_line(&line) {
                    Some(TokenEvent::Done) => return,
                    Some(TokenEvent::Token(token)) => {
                        if tx.send(Ok(token)).await.is_err() {
                            // 接收方已放弃该流
                            return;
                        }
                    }
                    None => {}
                }
            }
        }
    });

    let stream =
        futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|i| (i, rx)) });
    Ok(Box::pin(stream))
}
