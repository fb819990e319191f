//! HTTP Aligner - 调用外部强制对齐服务
//!
//! 外部对齐 API:
//! POST {base_url}/api/align/{backend}
//! Request: multipart (audio: WAV 文件, text, device?)
//! Response: {"words": [{"word": "...", "start_ms": 0, "end_ms": 120}, ...]}
//!
//! 404 / 501 / 503 以及连接失败视为后端不可用

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::application::ports::{AlignmentBackend, AlignmentEnginePort, AlignmentError};
use crate::domain::timing::WordBoundary;
use crate::domain::AudioBuffer;
use crate::infrastructure::adapters::audio::encode_wav;

#[derive(Debug, Deserialize)]
struct AlignHttpResponse {
    words: Vec<WordBoundary>,
}

/// 单个对齐后端的 HTTP 客户端
pub struct HttpAligner {
    client: Client,
    base_url: String,
    backend: AlignmentBackend,
}

impl HttpAligner {
    pub fn new(client: Client, base_url: impl Into<String>, backend: AlignmentBackend) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            backend,
        }
    }

    /// 构造共享的 HTTP 客户端
    pub fn build_client(timeout_secs: u64) -> Result<Client, AlignmentError> {
        Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AlignmentError::Failed(e.to_string()))
    }

    fn align_url(&self) -> String {
        format!(
            "{}/api/align/{}",
            self.base_url.trim_end_matches('/'),
            self.backend.as_str()
        )
    }
}

#[async_trait]
impl AlignmentEnginePort for HttpAligner {
    async fn align(
        &self,
        audio: &AudioBuffer,
        text: &str,
        device: Option<&str>,
    ) -> Result<Vec<WordBoundary>, AlignmentError> {
        let wav = encode_wav(audio).map_err(|e| AlignmentError::Failed(e.to_string()))?;
        let audio_part = Part::bytes(wav)
            .file_name("chapter.wav")
            .mime_str("audio/wav")
            .map_err(|e| AlignmentError::Failed(e.to_string()))?;

        let mut form = Form::new().part("audio", audio_part).text("text", text.to_string());
        if let Some(device) = device {
            form = form.text("device", device.to_string());
        }

        tracing::debug!(url = %self.align_url(), text_len = text.len(), "Sending alignment request");

        let response = self
            .client
            .post(self.align_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    AlignmentError::Unavailable(format!("cannot connect to aligner: {}", e))
                } else if e.is_timeout() {
                    AlignmentError::Failed("alignment request timed out".to_string())
                } else {
                    AlignmentError::Failed(e.to_string())
                }
            })?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::NOT_FOUND | StatusCode::NOT_IMPLEMENTED | StatusCode::SERVICE_UNAVAILABLE
        ) {
            let detail = response.text().await.unwrap_or_default();
            return Err(AlignmentError::Unavailable(format!(
                "{} (HTTP {}): {}",
                self.backend,
                status.as_u16(),
                detail
            )));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AlignmentError::Failed(format!("HTTP {}: {}", status.as_u16(), detail)));
        }

        let body: AlignHttpResponse = response
            .json()
            .await
            .map_err(|e| AlignmentError::InvalidResponse(e.to_string()))?;
        Ok(body.words)
    }
}
