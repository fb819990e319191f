//! HTTP Synthesis Client - 调用外部 TTS HTTP 服务
//!
//! 外部 TTS API:
//! POST {base_url}/api/tts/infer
//! Request: {"text": "...", "voice": "af_heart", "device": "cuda"}  (JSON)
//! Response: audio/wav binary，朴素词边界（可选）在 `X-TTS-Word-Boundaries` 头中，
//! 格式为 `[{"word": "...", "start_ms": 0, "end_ms": 120}, ...]`

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

use crate::infrastructure::adapters::audio::decode_wav;
use crate::application::ports::{
    SynthesisEnginePort, SynthesisError, SynthesisOutput, SynthesisRequest,
};
use crate::domain::timing::WordBoundary;

const SESSION_HEADER: &str = "X-TTS-Session-Id";
const BOUNDARIES_HEADER: &str = "X-TTS-Word-Boundaries";

/// 合成请求体 (JSON)
#[derive(Debug, Serialize)]
struct SynthesisHttpRequest<'a> {
    text: &'a str,
    voice: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<&'a str>,
}

/// HTTP Synthesis 客户端配置
#[derive(Debug, Clone)]
pub struct HttpSynthesisClientConfig {
    /// TTS 服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 重试次数（仅针对网络错误、超时与 5xx）
    pub max_retries: u32,
}

impl Default for HttpSynthesisClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 300,
            max_retries: 1,
        }
    }
}

impl HttpSynthesisClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}

/// HTTP Synthesis 客户端
pub struct HttpSynthesisClient {
    client: Client,
    config: HttpSynthesisClientConfig,
}

impl HttpSynthesisClient {
    pub fn new(config: HttpSynthesisClientConfig) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SynthesisError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn infer_url(&self) -> String {
        format!("{}/api/tts/infer", self.config.base_url.trim_end_matches('/'))
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.config.base_url.trim_end_matches('/'))
    }

    fn is_retryable(err: &SynthesisError) -> bool {
        match err {
            SynthesisError::NetworkError(_) | SynthesisError::Timeout => true,
            SynthesisError::ServiceError(msg) => msg.starts_with("HTTP 5"),
            _ => false,
        }
    }

    async fn infer_once(&self, request: &SynthesisRequest) -> Result<SynthesisOutput, SynthesisError> {
        let body = SynthesisHttpRequest {
            text: &request.text,
            voice: &request.voice,
            device: request.device.as_deref(),
        };

        let response = self
            .client
            .post(self.infer_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SynthesisError::Timeout
                } else if e.is_connect() {
                    SynthesisError::NetworkError(format!("Cannot connect to TTS service: {}", e))
                } else {
                    SynthesisError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SynthesisError::VoiceNotFound(format!("{}: {}", request.voice, error_text)));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SynthesisError::ServiceError(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        // 从 headers 提取元数据
        let headers = response.headers();
        let session_id = headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        let boundaries: Vec<WordBoundary> = match headers.get(BOUNDARIES_HEADER) {
            Some(value) => serde_json::from_slice(value.as_bytes()).unwrap_or_else(|e| {
                tracing::warn!(session_id = %session_id, error = %e, "Ignoring malformed word boundaries");
                Vec::new()
            }),
            None => Vec::new(),
        };

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::InvalidResponse(format!("Failed to read audio: {}", e)))?;
        let audio = decode_wav(&bytes).map_err(|e| SynthesisError::InvalidResponse(e.to_string()))?;

        tracing::info!(
            session_id = %session_id,
            duration_ms = audio.duration_ms(),
            sample_rate = audio.sample_rate,
            boundaries = boundaries.len(),
            "Synthesis completed"
        );

        Ok(SynthesisOutput { audio, boundaries })
    }
}

#[async_trait]
impl SynthesisEnginePort for HttpSynthesisClient {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisOutput, SynthesisError> {
        tracing::debug!(
            url = %self.infer_url(),
            text_len = request.text.len(),
            voice = %request.voice,
            "Sending synthesis request"
        );

        let mut attempt = 0;
        loop {
            match self.infer_once(&request).await {
                Ok(output) => return Ok(output),
                Err(e) if attempt < self.config.max_retries && Self::is_retryable(&e) => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "Synthesis failed, retrying");
                    tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AudioBuffer;
    use crate::infrastructure::adapters::audio::encode_wav;
    use axum::http::{HeaderMap, HeaderValue};
    use axum::routing::post;
    use axum::Router;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_config_builder() {
        let config = HttpSynthesisClientConfig::new("http://example.com:9000")
            .with_timeout(60)
            .with_retries(3);
        assert_eq!(config.base_url, "http://example.com:9000");
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.max_retries, 3);
    }

    #[tokio::test]
    async fn test_synthesize_reads_audio_and_boundaries() {
        let wav = encode_wav(&AudioBuffer::new(vec![0.3; 2400], 24000)).unwrap();
        let router = Router::new().route(
            "/api/tts/infer",
            post(move || {
                let wav = wav.clone();
                async move {
                    let mut headers = HeaderMap::new();
                    headers.insert(SESSION_HEADER, HeaderValue::from_static("s-1"));
                    headers.insert(
                        BOUNDARIES_HEADER,
                        HeaderValue::from_static(r#"[{"word":"hi","start_ms":0,"end_ms":100}]"#),
                    );
                    (headers, wav)
                }
            }),
        );
        let base = spawn_upstream(router).await;
        let client = HttpSynthesisClient::new(HttpSynthesisClientConfig::new(base)).unwrap();

        let output = client
            .synthesize(SynthesisRequest {
                text: "hi".into(),
                voice: "af_heart".into(),
                device: Some("cpu".into()),
            })
            .await
            .unwrap();

        assert_eq!(output.audio.duration_ms(), 100);
        assert_eq!(output.boundaries.len(), 1);
        assert_eq!(output.boundaries[0].word, "hi");
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/api/tts/infer",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (axum::http::StatusCode::SERVICE_UNAVAILABLE, "busy")
                }
            }),
        );
        let base = spawn_upstream(router).await;
        let client =
            HttpSynthesisClient::new(HttpSynthesisClientConfig::new(base).with_retries(1)).unwrap();

        let result = client
            .synthesize(SynthesisRequest {
                text: "hi".into(),
                voice: "af_heart".into(),
                device: None,
            })
            .await;

        assert!(matches!(result, Err(SynthesisError::ServiceError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
