//! Upstream Client - 面向生成服务的流式 HTTP 客户端
//!
//! 下载: 上游 body 直接管道给调用方，不整体缓冲；中途出错时下游响应随之中断
//! 上传: 文件从磁盘流式写入 multipart 请求体
//!
//! 超时只约束建立连接到收到响应头这一段，body 的传输时长不受限

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, Method},
    response::Response,
};
use futures_util::TryStreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;

use super::error::GatewayError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// 由代理层重新计算的传输层头部，不从上游复制
static HOP_BY_HOP_HEADERS: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// 转发给上游的请求头
static FORWARDED_REQUEST_HEADERS: [HeaderName; 2] = [header::ACCEPT, header::RANGE];

/// 上传到上游的文件
#[derive(Debug)]
pub struct UploadFile<'a> {
    pub path: &'a Path,
    pub file_name: String,
    pub content_type: String,
}

/// 生成服务客户端
///
/// `base_url` 为空时视为未配置，所有调用直接返回 `NotConfigured`
pub struct UpstreamClient {
    http: Client,
    base_url: Option<String>,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(base_url: Option<String>, timeout_secs: u64) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Network(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        Ok(Self {
            http,
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    fn url(&self, path_and_query: &str) -> Result<String, GatewayError> {
        let base = self.base_url.as_deref().ok_or(GatewayError::NotConfigured)?;
        Ok(format!("{}{}", base, path_and_query))
    }

    /// 原样转发一个无 body 的请求（GET / DELETE）
    pub async fn relay(
        &self,
        method: Method,
        path_and_query: &str,
        headers: &HeaderMap,
    ) -> Result<Response, GatewayError> {
        let url = self.url(path_and_query)?;
        tracing::debug!(method = %method, url = %url, "Relaying request upstream");

        let mut request = self.http.request(method, &url);
        for name in FORWARDED_REQUEST_HEADERS.iter() {
            if let Some(value) = headers.get(name) {
                request = request.header(name.clone(), value.clone());
            }
        }

        self.send(request).await
    }

    /// 把暂存文件与表单字段流式上传到 `POST {base}{path}`
    pub async fn upload(
        &self,
        path: &str,
        fields: Vec<(String, String)>,
        file: UploadFile<'_>,
    ) -> Result<Response, GatewayError> {
        let url = self.url(path)?;

        let source = tokio::fs::File::open(file.path).await?;
        let length = source.metadata().await?.len();
        let body = reqwest::Body::wrap_stream(ReaderStream::new(source));
        let part = Part::stream_with_length(body, length)
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| GatewayError::BadRequest(format!("Invalid content type: {}", e)))?;

        let mut form = Form::new();
        for (name, value) in fields {
            form = form.text(name, value);
        }
        let form = form.part("file", part);

        tracing::info!(url = %url, file_name = %file.file_name, length, "Uploading source document upstream");

        self.send(self.http.post(&url).multipart(form)).await
    }

    /// 发送请求并等待响应头；2xx body 在超时之外继续流式传输
    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let exchange = async {
            let upstream = request.send().await?;
            into_downstream(upstream).await
        };
        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout))?
    }
}

/// 上游响应 → 下游响应
///
/// 非 2xx 时读取（较小的）错误 body 并透传；2xx 时 body 以流的形式转发
async fn into_downstream(upstream: reqwest::Response) -> Result<Response, GatewayError> {
    let status = upstream.status();
    if !status.is_success() {
        let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
        let body = upstream.bytes().await?;
        return Err(GatewayError::Upstream {
            status,
            content_type,
            body,
        });
    }

    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);

    let stream = upstream
        .bytes_stream()
        .inspect_err(|e| tracing::warn!(error = %e, "Upstream body aborted mid-transfer"));

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// 删除逐跳头部，以及 `Connection` 中列出的头部
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP_HEADERS.iter()) {
        headers.remove(name);
    }
}
