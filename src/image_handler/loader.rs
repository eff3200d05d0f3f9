//! # 加载模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（URL / Base64 / 本地文件）的原始字节加载。
//! 加载阶段只负责“拿到完整字节”，是否为合法图片交给解码阶段判断；
//! 响应体不做 Content-Type 校验。
//!
//! ## 实现思路
//!
//! - URL：协议校验 → GET → 状态码校验 → 体积校验 → 分块读取（带进度回调）。
//! - Base64：格式解析 + 解码前体积估算。
//! - 文件：存在性 + metadata 体积限制 + 读取。
//! - 网络错误统一映射到 `ImageError`，便于上层区分传输错误。
//!
//! 响应与连接在作用域结束时释放，成功与失败路径一致。

use std::path::Path;
use std::time::Duration;

use super::codec;
use super::source::RawImageData;
use super::{ImageConfig, ImageError, ImageHandler};

const BUFFER_INITIAL_CAPACITY: usize = 16 * 1024;

impl ImageHandler {
    /// 从 URL 加载图片原始字节。
    pub(super) async fn load_from_url<P>(
        &self,
        url: &str,
        on_progress: &P,
    ) -> Result<RawImageData, ImageError>
    where
        P: Fn(u64, Option<u64>) + Send + Sync + ?Sized,
    {
        log::info!("🌐 开始下载图片 - URL: {}", Self::redact_url_for_log(url));

        let bytes = self.download_bytes(url, on_progress).await?;

        Ok(RawImageData {
            bytes,
            source_hint: "url",
        })
    }

    /// 从 Base64 字符串加载图片原始字节。
    pub(super) fn load_from_base64(&self, data: &str) -> Result<RawImageData, ImageError> {
        log::info!("📝 开始处理 base64 图片");

        let bytes = codec::parse_base64(data, self.config.max_file_size)?;
        if bytes.len() as u64 > self.config.max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "Base64 解码后体积过大：{:.2} MB（限制：{:.2} MB）",
                bytes.len() as f64 / 1024.0 / 1024.0,
                self.config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        Ok(RawImageData {
            bytes,
            source_hint: "base64",
        })
    }

    /// 从本地路径加载图片原始字节。
    pub(super) fn load_from_file(&self, path: &str) -> Result<RawImageData, ImageError> {
        log::info!("📁 开始读取本地图片 - 路径: {}", path);

        let file_path = Path::new(path);
        if !file_path.exists() {
            return Err(ImageError::FileSystem(format!("文件不存在：{}", path)));
        }

        let metadata = std::fs::metadata(file_path)
            .map_err(|e| ImageError::FileSystem(format!("无法读取文件信息：{}", e)))?;

        if metadata.len() > self.config.max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                self.config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = std::fs::read(file_path)
            .map_err(|e| ImageError::FileSystem(format!("无法读取图片文件：{}", e)))?;

        Ok(RawImageData {
            bytes,
            source_hint: "file",
        })
    }

    /// 执行一次 GET 并完整读取响应体。
    async fn download_bytes<P>(&self, url: &str, on_progress: &P) -> Result<Vec<u8>, ImageError>
    where
        P: Fn(u64, Option<u64>) + Send + Sync + ?Sized,
    {
        let config = &self.config;
        let parsed = Self::validate_url(url)?;
        let client = Self::build_http_client(config)?;

        log::debug!("📡 发送 HTTP 请求...");
        let response = client
            .get(parsed)
            .send()
            .await
            .map_err(|e| Self::map_reqwest_error(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::Network(format!(
                "HTTP {}: {}",
                status.as_u16(),
                Self::status_message(status.as_u16())
            )));
        }

        let total_len = response.content_length();
        if let Some(size) = total_len {
            if size > config.max_file_size {
                return Err(ImageError::ResourceLimit(format!(
                    "文件过大：{:.2} MB（限制：{:.2} MB）",
                    size as f64 / 1024.0 / 1024.0,
                    config.max_file_size as f64 / 1024.0 / 1024.0
                )));
            }
        }

        on_progress(0, total_len);

        let initial_capacity = total_len
            .map(|len| len.min(config.max_file_size).min(usize::MAX as u64) as usize)
            .filter(|len| *len > 0)
            .unwrap_or(BUFFER_INITIAL_CAPACITY);
        let mut buffer = Vec::with_capacity(initial_capacity);
        let mut total: u64 = 0;
        let mut response = response;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Self::map_reqwest_error(e, url))?
        {
            total = total.saturating_add(chunk.len() as u64);
            if total > config.max_file_size {
                return Err(ImageError::ResourceLimit("下载后文件超过大小限制".to_string()));
            }
            buffer.extend_from_slice(&chunk);
            on_progress(total, total_len);
        }

        log::debug!("✅ 下载完成 - {} bytes", buffer.len());
        Ok(buffer)
    }

    fn build_http_client(config: &ImageConfig) -> Result<reqwest::Client, ImageError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects));

        if let Some(secs) = config.download_timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.connect_timeout {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        builder
            .build()
            .map_err(|e| ImageError::Network(format!("无法创建 HTTP 客户端：{}", e)))
    }

    fn validate_url(url: &str) -> Result<reqwest::Url, ImageError> {
        let parsed = reqwest::Url::parse(url.trim())
            .map_err(|e| ImageError::InvalidFormat(format!("URL 格式错误：{}", e)))?;

        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            other => Err(ImageError::InvalidFormat(format!("仅支持 HTTP/HTTPS，实际为：{}", other))),
        }
    }

    /// 统一映射 reqwest 错误到业务错误。
    fn map_reqwest_error(e: reqwest::Error, url: &str) -> ImageError {
        let err_msg = e.to_string().replace(url, &Self::redact_url_for_log(url));

        if e.is_timeout() {
            ImageError::Timeout(format!("下载超时：{}", err_msg))
        } else if e.is_connect() {
            ImageError::Network(format!("无法连接：{}", err_msg))
        } else if e.is_redirect() {
            ImageError::Network(format!("重定向失败：{}", err_msg))
        } else {
            ImageError::Network(format!("请求失败：{}", err_msg))
        }
    }

    /// 常见 HTTP 状态码本地化文案。
    fn status_message(code: u16) -> &'static str {
        match code {
            404 => "未找到",
            403 => "访问被拒绝",
            500..=599 => "服务器错误",
            _ => "请求失败",
        }
    }

    /// 日志中去掉 query 与 fragment，避免泄露签名参数。
    pub(crate) fn redact_url_for_log(url: &str) -> String {
        let Ok(parsed) = reqwest::Url::parse(url) else {
            return "<invalid-url>".to_string();
        };

        let host = parsed.host_str().unwrap_or("<unknown-host>");
        let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();
        let path = parsed.path();

        format!("{}://{}{}{}", parsed.scheme(), host, port, path)
    }
}
