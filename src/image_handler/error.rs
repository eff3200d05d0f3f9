//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载下载、解码、编码链路中的所有错误来源。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 失败回调只关心两类：传输错误（`Network` / `Timeout`）与内容错误
//! （`Decode` / `InvalidFormat`），可通过 [`ImageError::is_transport`] 区分。

/// 图片处理统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("网络错误：{0}")]
    Network(String),

    #[error("超时错误：{0}")]
    Timeout(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("运行时错误：{0}")]
    Runtime(String),
}

impl ImageError {
    /// 是否为传输层错误（连接、DNS、超时、非 2xx）。
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }

    /// 稳定错误码，供日志聚合与调用方分支。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "E_NETWORK",
            Self::Timeout(_) => "E_TIMEOUT",
            Self::Decode(_) => "E_DECODE",
            Self::InvalidFormat(_) => "E_INVALID_FORMAT",
            Self::Encode(_) => "E_ENCODE",
            Self::FileSystem(_) => "E_FILE",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
            Self::Runtime(_) => "E_RUNTIME",
        }
    }

    /// 错误发生的处理阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::FileSystem(_) => "load",
            Self::Decode(_) | Self::InvalidFormat(_) | Self::ResourceLimit(_) => "decode",
            Self::Encode(_) => "encode",
            Self::Runtime(_) => "runtime",
        }
    }
}
