//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义应用级 `AppError`，供命令行入口统一返回，
//! 替代分散的 `.map_err(|e| e.to_string())`、`expect()` 等不一致模式。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ImageError` 与 `std::io::Error` 提供 `From` 转换，`?` 即可上抛。

use crate::image_handler::ImageError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片处理流水线错误（下载 / 解码 / 编码）
    #[error("{0}")]
    Image(#[from] ImageError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 命令行参数不合法
    #[error("参数错误: {0}")]
    InvalidArgument(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_error_message_is_passed_through() {
        let err: AppError = ImageError::Network("HTTP 404: 未找到".into()).into();
        assert_eq!(err.to_string(), "网络错误：HTTP 404: 未找到");
    }
}
