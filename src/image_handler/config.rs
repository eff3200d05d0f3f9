//! # 配置模块
//!
//! ## 设计思路
//!
//! 将下载与解码阶段的“可调策略”集中到 `ImageConfig`，保证行为可观测、可调整、可测试。
//! 超时默认不设置，沿用 HTTP 客户端自身的默认行为；需要时再通过配置开启。
//!
//! ## 实现思路
//!
//! - `Default` 提供开箱即用的配置。
//! - `#[serde(default)]` 允许 JSON 只写需要覆盖的字段。
//! - `validate` 在加载后统一做区间校验，尽早失败。

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ImageError;

/// 图片处理配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// 下载/读取原始字节时允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 建立连接（TCP/TLS）超时时间（秒），`None` 表示使用客户端默认值。
    pub connect_timeout: Option<u64>,
    /// 整个请求的超时时间（秒），`None` 表示使用客户端默认值。
    pub download_timeout: Option<u64>,
    /// 最大重定向次数。
    pub max_redirects: usize,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 请求使用的 User-Agent。
    pub user_agent: String,
    /// 是否读取 `HTTP_PROXY` 等环境变量中的系统代理。
    pub use_system_proxy: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            connect_timeout: None,
            download_timeout: None,
            max_redirects: 10,
            max_decoded_pixels: 40_000_000,
            user_agent: format!("imgtools/{}", env!("CARGO_PKG_VERSION")),
            use_system_proxy: true,
        }
    }
}

impl ImageConfig {
    /// 从 JSON 文件读取配置，缺失字段使用默认值。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use imgtools::image_handler::ImageConfig;
    ///
    /// let config = ImageConfig::from_json_file("imgtools.json")?;
    /// # Ok::<(), imgtools::image_handler::ImageError>(())
    /// ```
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ImageError::FileSystem(format!("无法读取配置文件 {}：{}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    /// 从 JSON 字符串解析配置并校验。
    pub fn from_json_str(content: &str) -> Result<Self, ImageError> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| ImageError::InvalidFormat(format!("解析配置失败：{}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置取值区间。
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.max_file_size == 0 {
            return Err(ImageError::InvalidFormat("max_file_size 不能为 0".to_string()));
        }
        if self.max_decoded_pixels == 0 {
            return Err(ImageError::InvalidFormat("max_decoded_pixels 不能为 0".to_string()));
        }
        if self.max_redirects > 20 {
            return Err(ImageError::InvalidFormat("max_redirects 不能大于 20".to_string()));
        }
        if let Some(secs) = self.connect_timeout {
            if !(1..=600).contains(&secs) {
                return Err(ImageError::InvalidFormat("connect_timeout 必须在 1~600 秒之间".to_string()));
            }
        }
        if let Some(secs) = self.download_timeout {
            if !(1..=600).contains(&secs) {
                return Err(ImageError::InvalidFormat("download_timeout 必须在 1~600 秒之间".to_string()));
            }
        }
        if self.user_agent.trim().is_empty() {
            return Err(ImageError::InvalidFormat("user_agent 不能为空".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_and_has_no_timeouts() {
        let config = ImageConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.connect_timeout, None);
        assert_eq!(config.download_timeout, None);
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let config = ImageConfig::from_json_str(r#"{ "download_timeout": 15 }"#)
            .expect("partial config should parse");

        assert_eq!(config.download_timeout, Some(15));
        assert_eq!(config.max_file_size, ImageConfig::default().max_file_size);
        assert_eq!(config.max_redirects, 10);
    }

    #[test]
    fn rejects_out_of_range_timeouts() {
        let result = ImageConfig::from_json_str(r#"{ "connect_timeout": 0 }"#);
        assert!(matches!(result, Err(ImageError::InvalidFormat(_))));

        let result = ImageConfig::from_json_str(r#"{ "download_timeout": 9000 }"#);
        assert!(matches!(result, Err(ImageError::InvalidFormat(_))));
    }

    #[test]
    fn rejects_malformed_json() {
        let result = ImageConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(ImageError::InvalidFormat(_))));
    }

    #[test]
    fn missing_file_is_a_file_system_error() {
        let result = ImageConfig::from_json_file("/nonexistent/imgtools.json");
        assert!(matches!(result, Err(ImageError::FileSystem(_))));
    }
}
