//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageHandler` 持有不可变配置，负责“加载 → 解码”两段流程的编排。
//! 处理器本身无可变状态，可放进 `Arc` 在多个下载请求之间共享。
//!
//! ## 实现思路
//!
//! - `fetch` 是下载的 future 形式；回调形式见 [`ImageDownload`](super::ImageDownload)。
//! - `load` 支持 URL / Base64 / 文件三种来源。
//! - 记录 `load/decode/total` 阶段耗时，便于性能诊断。

use std::time::Instant;

use super::codec;
use super::source::RawImageData;
use super::{Bitmap, ImageConfig, ImageError, ImageSource};

/// 图片处理器。
#[derive(Debug, Clone, Default)]
pub struct ImageHandler {
    pub(super) config: ImageConfig,
}

impl ImageHandler {
    /// 根据配置创建处理器。
    ///
    /// # 示例
    /// ```rust
    /// use imgtools::image_handler::{ImageConfig, ImageHandler};
    ///
    /// let handler = ImageHandler::new(ImageConfig::default());
    /// assert_eq!(handler.config().max_redirects, 10);
    /// ```
    pub fn new(config: ImageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    /// 下载并解码网络图片。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use imgtools::image_handler::ImageHandler;
    ///
    /// # async fn demo() -> Result<(), imgtools::image_handler::ImageError> {
    /// let bitmap = ImageHandler::default().fetch("https://example.com/a.png").await?;
    /// println!("{}x{}", bitmap.width(), bitmap.height());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fetch(&self, url: &str) -> Result<Bitmap, ImageError> {
        self.fetch_with_progress(url, &|_: u64, _: Option<u64>| {}).await
    }

    /// 带进度回调的下载：`on_progress(已下载字节, 总字节)`。
    pub async fn fetch_with_progress<P>(&self, url: &str, on_progress: &P) -> Result<Bitmap, ImageError>
    where
        P: Fn(u64, Option<u64>) + Send + Sync + ?Sized,
    {
        let total_start = Instant::now();

        let raw = self.load_from_url(url, on_progress).await?;
        let load_elapsed = total_start.elapsed();

        let bitmap = self.decode_raw(raw)?;

        log::info!(
            "✅ URL 图片处理完成 - load={}ms total={}ms",
            load_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(bitmap)
    }

    /// 从任意来源加载并解码图片。
    pub async fn load(&self, source: ImageSource) -> Result<Bitmap, ImageError> {
        let total_start = Instant::now();

        let raw = match source {
            ImageSource::Url(url) => {
                self.load_from_url(&url, &|_: u64, _: Option<u64>| {}).await?
            }
            ImageSource::Base64(data) => self.load_from_base64(&data)?,
            ImageSource::FilePath(path) => self.load_from_file(&path)?,
        };
        let load_elapsed = total_start.elapsed();

        let bitmap = self.decode_raw(raw)?;

        log::info!(
            "✅ 图片加载完成 - load={}ms total={}ms",
            load_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(bitmap)
    }

    fn decode_raw(&self, raw: RawImageData) -> Result<Bitmap, ImageError> {
        let decode_start = Instant::now();
        let bitmap = codec::decode_with_limits(&raw.bytes, &self.config)?;

        log::info!(
            "✅ 图片解码成功 - 来源: {} 尺寸: {}x{} 耗时: {}ms",
            raw.source_hint,
            bitmap.width(),
            bitmap.height(),
            decode_start.elapsed().as_millis()
        );

        Ok(bitmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine as _, engine::general_purpose};
    use image::Rgba;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let bitmap = Bitmap::from_fn(width, height, |x, y| {
            Rgba([(x % 255) as u8, (y % 255) as u8, ((x + y) % 255) as u8, 255])
        });
        codec::encode(&bitmap).expect("failed to encode test image")
    }

    #[tokio::test]
    async fn load_decodes_base64_source() {
        let handler = ImageHandler::default();
        let data_url = format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(png_bytes(12, 8))
        );

        let bitmap = handler
            .load(ImageSource::Base64(data_url))
            .await
            .expect("base64 source should load");

        assert_eq!(bitmap.dimensions(), (12, 8));
    }

    #[tokio::test]
    async fn load_rejects_non_image_base64_payload() {
        let handler = ImageHandler::default();
        let result = handler.load(ImageSource::Base64("SGVsbG8=".into())).await;

        assert!(matches!(result, Err(ImageError::InvalidFormat(_))));
    }

    #[tokio::test]
    async fn load_reads_file_source() {
        let path = std::env::temp_dir().join(format!("imgtools-handler-{}.png", std::process::id()));
        std::fs::write(&path, png_bytes(5, 9)).expect("write temp image failed");

        let result = ImageHandler::default()
            .load(ImageSource::FilePath(path.to_string_lossy().into_owned()))
            .await;
        let _ = std::fs::remove_file(&path);

        assert_eq!(result.expect("file source should load").dimensions(), (5, 9));
    }

    #[tokio::test]
    async fn load_enforces_pixel_limit() {
        let handler = ImageHandler::new(ImageConfig {
            max_decoded_pixels: 100,
            ..ImageConfig::default()
        });
        let encoded = general_purpose::STANDARD.encode(png_bytes(20, 20));

        let result = handler.load(ImageSource::Base64(encoded)).await;

        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }
}
