//! # 编解码模块
//!
//! ## 设计思路
//!
//! 字节与位图互转的唯一入口：
//! - `decode`：失败时返回 `None`，不抛错误，调用方只需判断有无结果
//! - `try_decode` / `decode_with_limits`：携带错误原因，供下载链路区分“格式不认识”与“内容损坏”
//! - `encode`：固定 PNG 无损编码，不暴露格式参数
//!
//! ## 实现思路
//!
//! 1. 猜测格式（失败即 `InvalidFormat`）
//! 2. 需要限制时先读 header 尺寸，按像素上限快速拒绝
//! 3. 完整解码并统一转换为 RGBA

use base64::{Engine as _, engine::general_purpose};
use image::{ImageFormat, ImageReader};
use std::io::Cursor;

use super::{Bitmap, ImageConfig, ImageError};

/// 将完整字节解码为位图；无法识别或数据损坏时返回 `None`。
pub fn decode(bytes: &[u8]) -> Option<Bitmap> {
    match try_decode(bytes) {
        Ok(bitmap) => Some(bitmap),
        Err(err) => {
            log::debug!("图片解码无结果：{}", err);
            None
        }
    }
}

/// 将完整字节解码为位图，失败时返回具体原因。
pub fn try_decode(bytes: &[u8]) -> Result<Bitmap, ImageError> {
    let format = guess_format(bytes)?;
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;
    Ok(Bitmap::from(decoded))
}

/// 解码前先按 header 尺寸校验像素上限。
pub fn decode_with_limits(bytes: &[u8], config: &ImageConfig) -> Result<Bitmap, ImageError> {
    let format = guess_format(bytes)?;
    let (width, height) = inspect_dimensions(bytes)?;
    validate_pixel_limits(config, width, height)?;

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;
    Ok(Bitmap::from(decoded))
}

/// 将位图编码为 PNG 字节（无损）。
pub fn encode(bitmap: &Bitmap) -> Result<Vec<u8>, ImageError> {
    let mut cursor = Cursor::new(Vec::new());
    bitmap
        .as_rgba()
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| ImageError::Encode(format!("PNG 编码失败：{}", e)))?;
    Ok(cursor.into_inner())
}

/// 解析 Base64 输入（支持 Data URL / 纯 Base64），解码前按体积上限拒绝。
pub fn parse_base64(data: &str, max_file_size: u64) -> Result<Vec<u8>, ImageError> {
    let normalized = data.trim();

    let payload = if normalized.starts_with("data:") {
        if !normalized.starts_with("data:image/") {
            return Err(ImageError::InvalidFormat("Data URL 不是图片类型".to_string()));
        }
        let base64_start = normalized
            .find(";base64,")
            .ok_or_else(|| ImageError::InvalidFormat("缺少 base64 标记".to_string()))?;
        &normalized[base64_start + 8..]
    } else {
        normalized
    };

    let estimated_len = estimate_base64_decoded_upper_bound_len(payload)?;
    if estimated_len > max_file_size {
        return Err(ImageError::ResourceLimit(format!(
            "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
            estimated_len as f64 / 1024.0 / 1024.0,
            max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| ImageError::Decode(format!("Base64 解码失败：{}", e)))
}

fn guess_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::InvalidFormat("图片内容为空".to_string()));
    }
    image::guess_format(bytes)
        .map_err(|e| ImageError::InvalidFormat(format!("不支持的图片格式：{}", e)))
}

/// 仅通过内存中的图片头信息读取宽高。
fn inspect_dimensions(bytes: &[u8]) -> Result<(u32, u32), ImageError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageError::InvalidFormat(format!("无法识别图片格式：{}", e)))?;

    reader
        .into_dimensions()
        .map_err(|e| ImageError::Decode(format!("无法读取图片尺寸：{}", e)))
}

fn validate_pixel_limits(config: &ImageConfig, width: u32, height: u32) -> Result<(), ImageError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| ImageError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > config.max_decoded_pixels {
        return Err(ImageError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    Ok(())
}

fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, ImageError> {
    let len = base64_data.trim().len() as u64;
    let groups = len
        .checked_add(3)
        .ok_or_else(|| ImageError::ResourceLimit("Base64 输入长度溢出".to_string()))?
        / 4;

    groups
        .checked_mul(3)
        .ok_or_else(|| ImageError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
}
