//! # 几何变换模块
//!
//! ## 设计思路
//!
//! 三个变换都返回新的位图，不修改输入：
//! - `square_crop`：居中裁成正方形，不缩放
//! - `rounded_corners`：绘制圆角矩形遮罩，再以 source-in 方式合成源图
//! - `circular_crop`：先方形裁剪，再以原始宽度为半径做圆角（半径被钳制后即为圆）
//!
//! ## 实现思路
//!
//! 遮罩用 tiny-skia 在透明 `Pixmap` 上以抗锯齿方式填充圆角矩形路径，
//! 四个角用三次贝塞尔近似四分之一圆。
//! 合成时结果 alpha = 源 alpha × 遮罩 alpha，颜色取源颜色；遮罩 alpha 为 0 的像素清为全透明。

use image::{Rgba, imageops};
use tiny_skia::{Color, FillRule, Paint, Path, PathBuilder, Pixmap, Transform};

use super::Bitmap;

/// 四分之一圆弧的三次贝塞尔控制点系数。
const ARC_KAPPA: f32 = 0.552_284_8;

/// 居中裁剪为边长 `min(width, height)` 的正方形。
pub fn square_crop(bitmap: &Bitmap) -> Bitmap {
    let (width, height) = bitmap.dimensions();

    let (x, y, side) = if width >= height {
        ((width - height) / 2, 0, height)
    } else {
        (0, (height - width) / 2, width)
    };

    let cropped = imageops::crop_imm(bitmap.as_rgba(), x, y, side, side).to_image();
    Bitmap::from(cropped)
}

/// 圆形裁剪：方形裁剪后以原始宽度作为圆角半径。
pub fn circular_crop(bitmap: &Bitmap) -> Bitmap {
    rounded_corners(&square_crop(bitmap), bitmap.width())
}

/// 圆角遮罩：半径超过短边一半时按短边一半处理。
pub fn rounded_corners(bitmap: &Bitmap, radius_px: u32) -> Bitmap {
    let (width, height) = bitmap.dimensions();
    if radius_px == 0 {
        return bitmap.clone();
    }

    let Some(mask) = rasterize_mask(width, height, radius_px) else {
        log::debug!("遮罩尺寸无效 {}x{}，返回空位图", width, height);
        return Bitmap::new(width, height);
    };

    let mut output = Bitmap::new(width, height);
    for ((pixel, src), mask_px) in output
        .as_rgba_mut()
        .pixels_mut()
        .zip(bitmap.as_rgba().pixels())
        .zip(mask.data().chunks_exact(4))
    {
        let coverage = mask_px[3];
        if coverage > 0 {
            *pixel = source_in(*src, coverage);
        }
    }

    output
}

/// source-in 合成：保留源颜色，alpha 乘以遮罩 alpha。
fn source_in(src: Rgba<u8>, coverage: u8) -> Rgba<u8> {
    if coverage == u8::MAX {
        return src;
    }

    let alpha = ((src[3] as u32 * coverage as u32 + 127) / 255) as u8;
    if alpha == 0 {
        return Rgba([0, 0, 0, 0]);
    }
    Rgba([src[0], src[1], src[2], alpha])
}

/// 在透明画布上填充白色圆角矩形，返回的 alpha 通道即覆盖率。
fn rasterize_mask(width: u32, height: u32, radius_px: u32) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(width, height)?;
    pixmap.fill(Color::from_rgba8(0, 0, 0, 0));

    let path = round_rect_path(width as f32, height as f32, radius_px as f32)?;
    let mut paint = Paint::default();
    paint.set_color_rgba8(255, 255, 255, 255);
    paint.anti_alias = true;
    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);

    Some(pixmap)
}

fn round_rect_path(w: f32, h: f32, radius: f32) -> Option<Path> {
    let r = radius.min(w.min(h) / 2.0);
    let k = r * ARC_KAPPA;

    let mut pb = PathBuilder::new();
    pb.move_to(r, 0.0);
    pb.line_to(w - r, 0.0);
    pb.cubic_to(w - r + k, 0.0, w, r - k, w, r);
    pb.line_to(w, h - r);
    pb.cubic_to(w, h - r + k, w - r + k, h, w - r, h);
    pb.line_to(r, h);
    pb.cubic_to(r - k, h, 0.0, h - r + k, 0.0, h - r);
    pb.line_to(0.0, r);
    pb.cubic_to(0.0, r - k, r - k, 0.0, r, 0.0);
    pb.close();
    pb.finish()
}
