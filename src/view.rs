//! # 展示绑定模块
//!
//! ## 设计思路
//!
//! 把“位图交给可展示控件”抽象成两个 trait：
//! - `ImageView`：能显示位图、设置透明度/背景/内边距的控件
//! - `ProgressIndicator`：能切换可见性的进度指示器
//!
//! [`bind`] 只做副作用：设置位图、清除占位样式、隐藏进度指示器，无返回值也无失败路径。
//! `MemoryImageView` / `MemoryProgress` 是无界面实现，供命令行与测试使用。

use image::Rgba;

use crate::image_handler::Bitmap;

/// 控件可见性。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Invisible,
    Gone,
}

/// 控件内边距（像素）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Padding {
    pub const ZERO: Self = Self {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    pub fn uniform(px: u32) -> Self {
        Self {
            left: px,
            top: px,
            right: px,
            bottom: px,
        }
    }
}

/// 控件背景（占位图通常以背景形式出现）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Background {
    Color(Rgba<u8>),
    Image(Bitmap),
}

/// 可显示位图的控件。
pub trait ImageView {
    fn set_image_bitmap(&mut self, bitmap: Bitmap);
    fn set_alpha(&mut self, alpha: f32);
    fn set_background(&mut self, background: Option<Background>);
    fn set_padding(&mut self, padding: Padding);
}

/// 进度指示器。
pub trait ProgressIndicator {
    fn set_visibility(&mut self, visibility: Visibility);
}

/// 将位图绑定到控件，清除占位样式，并隐藏进度指示器（若提供）。
///
/// # 示例
/// ```rust
/// use imgtools::image_handler::Bitmap;
/// use imgtools::view::{bind, MemoryImageView, MemoryProgress, Visibility};
///
/// let mut view = MemoryImageView::placeholder();
/// let mut progress = MemoryProgress::default();
/// bind(&mut view, Bitmap::new(4, 4), Some(&mut progress));
///
/// assert_eq!(view.alpha, 1.0);
/// assert_eq!(progress.visibility, Visibility::Gone);
/// ```
pub fn bind<V>(view: &mut V, bitmap: Bitmap, progress: Option<&mut dyn ProgressIndicator>)
where
    V: ImageView + ?Sized,
{
    view.set_image_bitmap(bitmap);
    view.set_alpha(1.0);
    view.set_background(None);
    view.set_padding(Padding::ZERO);

    if let Some(progress) = progress {
        progress.set_visibility(Visibility::Gone);
    }
}

/// 无界面的控件实现：记录最近一次设置的状态。
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryImageView {
    pub bitmap: Option<Bitmap>,
    pub alpha: f32,
    pub background: Option<Background>,
    pub padding: Padding,
}

impl Default for MemoryImageView {
    fn default() -> Self {
        Self {
            bitmap: None,
            alpha: 1.0,
            background: None,
            padding: Padding::ZERO,
        }
    }
}

impl MemoryImageView {
    /// 加载中的占位状态：半透明、灰色背景、带内边距。
    pub fn placeholder() -> Self {
        Self {
            bitmap: None,
            alpha: 0.5,
            background: Some(Background::Color(Rgba([0x42, 0x42, 0x42, 0xff]))),
            padding: Padding::uniform(8),
        }
    }
}

impl ImageView for MemoryImageView {
    fn set_image_bitmap(&mut self, bitmap: Bitmap) {
        self.bitmap = Some(bitmap);
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    fn set_background(&mut self, background: Option<Background>) {
        self.background = background;
    }

    fn set_padding(&mut self, padding: Padding) {
        self.padding = padding;
    }
}

/// 无界面的进度指示器。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryProgress {
    pub visibility: Visibility,
}

impl ProgressIndicator for MemoryProgress {
    fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_resets_placeholder_styling() {
        let mut view = MemoryImageView::placeholder();
        let bitmap = Bitmap::from_fn(3, 3, |x, _| Rgba([x as u8, 0, 0, 255]));

        bind(&mut view, bitmap.clone(), None);

        assert_eq!(view.bitmap, Some(bitmap));
        assert_eq!(view.alpha, 1.0);
        assert_eq!(view.background, None);
        assert_eq!(view.padding, Padding::ZERO);
    }

    #[test]
    fn bind_hides_progress_when_supplied() {
        let mut view = MemoryImageView::default();
        let mut progress = MemoryProgress::default();
        assert_eq!(progress.visibility, Visibility::Visible);

        bind(&mut view, Bitmap::new(1, 1), Some(&mut progress));

        assert_eq!(progress.visibility, Visibility::Gone);
    }

    #[test]
    fn bind_works_through_trait_objects() {
        let mut view = MemoryImageView::placeholder();
        let dyn_view: &mut dyn ImageView = &mut view;

        bind(dyn_view, Bitmap::new(2, 2), None);

        assert_eq!(view.bitmap.map(|b| b.dimensions()), Some((2, 2)));
    }
}
