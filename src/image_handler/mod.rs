//! # 图片处理模块（image_handler）
//!
//! ## 设计思路
//!
//! 该模块将“来源加载 → 解码 → 几何变换”按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `codec`：字节 ↔ 位图（PNG 无损编码）
//! - `download`：回调式一次性下载请求与状态机
//! - `handler`：编排加载与解码（future 形式）
//! - `loader`：负责 URL/Base64/文件加载与体积校验
//! - `transform`：方形裁剪、圆角、圆形遮罩
//! - `config/error/source`：配置、错误、数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! download(url).on_success(..).on_failed(..).start()
//!    ↓
//! download.rs（状态机 + 回调分发，tokio 任务）
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ loader.rs（GET + 分块读取 + 体积校验）
//!    └─ codec.rs（像素上限校验 + 解码）
//!    ↓
//! Bitmap → transform.rs → view::bind
//! ```

pub mod codec;
mod config;
mod download;
mod error;
mod handler;
mod loader;
mod source;
pub mod transform;

pub use codec::{decode, encode};
pub use config::ImageConfig;
pub use download::{DownloadState, DownloadTask, ImageDownload, download};
pub use error::ImageError;
pub use handler::ImageHandler;
pub use source::{Bitmap, ImageSource, PixelFormat};
pub use transform::{circular_crop, rounded_corners, square_crop};
