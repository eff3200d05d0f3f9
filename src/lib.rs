//! # imgtools — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  调用方（命令行 / 上层应用）                               │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓
//! ┌───────┴──────────────────────────────────────────────────┐
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  ├─ image_handler      图片下载·编解码·几何变换            │
//! │  │   ├─ download       回调式下载（tokio 任务）            │
//! │  │   ├─ codec          字节 ↔ 位图                        │
//! │  │   └─ transform      方形 / 圆角 / 圆形                  │
//! │  │                                                       │
//! │  └─ view               位图绑定到控件 + 隐藏进度           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，命令行入口的返回类型 |
//! | [`image_handler`] | 从 URL/Base64/文件加载图片、编解码、裁剪与遮罩 |
//! | [`view`] | 控件与进度指示器抽象，`bind` 绑定位图 |

pub mod error;
pub mod image_handler;
pub mod view;
