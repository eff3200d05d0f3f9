//! # 回调式下载模块
//!
//! ## 设计思路
//!
//! 一次下载对应一个 `ImageDownload` 请求对象：
//!
//! ```text
//! download(url)
//!    ↓ on_success / on_failed / on_progress（可选，重复注册以最后一次为准）
//! start()  ──>  tokio 任务：GET → 读取完整响应体 → 解码
//!    ↓
//! 成功回调 或 失败回调（二者恰好触发其一，且仅一次）
//! ```
//!
//! 状态机：`Idle → Running → {Succeeded, Failed}`，终态不可再变。
//! `start` 消费请求对象，因此同一请求无法重复启动。
//!
//! ## 实现思路
//!
//! - 回调以 `Option<Box<dyn FnOnce>>` 保存，未注册即不调用。
//! - 回调在执行下载的 tokio 工作任务上触发；需要切回其他线程时由调用方自行转发。
//! - 响应体解码失败视为失败（`Decode` / `InvalidFormat`），成功回调永远拿到有效位图。
//! - 状态保存在 `Arc<Mutex<DownloadState>>` 中，仅用于观测，不参与协调。

use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::{Bitmap, ImageError, ImageHandler};

type SuccessCallback = Box<dyn FnOnce(Bitmap) + Send + 'static>;
type FailureCallback = Box<dyn FnOnce(ImageError) + Send + 'static>;
type ProgressCallback = Box<dyn Fn(u64, Option<u64>) + Send + Sync + 'static>;

/// 下载请求的生命周期状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl DownloadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// 使用默认配置创建下载请求。
///
/// # 示例
/// ```rust,no_run
/// use imgtools::image_handler::download;
///
/// # async fn demo() -> Result<(), imgtools::image_handler::ImageError> {
/// let task = download("https://example.com/avatar.png")
///     .on_success(|bitmap| println!("{}x{}", bitmap.width(), bitmap.height()))
///     .on_failed(|err| eprintln!("下载失败：{}", err))
///     .start()?;
/// task.wait().await?;
/// # Ok(())
/// # }
/// ```
pub fn download(url: impl Into<String>) -> ImageDownload {
    ImageDownload::new(Arc::new(ImageHandler::default()), url.into())
}

impl ImageHandler {
    /// 基于共享处理器（及其配置）创建下载请求。
    pub fn download(self: &Arc<Self>, url: impl Into<String>) -> ImageDownload {
        ImageDownload::new(Arc::clone(self), url.into())
    }
}

/// 一次性的回调式下载请求。
pub struct ImageDownload {
    handler: Arc<ImageHandler>,
    url: String,
    on_success: Option<SuccessCallback>,
    on_failed: Option<FailureCallback>,
    on_progress: Option<ProgressCallback>,
    state: Arc<Mutex<DownloadState>>,
}

impl std::fmt::Debug for ImageDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageDownload")
            .field("url", &ImageHandler::redact_url_for_log(&self.url))
            .field("on_success", &self.on_success.is_some())
            .field("on_failed", &self.on_failed.is_some())
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl ImageDownload {
    fn new(handler: Arc<ImageHandler>, url: String) -> Self {
        Self {
            handler,
            url,
            on_success: None,
            on_failed: None,
            on_progress: None,
            state: Arc::new(Mutex::new(DownloadState::Idle)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 注册成功回调，替换之前注册的回调。
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(Bitmap) + Send + 'static,
    {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// 注册失败回调，替换之前注册的回调。
    pub fn on_failed<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(ImageError) + Send + 'static,
    {
        self.on_failed = Some(Box::new(callback));
        self
    }

    /// 注册进度回调：`(已下载字节, 总字节)`。
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(u64, Option<u64>) + Send + Sync + 'static,
    {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// 在当前 tokio 运行时上启动下载。
    ///
    /// 不在运行时上下文中调用时返回 `ImageError::Runtime`。
    pub fn start(self) -> Result<DownloadTask, ImageError> {
        let handle = Handle::try_current()
            .map_err(|e| ImageError::Runtime(format!("当前线程没有 tokio 运行时：{}", e)))?;
        Ok(self.start_on(&handle))
    }

    /// 在指定运行时上启动下载。
    pub fn start_on(self, handle: &Handle) -> DownloadTask {
        let state = Arc::clone(&self.state);
        set_state(&state, DownloadState::Running);

        let join = handle.spawn(self.execute());
        DownloadTask { state, join }
    }

    /// 在当前任务内直接执行下载，返回终态。
    pub async fn run(self) -> DownloadState {
        set_state(&self.state, DownloadState::Running);
        self.execute().await
    }

    async fn execute(self) -> DownloadState {
        let Self {
            handler,
            url,
            on_success,
            on_failed,
            on_progress,
            state,
        } = self;

        let result = match on_progress.as_deref() {
            Some(progress) => handler.fetch_with_progress(&url, progress).await,
            None => handler.fetch(&url).await,
        };

        match result {
            Ok(bitmap) => {
                set_state(&state, DownloadState::Succeeded);
                if let Some(callback) = on_success {
                    callback(bitmap);
                }
                DownloadState::Succeeded
            }
            Err(err) => {
                log::warn!(
                    "❌ 图片下载失败 - URL: {} code={} stage={}：{}",
                    ImageHandler::redact_url_for_log(&url),
                    err.code(),
                    err.stage(),
                    err
                );
                set_state(&state, DownloadState::Failed);
                if let Some(callback) = on_failed {
                    callback(err);
                }
                DownloadState::Failed
            }
        }
    }
}

/// 已启动的下载任务句柄。
#[derive(Debug)]
pub struct DownloadTask {
    state: Arc<Mutex<DownloadState>>,
    join: JoinHandle<DownloadState>,
}

impl DownloadTask {
    /// 当前状态快照。
    pub fn state(&self) -> DownloadState {
        match self.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// 等待任务结束并返回终态；回调 panic 时返回 `ImageError::Runtime`。
    pub async fn wait(self) -> Result<DownloadState, ImageError> {
        self.join
            .await
            .map_err(|e| ImageError::Runtime(format!("下载任务异常结束：{}", e)))
    }
}

fn set_state(state: &Mutex<DownloadState>, next: DownloadState) {
    let mut guard = match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if guard.is_terminal() {
        log::warn!("⚠️ 下载已处于终态 {:?}，忽略状态切换 {:?}", *guard, next);
        return;
    }
    *guard = next;
}
