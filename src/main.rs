//! # imgtools — 命令行入口
//!
//! 本文件仅负责参数解析、日志初始化与流程串联。
//! 业务逻辑分布在 `image_handler` 与 `view` 中，详见 `lib.rs` 架构文档。

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use imgtools::error::AppError;
use imgtools::image_handler::{
    self, Bitmap, ImageConfig, ImageError, ImageHandler, ImageSource,
};
use imgtools::view::{self, MemoryImageView, ProgressIndicator, Visibility};
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Shape {
    Original,
    Square,
    Circle,
    Rounded,
}

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// 图片来源：http(s) URL、data URL 或本地路径
    source: String,
    #[arg(short, long)]
    out: PathBuf,
    #[arg(short, long, value_enum, default_value_t = Shape::Original)]
    shape: Shape,
    /// 圆角半径（像素），仅 `rounded` 使用
    #[arg(short, long, default_value_t = 16)]
    radius: u32,
    /// JSON 配置文件
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// 把进度指示器的可见性变化写进日志。
struct LogProgress;

impl ProgressIndicator for LogProgress {
    fn set_visibility(&mut self, visibility: Visibility) {
        log::info!("⏳ 进度指示器 -> {:?}", visibility);
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ImageConfig::from_json_file(path)?,
        None => ImageConfig::default(),
    };
    let handler = Arc::new(ImageHandler::new(config));

    let bitmap = match ImageSource::infer(&cli.source) {
        ImageSource::Url(url) => download_with_callbacks(&handler, url).await?,
        other => handler.load(other).await?,
    };

    let shaped = match cli.shape {
        Shape::Original => bitmap,
        Shape::Square => image_handler::square_crop(&bitmap),
        Shape::Circle => image_handler::circular_crop(&bitmap),
        Shape::Rounded => image_handler::rounded_corners(&bitmap, cli.radius),
    };

    let mut view = MemoryImageView::placeholder();
    let mut progress = LogProgress;
    view::bind(&mut view, shaped, Some(&mut progress));

    let bound = view
        .bitmap
        .ok_or_else(|| AppError::InvalidArgument("控件中没有位图".to_string()))?;
    let encoded = image_handler::encode(&bound)?;
    std::fs::write(&cli.out, encoded)?;

    log::info!(
        "✅ 已写入 {} ({}x{})",
        cli.out.display(),
        bound.width(),
        bound.height()
    );

    Ok(())
}

/// 通过回调式下载获取位图，并把回调结果转发回主任务。
async fn download_with_callbacks(
    handler: &Arc<ImageHandler>,
    url: String,
) -> Result<Bitmap, AppError> {
    let (tx, rx) = oneshot::channel::<Result<Bitmap, ImageError>>();
    let tx = Arc::new(std::sync::Mutex::new(Some(tx)));
    let tx_failed = Arc::clone(&tx);

    let task = handler
        .download(url)
        .on_progress(|downloaded, total| match total {
            Some(total) if total > 0 => {
                log::debug!("⬇️ {}/{} bytes ({}%)", downloaded, total, downloaded * 100 / total)
            }
            _ => log::debug!("⬇️ {} bytes", downloaded),
        })
        .on_success(move |bitmap| send_once(&tx, Ok(bitmap)))
        .on_failed(move |err| send_once(&tx_failed, Err(err)))
        .start()?;

    let state = task.wait().await?;
    log::debug!("下载任务结束：{:?}", state);

    let result = rx
        .await
        .map_err(|e| ImageError::Runtime(format!("下载结果通道已关闭：{}", e)))?;
    Ok(result?)
}

fn send_once(
    slot: &std::sync::Mutex<Option<oneshot::Sender<Result<Bitmap, ImageError>>>>,
    value: Result<Bitmap, ImageError>,
) {
    let sender = match slot.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    if let Some(sender) = sender {
        let _ = sender.send(value);
    }
}
