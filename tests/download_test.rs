// Callback downloader scenarios against a local one-shot HTTP server
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use image::Rgba;
use imgtools::image_handler::{
    encode, Bitmap, DownloadState, ImageConfig, ImageError, ImageHandler,
};

fn serve_once(status_line: &'static str, body: Vec<u8>) -> (String, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server failed");
    let addr = listener.local_addr().expect("read local addr failed");

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept failed");

        let mut req_buf = [0u8; 1024];
        let _ = stream.read(&mut req_buf);

        let mut response = format!(
            "HTTP/1.1 {}\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status_line,
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(&body);
        stream.write_all(&response).expect("write response failed");
        stream.flush().expect("flush failed");
    });

    (format!("http://127.0.0.1:{}/image.png", addr.port()), server)
}

fn local_config() -> ImageConfig {
    ImageConfig {
        use_system_proxy: false,
        ..ImageConfig::default()
    }
}

fn local_handler() -> Arc<ImageHandler> {
    Arc::new(ImageHandler::new(local_config()))
}

fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe failed");
    let port = listener.local_addr().expect("read local addr failed").port();
    drop(listener);
    format!("http://127.0.0.1:{}/x.png", port)
}

fn sample_png() -> (Bitmap, Vec<u8>) {
    let bitmap = Bitmap::from_fn(24, 16, |x, y| Rgba([x as u8 * 10, y as u8 * 10, 99, 255]));
    let bytes = encode(&bitmap).expect("encode sample failed");
    (bitmap, bytes)
}

#[derive(Default)]
struct Calls {
    success: AtomicUsize,
    failed: AtomicUsize,
    bitmap: Mutex<Option<Bitmap>>,
    error: Mutex<Option<ImageError>>,
}

fn tracked(url: String, calls: &Arc<Calls>) -> imgtools::image_handler::ImageDownload {
    let on_ok = Arc::clone(calls);
    let on_err = Arc::clone(calls);
    local_handler()
        .download(url)
        .on_success(move |bitmap| {
            on_ok.success.fetch_add(1, Ordering::SeqCst);
            *on_ok.bitmap.lock().expect("lock") = Some(bitmap);
        })
        .on_failed(move |err| {
            on_err.failed.fetch_add(1, Ordering::SeqCst);
            *on_err.error.lock().expect("lock") = Some(err);
        })
}

#[tokio::test]
async fn reachable_server_delivers_bitmap_to_success_only() {
    let (expected, body) = sample_png();
    let (url, server) = serve_once("200 OK", body);
    let calls = Arc::new(Calls::default());

    let task = tracked(url, &calls).start().expect("start should succeed");
    let state = task.wait().await.expect("task should not panic");
    server.join().expect("server thread failed");

    assert_eq!(state, DownloadState::Succeeded);
    assert_eq!(calls.success.load(Ordering::SeqCst), 1);
    assert_eq!(calls.failed.load(Ordering::SeqCst), 0);
    assert_eq!(calls.bitmap.lock().expect("lock").take(), Some(expected));
}

#[tokio::test]
async fn unreachable_host_reports_transport_error_only() {
    let calls = Arc::new(Calls::default());

    let state = tracked(closed_port_url(), &calls).run().await;

    assert_eq!(state, DownloadState::Failed);
    assert_eq!(calls.success.load(Ordering::SeqCst), 0);
    assert_eq!(calls.failed.load(Ordering::SeqCst), 1);
    let err = calls.error.lock().expect("lock").take().expect("error recorded");
    assert!(err.is_transport(), "expected transport error, got {err:?}");
}

#[tokio::test]
async fn undecodable_body_goes_to_failure_callback() {
    let (url, server) = serve_once("200 OK", b"definitely not an image".to_vec());
    let calls = Arc::new(Calls::default());

    let task = tracked(url, &calls).start().expect("start should succeed");
    let state = task.wait().await.expect("task should not panic");
    server.join().expect("server thread failed");

    assert_eq!(state, DownloadState::Failed);
    assert_eq!(calls.success.load(Ordering::SeqCst), 0);
    let err = calls.error.lock().expect("lock").take().expect("error recorded");
    assert!(matches!(err, ImageError::InvalidFormat(_) | ImageError::Decode(_)));
    assert!(!err.is_transport());
}

#[tokio::test]
async fn server_error_status_is_a_transport_failure() {
    let (url, server) = serve_once("500 Internal Server Error", b"oops".to_vec());
    let calls = Arc::new(Calls::default());

    let state = tracked(url, &calls).run().await;
    server.join().expect("server thread failed");

    assert_eq!(state, DownloadState::Failed);
    let err = calls.error.lock().expect("lock").take().expect("error recorded");
    assert!(matches!(err, ImageError::Network(_)));
}

#[tokio::test]
async fn shared_handler_applies_its_config() {
    let (_, body) = sample_png();
    let (url, server) = serve_once("200 OK", body);
    let handler = Arc::new(ImageHandler::new(ImageConfig {
        max_file_size: 16,
        ..local_config()
    }));
    let failures = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&failures);

    let state = handler
        .download(url)
        .on_failed(move |err| {
            assert!(matches!(err, ImageError::ResourceLimit(_)));
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .run()
        .await;
    server.join().expect("server thread failed");

    assert_eq!(state, DownloadState::Failed);
    assert_eq!(failures.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn progress_reaches_content_length() {
    let (_, body) = sample_png();
    let len = body.len() as u64;
    let (url, server) = serve_once("200 OK", body);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let task = local_handler()
        .download(url)
        .on_progress(move |downloaded, total| {
            sink.lock().expect("lock").push((downloaded, total));
        })
        .start()
        .expect("start should succeed");
    assert!(matches!(task.state(), DownloadState::Running | DownloadState::Succeeded));

    let state = task.wait().await.expect("task should not panic");
    server.join().expect("server thread failed");

    assert_eq!(state, DownloadState::Succeeded);
    let seen = seen.lock().expect("lock");
    assert_eq!(seen.first(), Some(&(0, Some(len))));
    assert_eq!(seen.last(), Some(&(len, Some(len))));
}

#[tokio::test]
async fn fetch_is_the_future_form() {
    let (expected, body) = sample_png();
    let (url, server) = serve_once("200 OK", body);

    let bitmap = local_handler().fetch(&url).await.expect("fetch should succeed");
    server.join().expect("server thread failed");

    assert_eq!(bitmap, expected);
}
