use once_cell::sync::Lazy;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Minimal one-shot HTTP server for exercising real requests. Accepts
/// a single connection, reads the request until the peer goes idle,
/// writes the canned response, and hands the captured request bytes
/// back through the returned receiver.
pub async fn spawn_http_server(
    status_line: &str,
    body: &str,
) -> (String, tokio::sync::oneshot::Receiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let response = format!(
        "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
    );
    let (tx, rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = match listener.accept().await {
            Ok(pair) => pair,
            Err(_) => return,
        };
        let mut captured = Vec::new();
        let mut buf = [0u8; 16 * 1024];
        loop {
            match tokio::time::timeout(
                std::time::Duration::from_millis(200),
                socket.read(&mut buf),
            )
            .await
            {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    captured.extend_from_slice(&buf[..n]);
                    // Stop once the headers ended and any declared body
                    // has arrived.
                    if request_complete(&captured) {
                        break;
                    }
                }
                _ => break,
            }
        }
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.flush().await;
        let _ = tx.send(captured);
    });

    (format!("http://{}", addr), rx)
}

fn request_complete(raw: &[u8]) -> bool {
    let Some(header_end) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let headers = String::from_utf8_lossy(&raw[..header_end]).to_lowercase();
    if let Some(idx) = headers.find("content-length:") {
        let rest = &headers[idx + "content-length:".len()..];
        let declared: usize = rest
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .parse()
            .unwrap_or(0);
        return raw.len() >= header_end + 4 + declared;
    }
    // Multipart bodies arrive without a terminating signal we can
    // cheaply detect; rely on the read timeout in that case.
    !headers.contains("transfer-encoding")
}
