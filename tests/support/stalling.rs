//! A server that sends the headers and the start of a body, then goes quiet.
//!
//! Lets tests catch a transfer while the body is streaming.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use super::socket_guard::should_skip_socket_bound_test;

pub struct StallingServer {
    base: String,
    task: JoinHandle<()>,
}

impl StallingServer {
    /// Serves every request with `Content-Length: declared_len` but only
    /// writes `first_chunk` of the body. Connections stay open until the
    /// server is dropped.
    pub async fn start_or_skip(first_chunk: &'static [u8], declared_len: usize) -> Option<Self> {
        if should_skip_socket_bound_test() {
            return None;
        }
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut request = [0_u8; 4096];
                let _ = stream.read(&mut request).await;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {declared_len}\r\n\r\n"
                );
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(first_chunk).await;
                let _ = stream.flush().await;
                held.push(stream);
            }
        });
        Some(Self {
            base: format!("http://{addr}"),
            task,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }
}

impl Drop for StallingServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
