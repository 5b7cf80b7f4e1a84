//! TCP control server

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::Mutex;

use crate::protocol::{ControlCommand, ControlResponse};

/// Trait that the application implements to handle control commands
pub trait ControlHandler: Send + Sync + 'static {
    fn handle_command(&mut self, cmd: ControlCommand) -> ControlResponse;
}

/// Control server handle - keep this alive to keep the server running
pub struct ControlServer {
    local_addr: SocketAddr,
    handle: tokio::task::JoinHandle<()>,
}

impl ControlServer {
    /// Bind the control server and start accepting clients in the background.
    /// The handler is called for each incoming command.
    pub async fn bind<A: ToSocketAddrs>(
        handler: Arc<Mutex<dyn ControlHandler>>,
        addr: A,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        log::info!("Control server listening on {}", local_addr);

        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        log::info!("Control client connected from {}", peer);
                        let handler = handler.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, handler).await;
                            log::info!("Control client disconnected: {}", peer);
                        });
                    }
                    Err(e) => {
                        log::error!("Control server accept error: {}", e);
                    }
                }
            }
        });

        Ok(Self { local_addr, handle })
    }

    /// Address actually bound (useful when binding port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Longest command line accepted, excluding the newline. A client that
/// sends more gets one error response and is disconnected.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

async fn handle_connection(
    stream: tokio::net::TcpStream,
    handler: Arc<Mutex<dyn ControlHandler>>,
) {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = (&mut reader)
            .take(MAX_LINE_BYTES as u64 + 1)
            .read_until(b'\n', &mut line)
            .await;
        let response = match read {
            Ok(0) => break,
            Ok(n) if n > MAX_LINE_BYTES && line.last() != Some(&b'\n') => {
                log::warn!("Control command over {} bytes, closing connection", MAX_LINE_BYTES);
                let response = ControlResponse::error(format!(
                    "Command too long (limit {} bytes)",
                    MAX_LINE_BYTES
                ));
                let _ = write_response(&mut writer, &response).await;
                break;
            }
            Ok(_) => {
                let trimmed = line.trim_ascii();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_slice::<ControlCommand>(trimmed) {
                    Ok(cmd) => {
                        log::debug!("Control command: {:?}", cmd);
                        handler.lock().await.handle_command(cmd)
                    }
                    Err(e) => ControlResponse::error(format!("Invalid command JSON: {}", e)),
                }
            }
            Err(e) => {
                log::error!("Control server read error: {}", e);
                break;
            }
        };

        if let Err(e) = write_response(&mut writer, &response).await {
            log::error!("Control server write error: {}", e);
            break;
        }
    }
}

/// Send one response as a single JSON line.
async fn write_response(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    response: &ControlResponse,
) -> std::io::Result<()> {
    let mut json = serde_json::to_string(response).unwrap_or_else(|e| {
        format!("{{\"status\":\"error\",\"message\":\"Serialize error: {}\"}}", e)
    });
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ResponseData;
    use tokio::net::TcpStream;

    struct CountingHandler {
        toggles: u32,
    }

    impl ControlHandler for CountingHandler {
        fn handle_command(&mut self, cmd: ControlCommand) -> ControlResponse {
            match cmd {
                ControlCommand::Ping => ControlResponse::pong(),
                ControlCommand::TogglePlayback => {
                    self.toggles += 1;
                    ControlResponse::updated(format!("toggles={}", self.toggles))
                }
                _ => ControlResponse::error("unsupported"),
            }
        }
    }

    async fn roundtrip(
        reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
        writer: &mut tokio::net::tcp::OwnedWriteHalf,
        line: &str,
    ) -> ControlResponse {
        writer.write_all(line.as_bytes()).await.unwrap();
        writer.write_all(b"\n").await.unwrap();
        let mut resp = String::new();
        reader.read_line(&mut resp).await.unwrap();
        serde_json::from_str(&resp).unwrap()
    }

    #[tokio::test]
    async fn test_commands_over_tcp() {
        let handler: Arc<Mutex<dyn ControlHandler>> =
            Arc::new(Mutex::new(CountingHandler { toggles: 0 }));
        let server = ControlServer::bind(handler, "127.0.0.1:0").await.unwrap();

        let stream = TcpStream::connect(server.local_addr()).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let resp = roundtrip(&mut reader, &mut writer, r#"{"cmd":"Ping"}"#).await;
        assert_eq!(resp, ControlResponse::pong());

        let resp = roundtrip(&mut reader, &mut writer, r#"{"cmd":"TogglePlayback"}"#).await;
        assert_eq!(
            resp,
            ControlResponse::ok(ResponseData::ParamsUpdated {
                description: "toggles=1".into()
            })
        );

        // Bad JSON gets an error response and the connection stays usable.
        let resp = roundtrip(&mut reader, &mut writer, "{not json").await;
        assert!(!resp.is_ok());
        let resp = roundtrip(&mut reader, &mut writer, r#"{"cmd":"Ping"}"#).await;
        assert!(resp.is_ok());
    }

    #[tokio::test]
    async fn test_overlong_line_is_rejected_and_closed() {
        let handler: Arc<Mutex<dyn ControlHandler>> =
            Arc::new(Mutex::new(CountingHandler { toggles: 0 }));
        let server = ControlServer::bind(handler, "127.0.0.1:0").await.unwrap();

        let stream = TcpStream::connect(server.local_addr()).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        // Exactly one byte over the limit, never terminated.
        writer.write_all(&vec![b' '; MAX_LINE_BYTES + 1]).await.unwrap();

        let mut resp = String::new();
        reader.read_line(&mut resp).await.unwrap();
        match serde_json::from_str::<ControlResponse>(&resp).unwrap() {
            ControlResponse::Error { message } => assert!(message.contains("too long")),
            other => panic!("expected error, got {:?}", other),
        }
        resp.clear();
        assert_eq!(reader.read_line(&mut resp).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_line_at_limit_is_accepted() {
        let handler: Arc<Mutex<dyn ControlHandler>> =
            Arc::new(Mutex::new(CountingHandler { toggles: 0 }));
        let server = ControlServer::bind(handler, "127.0.0.1:0").await.unwrap();

        let stream = TcpStream::connect(server.local_addr()).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let ping = r#"{"cmd":"Ping"}"#;
        let padded = format!("{}{}", " ".repeat(MAX_LINE_BYTES - ping.len()), ping);
        let resp = roundtrip(&mut reader, &mut writer, &padded).await;
        assert_eq!(resp, ControlResponse::pong());
    }
}
