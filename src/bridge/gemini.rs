//! Gemini Live endpoint over a TLS WebSocket
//!
//! The socket is blocking (tungstenite), so each session runs on its own
//! worker thread that alternates between draining queued outbound chunks and
//! polling the socket with a short read timeout.

use anyhow::{Context, Result};
use native_tls::TlsStream;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tungstenite::{Message, WebSocket};

use super::endpoint::{EndpointEvent, LiveConnection, LiveEndpoint, MediaChunk};
use crate::error::{StreamError, StreamResult};

type LiveSocket = WebSocket<TlsStream<TcpStream>>;

pub const DEFAULT_ENDPOINT_URL: &str =
    "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Poll interval of the worker loop
const READ_POLL: Duration = Duration::from_millis(50);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Socket timeouts until the setup message is written
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Session parameters for the narrator
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub endpoint_url: String,
    pub model: String,
    pub voice: String,
    pub system_instruction: String,
}

pub struct GeminiLiveEndpoint {
    settings: GeminiSettings,
}

impl GeminiLiveEndpoint {
    pub fn new(settings: GeminiSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl LiveEndpoint for GeminiLiveEndpoint {
    async fn connect(
        &self,
        events: mpsc::UnboundedSender<EndpointEvent>,
    ) -> StreamResult<Box<dyn LiveConnection>> {
        let api_key = match self.settings.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => {
                return Err(StreamError::Configuration(
                    "API_KEY is not set".to_string(),
                ))
            }
        };

        info!("Connecting to narrator model {}", self.settings.model);

        let settings = self.settings.clone();
        let socket = tokio::task::spawn_blocking(move || -> Result<LiveSocket> {
            let address = endpoint_address(&settings.endpoint_url, &api_key)?;
            let mut socket = open_socket(&address)?;
            send_setup(&mut socket, &settings)?;
            set_poll_timeout(&mut socket)?;
            Ok(socket)
        })
        .await
        .map_err(|e| StreamError::EndpointConnection(format!("connect task failed: {}", e)))?
        .map_err(|e| StreamError::EndpointConnection(e.to_string()))?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker_shutdown = Arc::clone(&shutdown);
        std::thread::Builder::new()
            .name("narrator-socket".to_string())
            .spawn(move || run_session(socket, outbound_rx, events, worker_shutdown))
            .map_err(|e| StreamError::EndpointConnection(format!("worker spawn failed: {}", e)))?;

        Ok(Box::new(GeminiConnection {
            outbound: outbound_tx,
            shutdown,
        }))
    }

    fn name(&self) -> &str {
        "gemini-live"
    }
}

struct GeminiConnection {
    outbound: mpsc::UnboundedSender<MediaChunk>,
    shutdown: Arc<AtomicBool>,
}

impl LiveConnection for GeminiConnection {
    fn send(&self, chunk: MediaChunk) -> StreamResult<()> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(StreamError::EndpointConnection("session closed".to_string()));
        }
        self.outbound
            .send(chunk)
            .map_err(|_| StreamError::EndpointConnection("session worker gone".to_string()))
    }

    fn close(&self) {
        if !self.shutdown.swap(true, Ordering::SeqCst) {
            info!("Closing narrator session");
        }
    }
}

impl Drop for GeminiConnection {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

/// Where a narrator session connects: the keyed request URL plus the TLS peer
#[derive(Debug, Clone, PartialEq)]
struct EndpointAddress {
    url: url::Url,
    host: String,
    port: u16,
}

/// Validate the configured endpoint and attach the credential as the `key` query parameter
fn endpoint_address(endpoint_url: &str, api_key: &str) -> Result<EndpointAddress> {
    let mut url = url::Url::parse(endpoint_url)
        .with_context(|| format!("Invalid narration endpoint: {}", endpoint_url))?;

    if url.scheme() != "wss" {
        anyhow::bail!("Narration endpoint must use wss://, got {}://", url.scheme());
    }

    let host = url
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("Narration endpoint has no host"))?
        .to_string();
    let port = url.port().unwrap_or(443);

    url.query_pairs_mut().append_pair("key", api_key);

    Ok(EndpointAddress { url, host, port })
}

/// TCP connect, TLS handshake, then the WebSocket upgrade
fn open_socket(address: &EndpointAddress) -> Result<LiveSocket> {
    let peer = (address.host.as_str(), address.port)
        .to_socket_addrs()
        .with_context(|| format!("Failed to resolve {}", address.host))?
        .next()
        .ok_or_else(|| anyhow::anyhow!("No addresses for {}", address.host))?;

    let tcp = TcpStream::connect_timeout(&peer, CONNECT_TIMEOUT)
        .with_context(|| format!("Failed to reach {}:{}", address.host, address.port))?;
    tcp.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;
    tcp.set_write_timeout(Some(HANDSHAKE_TIMEOUT))?;
    tcp.set_nodelay(true)?;

    let tls = native_tls::TlsConnector::new()?
        .connect(&address.host, tcp)
        .with_context(|| format!("TLS handshake with {} failed", address.host))?;

    let (socket, response) = tungstenite::client::client(address.url.as_str(), tls)
        .context("WebSocket upgrade rejected")?;
    debug!("Narrator socket upgraded ({})", response.status());

    Ok(socket)
}

/// Audio-only responses, fixed voice, narrator persona
fn send_setup(socket: &mut LiveSocket, settings: &GeminiSettings) -> Result<()> {
    let mut setup = serde_json::json!({
        "setup": {
            "model": format!("models/{}", settings.model),
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": settings.voice }
                    }
                }
            }
        }
    });

    if !settings.system_instruction.trim().is_empty() {
        setup["setup"]["systemInstruction"] = serde_json::json!({
            "parts": [{ "text": settings.system_instruction }]
        });
    }

    socket.write(Message::Text(setup.to_string().into()))?;
    socket.flush()?;

    Ok(())
}

/// Switch to short read timeouts for the worker loop
fn set_poll_timeout(socket: &mut LiveSocket) -> Result<()> {
    socket.get_mut().get_mut().set_read_timeout(Some(READ_POLL))?;
    Ok(())
}

fn send_chunk(socket: &mut LiveSocket, chunk: &MediaChunk) -> Result<()> {
    let msg = serde_json::json!({
        "realtimeInput": {
            "mediaChunks": [chunk]
        }
    });

    socket.write(Message::Text(msg.to_string().into()))?;
    socket.flush()?;

    Ok(())
}

/// Translate one server message into bridge events
pub fn parse_server_message(msg: &str) -> Vec<EndpointEvent> {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(msg) else {
        return Vec::new();
    };

    if let Some(error) = json.get("error") {
        let reason = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return vec![EndpointEvent::Failed(reason)];
    }

    let mut events = Vec::new();

    if json.get("setupComplete").is_some() {
        events.push(EndpointEvent::Opened);
    }

    if let Some(parts) = json
        .pointer("/serverContent/modelTurn/parts")
        .and_then(|p| p.as_array())
    {
        for part in parts {
            if let Some(data) = part.pointer("/inlineData/data").and_then(|d| d.as_str()) {
                events.push(EndpointEvent::AudioReceived(data.to_string()));
            }
        }
    }

    events
}

fn run_session(
    mut socket: LiveSocket,
    mut outbound: mpsc::UnboundedReceiver<MediaChunk>,
    events: mpsc::UnboundedSender<EndpointEvent>,
    shutdown: Arc<AtomicBool>,
) {
    info!("Narrator session worker started");

    loop {
        if shutdown.load(Ordering::SeqCst) {
            let _ = socket.close(None);
            let _ = socket.flush();
            break;
        }

        while let Ok(chunk) = outbound.try_recv() {
            if let Err(e) = send_chunk(&mut socket, &chunk) {
                error!("Failed to send {} chunk: {}", chunk.mime_type, e);
                let _ = events.send(EndpointEvent::Failed(format!("send failed: {}", e)));
                return;
            }
        }

        let text = match socket.read() {
            Ok(Message::Text(msg)) => msg.as_str().to_string(),
            Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                Ok(text) => text,
                Err(_) => continue,
            },
            Ok(Message::Close(_)) => {
                let _ = events.send(EndpointEvent::Closed);
                break;
            }
            Ok(_) => continue,
            Err(tungstenite::Error::Io(ref e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                continue
            }
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                let _ = events.send(EndpointEvent::Closed);
                break;
            }
            Err(e) => {
                warn!("Narrator socket error: {}", e);
                let _ = events.send(EndpointEvent::Failed(e.to_string()));
                break;
            }
        };

        for event in parse_server_message(&text) {
            let terminal = matches!(event, EndpointEvent::Failed(_));
            if events.send(event).is_err() {
                debug!("Bridge dropped its event receiver");
                shutdown.store(true, Ordering::SeqCst);
            }
            if terminal {
                let _ = socket.close(None);
                let _ = socket.flush();
                return;
            }
        }
    }

    info!("Narrator session worker stopped");
}
