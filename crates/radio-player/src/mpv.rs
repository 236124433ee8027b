/// mpv JSON IPC driver.
///
/// ```text
///   MpvDriver::spawn_and_connect()
///         │
///         ├── writer_task   ← MpvRequest via mpsc, one JSON line per request
///         └── reader_task   ← JSON lines from the socket
///                                ├── has request_id → resolves the matching oneshot
///                                └── otherwise      → event_tx (events, property-change)
/// ```
///
/// Unix uses a domain socket, Windows a named pipe `\\.\pipe\<name>`.
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

/// observe_property IDs, matched in property-change events.
pub const OBS_CORE_IDLE: u64 = 1;
pub const OBS_PAUSED_FOR_CACHE: u64 = 2;
pub const OBS_ICY_TITLE: u64 = 3;

const ICY_TITLE_PROPERTY: &str = "metadata/by-key/icy-title";

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>;

struct PendingRequest {
    req_id: u64,
    payload: String,
    reply: oneshot::Sender<anyhow::Result<Value>>,
}

/// Unsolicited line from mpv (no request_id).
#[derive(Debug, Clone)]
pub struct MpvEvent {
    pub raw: Value,
}

impl MpvEvent {
    pub fn as_property_change(&self) -> Option<(u64, &Value)> {
        if self.raw.get("event")?.as_str()? == "property-change" {
            let id = self.raw.get("id")?.as_u64()?;
            let data = self.raw.get("data").unwrap_or(&Value::Null);
            Some((id, data))
        } else {
            None
        }
    }

    /// e.g. "end-file", "start-file", "file-loaded".
    pub fn event_name(&self) -> Option<&str> {
        self.raw.get("event")?.as_str()
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.raw.get(key)?.as_str()
    }
}

#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<PendingRequest>,
}

impl MpvHandle {
    pub async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let msg = json!({ "command": command, "request_id": req_id });
        let mut raw = serde_json::to_string(&msg)?;
        raw.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                req_id,
                payload: raw,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(tokio::time::Duration::from_secs(5), reply_rx)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for req={}", req_id))?
            .map_err(|_| anyhow::anyhow!("mpv reply channel dropped req={}", req_id))?
    }

    async fn get_property(&self, name: &str) -> anyhow::Result<Value> {
        let resp = self.send(json!(["get_property", name])).await?;
        Ok(resp.get("data").cloned().unwrap_or(Value::Null))
    }

    async fn set_property(&self, name: &str, value: Value) -> anyhow::Result<()> {
        self.send(json!(["set_property", name, value])).await?;
        Ok(())
    }

    /// `loadfile <url> replace`: drops the current source and reopens.
    pub async fn load_replace(&self, url: &str) -> anyhow::Result<()> {
        debug!("mpv: loadfile replace url={}", url);
        self.send(json!(["loadfile", url, "replace"])).await?;
        Ok(())
    }

    pub async fn set_pause(&self, paused: bool) -> anyhow::Result<()> {
        self.set_property("pause", json!(paused)).await
    }

    /// Volume in [0, 1]; mpv works in percent.
    pub async fn get_volume(&self) -> anyhow::Result<f32> {
        let pct = self.get_property("volume").await?.as_f64().unwrap_or(100.0);
        Ok((pct / 100.0).clamp(0.0, 1.0) as f32)
    }

    pub async fn set_volume(&self, vol: f32) -> anyhow::Result<()> {
        let pct = (vol * 100.0).clamp(0.0, 100.0);
        self.set_property("volume", json!(pct)).await
    }

    pub async fn get_mute(&self) -> anyhow::Result<bool> {
        Ok(self.get_property("mute").await?.as_bool().unwrap_or(false))
    }

    pub async fn set_mute(&self, muted: bool) -> anyhow::Result<()> {
        self.set_property("mute", json!(muted)).await
    }

    /// Current ICY stream title.  mpv reports "property unavailable" when the
    /// stream carries none, which maps to `None` here.
    pub async fn icy_title(&self) -> Option<String> {
        match self.get_property(ICY_TITLE_PROPERTY).await {
            Ok(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub async fn observe_properties(&self) {
        let props = [
            (OBS_CORE_IDLE, "core-idle"),
            (OBS_PAUSED_FOR_CACHE, "paused-for-cache"),
            (OBS_ICY_TITLE, ICY_TITLE_PROPERTY),
        ];
        for (id, name) in props {
            match self.send(json!(["observe_property", id, name])).await {
                Ok(_) => debug!("mpv: observe_property id={} name={}", id, name),
                Err(e) => warn!("mpv: observe_property {} failed: {}", name, e),
            }
        }
    }

    pub async fn quit(&self) {
        let _ = self.send(json!(["quit"])).await;
    }
}

/// Owns the mpv child process.  The child is killed when the driver drops.
pub struct MpvDriver {
    socket_name: String,
    process: Option<tokio::process::Child>,
    initial_volume: f32,
}

impl MpvDriver {
    pub fn new(initial_volume: f32) -> Self {
        Self {
            socket_name: radio_core::platform::mpv_socket_name(),
            process: None,
            initial_volume,
        }
    }

    fn process_alive(&mut self) -> bool {
        let Some(child) = self.process.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                warn!("mpv process exited: {}", status);
                false
            }
            Err(e) => {
                warn!("mpv process_alive check failed: {}", e);
                false
            }
        }
    }

    pub async fn kill(&mut self) {
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }
    }

    fn spawn_process(&mut self) -> anyhow::Result<()> {
        let mpv_binary = radio_core::platform::find_mpv_binary()
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found"))?;

        let vol_arg = format!(
            "--volume={}",
            (self.initial_volume * 100.0).clamp(0.0, 100.0).round() as i64
        );

        let data_dir = radio_core::platform::data_dir();
        std::fs::create_dir_all(&data_dir)?;
        let stderr_path = data_dir.join("mpv-stderr.log");
        let stderr_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&stderr_path)?;
        info!("mpv: logging stderr to {:?}", stderr_path);

        // Sources are always loaded paused; play() is an explicit unpause.
        let child = tokio::process::Command::new(&mpv_binary)
            .arg("--no-video")
            .arg("--no-terminal")
            .arg("--idle=yes")
            .arg("--pause")
            .arg("--cache=yes")
            .arg(radio_core::platform::mpv_socket_arg())
            .arg(vol_arg)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(stderr_file)
            .kill_on_drop(true)
            .spawn()?;
        info!("mpv: spawned {:?} pid {:?}", mpv_binary, child.id());
        self.process = Some(child);
        Ok(())
    }

    #[cfg(unix)]
    pub async fn spawn_and_connect(
        &mut self,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.kill().await;
        let socket_path = std::path::PathBuf::from(&self.socket_name);
        let _ = tokio::fs::remove_file(&socket_path).await;

        self.spawn_process()?;

        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if socket_path.exists() {
                break;
            }
            if !self.process_alive() {
                anyhow::bail!("mpv exited during startup");
            }
        }
        if !socket_path.exists() {
            anyhow::bail!("mpv IPC socket did not appear");
        }

        let stream = UnixStream::connect(&socket_path).await?;
        info!("mpv: connected to IPC socket {}", self.socket_name);
        Ok(start_io_tasks(stream, event_tx))
    }

    #[cfg(windows)]
    pub async fn spawn_and_connect(
        &mut self,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.kill().await;
        self.spawn_process()?;

        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if let Ok(client) = ClientOptions::new().open(&pipe_path) {
                info!("mpv: connected to named pipe {}", pipe_path);
                return Ok(start_io_tasks(client, event_tx));
            }
        }
        anyhow::bail!("mpv named pipe did not appear")
    }
}

fn start_io_tasks<S>(stream: S, event_tx: mpsc::Sender<MpvEvent>) -> MpvHandle
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
    let (cmd_tx, cmd_rx) = mpsc::channel::<PendingRequest>(64);

    tokio::spawn(writer_task(write_half, cmd_rx, pending.clone()));
    tokio::spawn(reader_task(BufReader::new(read_half), pending, event_tx));

    MpvHandle { tx: cmd_tx }
}

async fn fail_pending(pending: &PendingMap, reason: &str) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(anyhow::anyhow!("{}", reason)));
    }
}

async fn reader_task<R>(
    mut reader: BufReader<R>,
    pending: PendingMap,
    event_tx: mpsc::Sender<MpvEvent>,
) where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                fail_pending(&pending, "mpv IPC connection closed").await;
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("mpv reader: invalid json '{}': {}", trimmed, e);
                        continue;
                    }
                };

                if let Some(req_id) = val.get("request_id").and_then(|v| v.as_u64()) {
                    let Some(tx) = pending.lock().await.remove(&req_id) else {
                        debug!("mpv reader: response for unknown req={}", req_id);
                        continue;
                    };
                    let result = match val["error"].as_str() {
                        Some("success") => Ok(val),
                        other => Err(anyhow::anyhow!(
                            "mpv error: {}",
                            other.unwrap_or("unknown error")
                        )),
                    };
                    let _ = tx.send(result);
                } else {
                    debug!("mpv reader: event {}", trimmed);
                    if event_tx.send(MpvEvent { raw: val }).await.is_err() {
                        break;
                    }
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                fail_pending(&pending, "mpv IPC read error").await;
                break;
            }
        }
    }
}

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<PendingRequest>, pending: PendingMap)
where
    W: AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // Register before writing so the reader can always match the reply.
        pending.lock().await.insert(req.req_id, req.reply);
        debug!(
            "mpv writer: req={} payload={}",
            req.req_id,
            req.payload.trim()
        );
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            if let Some(tx) = pending.lock().await.remove(&req.req_id) {
                let _ = tx.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}
