//! PCM tap: a second decoder (`ffmpeg`) reading the same stream URL as the
//! player and emitting mono f32 chunks on the broadcast channel.

use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::BroadcastMessage;

pub const TAP_SAMPLE_RATE: u32 = 44_100;
/// Samples per broadcast chunk (~23 ms at 44.1 kHz).
pub const CHUNK_SAMPLES: usize = 1024;

pub fn spawn_ffmpeg(ffmpeg: &Path, url: &str) -> std::io::Result<Child> {
    let rate = TAP_SAMPLE_RATE.to_string();
    Command::new(ffmpeg)
        .args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-nostdin",
            "-fflags",
            "nobuffer",
            "-i",
            url,
            "-vn",
            "-ac",
            "1",
            "-ar",
            &rate,
            "-f",
            "s16le",
            "pipe:1",
        ])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true)
        .spawn()
}

/// Pump the child's stdout into `PcmChunk`s until EOF or cancellation.
pub async fn pump(
    mut child: Child,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
    cancel: CancellationToken,
) {
    let Some(mut stdout) = child.stdout.take() else {
        warn!("visualizer: ffmpeg has no stdout");
        return;
    };
    let mut buf = vec![0u8; CHUNK_SAMPLES * 2];
    let mut decoder = PcmDecoder::default();

    loop {
        let n = tokio::select! {
            _ = cancel.cancelled() => break,
            r = stdout.read(&mut buf) => match r {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    warn!("visualizer: tap read error: {}", e);
                    break;
                }
            },
        };
        for chunk in decoder.feed(&buf[..n]) {
            let _ = broadcast_tx.send(BroadcastMessage::PcmChunk(Arc::new(chunk)));
        }
    }

    let _ = child.start_kill();
    debug!("visualizer: tap stopped");
}

/// s16le bytes → f32 chunks of `CHUNK_SAMPLES`, tolerating reads that split
/// a sample.
#[derive(Default)]
pub struct PcmDecoder {
    carry: Option<u8>,
    pending: Vec<f32>,
}

impl PcmDecoder {
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Vec<f32>> {
        let mut out = Vec::new();
        let mut iter = bytes.iter().copied();
        loop {
            let lo = match self.carry.take() {
                Some(b) => b,
                None => match iter.next() {
                    Some(b) => b,
                    None => break,
                },
            };
            let Some(hi) = iter.next() else {
                self.carry = Some(lo);
                break;
            };
            self.pending
                .push(i16::from_le_bytes([lo, hi]) as f32 / 32768.0);
            if self.pending.len() == CHUNK_SAMPLES {
                out.push(std::mem::replace(
                    &mut self.pending,
                    Vec::with_capacity(CHUNK_SAMPLES),
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_handles_split_samples() {
        let mut dec = PcmDecoder::default();
        let sample = i16::MIN.to_le_bytes();
        assert!(dec.feed(&[sample[0]]).is_empty());
        assert!(dec.feed(&[sample[1]]).is_empty());
        assert_eq!(dec.pending, vec![-1.0]);
    }

    #[test]
    fn test_decoder_emits_full_chunks() {
        let mut dec = PcmDecoder::default();
        let bytes: Vec<u8> = std::iter::repeat(16384i16.to_le_bytes())
            .take(CHUNK_SAMPLES + 10)
            .flatten()
            .collect();
        let chunks = dec.feed(&bytes);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), CHUNK_SAMPLES);
        assert!(chunks[0].iter().all(|&s| (s - 0.5).abs() < 1e-6));
        assert_eq!(dec.pending.len(), 10);
    }
}
