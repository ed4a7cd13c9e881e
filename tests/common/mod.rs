// Shared helpers for integration tests: a minimal line-framed Wyoming peer
// and synthetic PCM generators.

#![allow(dead_code)]

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// One wire frame as seen by a test peer: parsed header plus raw blobs.
#[derive(Debug)]
pub struct Frame {
    pub header: Value,
    pub data: Vec<u8>,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn message_type(&self) -> &str {
        self.header["type"].as_str().unwrap_or("")
    }
}

/// Reads one frame, honoring the header's declared blob lengths.
/// Returns `None` when the peer has closed the connection.
pub async fn read_frame<R>(reader: &mut R) -> Option<Frame>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = reader.read_line(&mut line).await.ok()?;
    if read == 0 {
        return None;
    }

    let header: Value = serde_json::from_str(&line).ok()?;
    let data_length = header["data_length"].as_u64().unwrap_or(0) as usize;
    let payload_length = header["payload_length"].as_u64().unwrap_or(0) as usize;

    let mut data = vec![0u8; data_length];
    if data_length > 0 {
        reader.read_exact(&mut data).await.ok()?;
    }
    let mut payload = vec![0u8; payload_length];
    if payload_length > 0 {
        reader.read_exact(&mut payload).await.ok()?;
    }

    Some(Frame {
        header,
        data,
        payload,
    })
}

/// Writes a header line plus its trailing blobs, stamping the length fields.
pub async fn write_frame<W>(writer: &mut W, mut header: Value, data: &[u8], payload: &[u8])
where
    W: AsyncWrite + Unpin,
{
    if !data.is_empty() {
        header["data_length"] = data.len().into();
    }
    if !payload.is_empty() {
        header["payload_length"] = payload.len().into();
    }

    let mut frame = serde_json::to_vec(&header).unwrap();
    frame.push(b'\n');
    frame.extend_from_slice(data);
    frame.extend_from_slice(payload);

    writer.write_all(&frame).await.unwrap();
    writer.flush().await.unwrap();
}

/// 16-bit LE PCM silence of the given duration.
pub fn silence(ms: u64, rate: u32, channels: u16) -> Vec<u8> {
    let frames = (rate as u64 * ms / 1000) as usize;
    vec![0u8; frames * channels as usize * 2]
}

/// 16-bit LE PCM square wave alternating between `+amplitude` and
/// `-amplitude` on every frame, loud enough to trip the sound detector for
/// any amplitude above half the threshold.
pub fn square_wave(ms: u64, rate: u32, channels: u16, amplitude: i16) -> Vec<u8> {
    let frames = (rate as u64 * ms / 1000) as usize;
    let mut pcm = Vec::with_capacity(frames * channels as usize * 2);
    for frame in 0..frames {
        let value = if frame % 2 == 0 { amplitude } else { -amplitude };
        for _ in 0..channels {
            pcm.extend_from_slice(&value.to_le_bytes());
        }
    }
    pcm
}
