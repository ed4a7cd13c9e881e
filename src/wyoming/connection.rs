use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info};

use super::message::{
    AudioSpec, Message, MessageContainer, VoiceServices, AUDIO_CHUNK_MESSAGE_TYPE,
    AUDIO_START_MESSAGE_TYPE, AUDIO_STOP_MESSAGE_TYPE, DESCRIBE_MESSAGE_TYPE,
};
use crate::error::{Error, Result};

/// Size of the read buffer handed to each audio-chunk message.
const AUDIO_CHUNK_SIZE: usize = 1024;

/// A client connection to a Wyoming server.
///
/// The connection is single-owner: one request/response exchange at a time.
/// The service catalogue obtained from the describe handshake is cached for
/// the life of the value, surviving [`Connection::reconnect`].
pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    server_addr: String,
    services: VoiceServices,
}

impl Connection {
    /// Dials `addr` and performs the describe handshake, caching the
    /// reported service catalogue.
    pub async fn connect(addr: &str) -> Result<Self> {
        let mut conn = Self::dial(addr).await?;
        conn.services = conn.describe().await?;

        info!(
            "connected to Wyoming server at {} ({} tts, {} asr services)",
            addr,
            conn.services.tts.len(),
            conn.services.asr.len()
        );

        Ok(conn)
    }

    /// Dials `addr` without the describe handshake.
    ///
    /// Used where the caller has already validated capabilities, such as the
    /// transcription pipeline's per-event worker connections.
    pub async fn dial(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            server_addr: addr.to_string(),
            services: VoiceServices::default(),
        })
    }

    /// Drops the socket and redials the original address.
    ///
    /// The cached service catalogue persists; no new describe is sent.
    pub async fn reconnect(&mut self) -> Result<()> {
        debug!("reconnecting to {}", self.server_addr);

        let stream = TcpStream::connect(&self.server_addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();
        self.reader = BufReader::new(read_half);
        self.writer = write_half;

        Ok(())
    }

    /// Shuts down the write side and releases the socket.
    pub async fn close(mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    pub fn services(&self) -> &VoiceServices {
        &self.services
    }

    pub fn supports_tts(&self) -> bool {
        !self.services.tts.is_empty()
    }

    pub fn supports_asr(&self) -> bool {
        !self.services.asr.is_empty()
    }

    pub fn require_tts(&self) -> Result<()> {
        if self.supports_tts() {
            Ok(())
        } else {
            Err(Error::TtsNotSupported)
        }
    }

    pub fn require_asr(&self) -> Result<()> {
        if self.supports_asr() {
            Ok(())
        } else {
            Err(Error::AsrNotSupported)
        }
    }

    async fn describe(&mut self) -> Result<VoiceServices> {
        self.send_message(&Message::new(DESCRIBE_MESSAGE_TYPE)).await?;
        let reply = self.receive_message().await?;
        reply.parse_body()
    }

    /// Serializes `message` and writes it followed by a newline.
    pub async fn send_message(&mut self, message: &Message) -> Result<()> {
        let mut frame = serde_json::to_vec(message)?;
        frame.push(b'\n');
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Sends a header plus its trailing blobs as one write.
    ///
    /// `data_length` and `payload_length` are stamped from the actual blob
    /// sizes before serialization.
    pub async fn send_container(&mut self, container: &MessageContainer) -> Result<()> {
        let mut message = container.message.clone();
        message.data_length = container.data.len();
        message.payload_length = container.payload.len();

        let mut frame = serde_json::to_vec(&message)?;
        frame.push(b'\n');
        frame.extend_from_slice(&container.data);
        frame.extend_from_slice(&container.payload);

        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Reads one message: a newline-terminated JSON header followed by the
    /// data and payload blobs its length fields declare. Short reads fail.
    pub async fn receive_message(&mut self) -> Result<MessageContainer> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed before a message header",
            )));
        }

        let message: Message = serde_json::from_str(&line)?;
        let mut container = MessageContainer::new(message);

        if container.message.data_length > 0 {
            container.data = vec![0u8; container.message.data_length];
            self.reader.read_exact(&mut container.data).await?;
        }
        if container.message.payload_length > 0 {
            container.payload = vec![0u8; container.message.payload_length];
            self.reader.read_exact(&mut container.payload).await?;
        }

        Ok(container)
    }

    /// Appends audio-chunk payloads to `writer` until an audio-stop arrives.
    ///
    /// The stream's format is taken from the first audio-chunk that carries
    /// one; when the server stops without ever declaring it, a zeroed spec is
    /// returned along with whatever bytes were written. Message types other
    /// than the audio trio are ignored.
    pub async fn receive_audio<W>(&mut self, writer: &mut W) -> Result<AudioSpec>
    where
        W: AsyncWrite + Unpin,
    {
        let mut spec = AudioSpec::default();

        loop {
            let container = self.receive_message().await?;
            match container.message.message_type.as_str() {
                AUDIO_CHUNK_MESSAGE_TYPE => {
                    if spec.rate == 0 && container.has_body() {
                        spec = container.parse_body()?;
                    }
                    if !container.payload.is_empty() {
                        writer.write_all(&container.payload).await?;
                    }
                }
                AUDIO_STOP_MESSAGE_TYPE => break,
                _ => {}
            }
        }

        writer.flush().await?;
        Ok(spec)
    }

    /// Streams PCM from `reader` as audio-start, audio-chunk and audio-stop
    /// messages. Chunks carry at most [`AUDIO_CHUNK_SIZE`] payload bytes.
    pub async fn send_audio<R>(&mut self, reader: &mut R, spec: AudioSpec) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let spec_body = serde_json::to_vec(&spec)?;

        self.send_container(&MessageContainer {
            message: Message::new(AUDIO_START_MESSAGE_TYPE),
            data: spec_body.clone(),
            payload: Vec::new(),
        })
        .await?;

        let mut buf = [0u8; AUDIO_CHUNK_SIZE];
        let mut sent: u64 = 0;
        loop {
            let read = reader.read(&mut buf).await?;
            if read == 0 {
                break;
            }
            self.send_container(&MessageContainer {
                message: Message::new(AUDIO_CHUNK_MESSAGE_TYPE),
                data: spec_body.clone(),
                payload: buf[..read].to_vec(),
            })
            .await?;
            sent += read as u64;
        }

        self.send_container(&MessageContainer {
            message: Message::new(AUDIO_STOP_MESSAGE_TYPE),
            data: spec_body,
            payload: Vec::new(),
        })
        .await?;

        debug!("sent {} bytes of audio to {}", sent, self.server_addr);
        Ok(())
    }
}
