use std::io::SeekFrom;
use std::path::Path;

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{
    AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt, BufReader,
    BufWriter,
};
use tracing::debug;

use crate::error::{Error, Result};

/// Audio parameters read from a WAV file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    pub rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Absolute byte offset where the PCM data begins.
    pub data_offset: u64,
}

impl WavInfo {
    /// Sample width in bytes.
    pub fn width(&self) -> u16 {
        self.bits_per_sample / 8
    }
}

/// Reads the audio parameters and PCM data offset from a RIFF/WAVE source.
///
/// Sub-chunks other than `fmt ` and `data` are skipped, so files carrying
/// extra metadata chunks parse the same as minimal 44-byte-header files.
/// Only PCM (audio format 1) is accepted.
pub async fn read_wav_info<R>(reader: &mut R) -> Result<WavInfo>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    let mut tag = [0u8; 4];

    reader.seek(SeekFrom::Start(0)).await?;
    read_header_bytes(reader, &mut tag).await?;
    if &tag != b"RIFF" {
        return Err(Error::InvalidWavHeader);
    }

    reader.seek(SeekFrom::Start(8)).await?;
    read_header_bytes(reader, &mut tag).await?;
    if &tag != b"WAVE" {
        return Err(Error::InvalidWavHeader);
    }

    let mut format: Option<(u32, u16, u16)> = None;
    let mut offset: u64 = 12;

    loop {
        reader.seek(SeekFrom::Start(offset)).await?;
        read_header_bytes(reader, &mut tag).await?;
        let mut len_bytes = [0u8; 4];
        read_header_bytes(reader, &mut len_bytes).await?;
        let chunk_len = u32::from_le_bytes(len_bytes) as u64;

        match &tag {
            b"fmt " => {
                if chunk_len < 16 {
                    return Err(Error::InvalidWavHeader);
                }
                let mut fmt = [0u8; 16];
                read_header_bytes(reader, &mut fmt).await?;

                let audio_format = u16::from_le_bytes([fmt[0], fmt[1]]);
                if audio_format != 1 {
                    return Err(Error::InvalidWavHeader);
                }
                let channels = u16::from_le_bytes([fmt[2], fmt[3]]);
                let rate = u32::from_le_bytes([fmt[4], fmt[5], fmt[6], fmt[7]]);
                let bits_per_sample = u16::from_le_bytes([fmt[14], fmt[15]]);
                format = Some((rate, channels, bits_per_sample));
            }
            b"data" => {
                let (rate, channels, bits_per_sample) = format.ok_or(Error::InvalidWavHeader)?;
                let info = WavInfo {
                    rate,
                    channels,
                    bits_per_sample,
                    data_offset: offset + 8,
                };
                debug!(
                    "WAV header: {} Hz, {} channel(s), {} bits, data at byte {}",
                    info.rate, info.channels, info.bits_per_sample, info.data_offset
                );
                return Ok(info);
            }
            _ => {}
        }

        offset += 8 + chunk_len;
    }
}

/// Writes a canonical PCM WAV header followed by `pcm_len` bytes copied
/// verbatim from `pcm_reader`.
pub async fn write_wav<W, R>(
    writer: &mut W,
    pcm_reader: &mut R,
    pcm_len: u32,
    rate: u32,
    channels: u16,
    bits_per_sample: u16,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    let block_align = channels * (bits_per_sample / 8);
    let byte_rate = rate * block_align as u32;

    let mut header = Vec::with_capacity(44);
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&(36 + pcm_len).to_le_bytes());
    header.extend_from_slice(b"WAVE");
    header.extend_from_slice(b"fmt ");
    header.extend_from_slice(&16u32.to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes());
    header.extend_from_slice(&channels.to_le_bytes());
    header.extend_from_slice(&rate.to_le_bytes());
    header.extend_from_slice(&byte_rate.to_le_bytes());
    header.extend_from_slice(&block_align.to_le_bytes());
    header.extend_from_slice(&bits_per_sample.to_le_bytes());
    header.extend_from_slice(b"data");
    header.extend_from_slice(&pcm_len.to_le_bytes());

    writer.write_all(&header).await?;
    tokio::io::copy(pcm_reader, writer).await?;
    writer.flush().await?;

    Ok(())
}

/// Converts an on-disk raw PCM file into a WAV file at `wav_path`.
///
/// Refuses to overwrite an existing output file.
pub async fn pcm_file_to_wav_file(
    wav_path: &Path,
    pcm_path: &Path,
    rate: u32,
    channels: u16,
    bits_per_sample: u16,
) -> Result<()> {
    if fs::try_exists(wav_path).await? {
        return Err(Error::OutputFileExists(wav_path.to_path_buf()));
    }

    let pcm_file = File::open(pcm_path).await?;
    let pcm_len = pcm_file.metadata().await?.len() as u32;
    let mut pcm_reader = BufReader::new(pcm_file);

    let out = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(wav_path)
        .await?;
    let mut writer = BufWriter::new(out);

    write_wav(
        &mut writer,
        &mut pcm_reader,
        pcm_len,
        rate,
        channels,
        bits_per_sample,
    )
    .await?;
    writer.flush().await?;

    Ok(())
}

async fn read_header_bytes<R>(reader: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    reader.read_exact(buf).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::InvalidWavHeader
        } else {
            Error::Io(err)
        }
    })?;
    Ok(())
}
