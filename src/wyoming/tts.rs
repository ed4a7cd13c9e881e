use std::path::Path;

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tracing::info;

use super::connection::Connection;
use super::message::{AudioSpec, Message, SynthesizeBody, SynthesizeVoice, SYNTHESIZE_MESSAGE_TYPE};
use crate::audio::wav;
use crate::error::{Error, Result};

impl Connection {
    /// Requests synthesis of `text` and writes the streamed PCM to `writer`.
    ///
    /// Returns the audio format observed on the chunk stream; see
    /// [`Connection::receive_audio`] for the zeroed-format case.
    pub async fn synthesize<W>(
        &mut self,
        text: &str,
        voice: Option<SynthesizeVoice>,
        writer: &mut W,
    ) -> Result<AudioSpec>
    where
        W: AsyncWrite + Unpin,
    {
        let body = SynthesizeBody {
            text: text.to_string(),
            voice,
        };
        self.send_message(&Message::with_data(SYNTHESIZE_MESSAGE_TYPE, &body)?)
            .await?;

        let spec = self.receive_audio(writer).await?;

        info!(
            "synthesized {:?} ({} Hz, {} channel(s))",
            text, spec.rate, spec.channels
        );
        Ok(spec)
    }

    /// Synthesizes `text` and streams the raw PCM to stdout.
    pub async fn synthesize_to_stdout(
        &mut self,
        text: &str,
        voice: Option<SynthesizeVoice>,
    ) -> Result<AudioSpec> {
        let mut stdout = tokio::io::stdout();
        self.synthesize(text, voice, &mut stdout).await
    }

    /// Synthesizes `text` into a WAV file at `path`.
    ///
    /// The PCM is collected in a uniquely named scratch file, then wrapped
    /// with a WAV header built from the observed format. The scratch file is
    /// removed on every exit path; `path` must not already exist.
    pub async fn synthesize_to_wav_file(
        &mut self,
        text: &str,
        voice: Option<SynthesizeVoice>,
        path: &Path,
    ) -> Result<AudioSpec> {
        if fs::try_exists(path).await? {
            return Err(Error::OutputFileExists(path.to_path_buf()));
        }

        let scratch = tempfile::NamedTempFile::new()?;

        let mut pcm_sink = File::from_std(scratch.reopen()?);
        let spec = self.synthesize(text, voice, &mut pcm_sink).await?;
        pcm_sink.flush().await?;
        drop(pcm_sink);

        let pcm_len = fs::metadata(scratch.path()).await?.len() as u32;
        let mut pcm_reader = BufReader::new(File::open(scratch.path()).await?);

        let out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        let mut writer = BufWriter::new(out);
        wav::write_wav(
            &mut writer,
            &mut pcm_reader,
            pcm_len,
            spec.rate,
            spec.channels,
            spec.width * 8,
        )
        .await?;
        writer.flush().await?;

        info!("wrote {} bytes of audio to {}", pcm_len, path.display());
        Ok(spec)
    }
}
