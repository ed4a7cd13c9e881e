use std::io::SeekFrom;
use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncSeekExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::connection::Connection;
use super::message::AudioSpec;
use crate::audio::vad::{AudioEvent, Segmenter, VadConfig};
use crate::audio::wav;
use crate::error::{Error, Result};

/// A transcribed audio event, carrying the time range the VAD detected.
#[derive(Debug, Clone)]
pub struct Transcription {
    pub text: String,
    pub start: Duration,
    pub end: Duration,
}

/// Settings for the concurrent transcription pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of transcription requests in flight at once.
    pub workers: usize,
    pub model_name: Option<String>,
    pub language: Option<String>,
    pub vad: VadConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            model_name: None,
            language: None,
            vad: VadConfig::default(),
        }
    }
}

/// Segments the PCM stream from `reader` and transcribes the detected events
/// against the server at `server_addr`, with `config.workers` requests in
/// flight at once.
///
/// One producer task runs the segmenter and feeds a bounded event queue;
/// each worker drains the queue, opening a fresh connection per event (the
/// caller is expected to have checked `supports_asr` beforehand, so workers
/// skip the describe handshake). Events are queued in non-decreasing start
/// order, but transcriptions arrive in completion order; sort by `start` to
/// recover segmentation order.
///
/// The result channel closes once the stream ends and every queued event has
/// been handled. Stream-end conditions terminate the producer silently; any
/// other failure is delivered on the error channel.
pub fn transcribe_audio_groups<R>(
    reader: R,
    spec: AudioSpec,
    server_addr: &str,
    config: PipelineConfig,
) -> Result<(mpsc::Receiver<Transcription>, mpsc::Receiver<Error>)>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    if config.workers == 0 {
        return Err(Error::InvalidConfig(
            "worker count must be greater than 0".into(),
        ));
    }
    let mut segmenter = Segmenter::new(reader, spec.rate, spec.channels, config.vad.clone())?;

    let (event_tx, event_rx) = async_channel::bounded::<AudioEvent>(config.workers);
    let (result_tx, result_rx) = mpsc::channel::<Transcription>(config.workers);
    let (error_tx, error_rx) = mpsc::channel::<Error>(config.workers);

    for worker_id in 0..config.workers {
        let event_rx = event_rx.clone();
        let result_tx = result_tx.clone();
        let error_tx = error_tx.clone();
        let server_addr = server_addr.to_string();
        let model_name = config.model_name.clone();
        let language = config.language.clone();

        tokio::spawn(async move {
            while let Ok(event) = event_rx.recv().await {
                let text = match transcribe_event(
                    &server_addr,
                    spec,
                    &event,
                    model_name.as_deref(),
                    language.as_deref(),
                )
                .await
                {
                    Ok(text) => text,
                    Err(err) => {
                        error!("transcription worker {} failed: {}", worker_id, err);
                        let _ = error_tx.send(err).await;
                        return;
                    }
                };

                let transcription = Transcription {
                    text,
                    start: event.start,
                    end: event.end,
                };
                if result_tx.send(transcription).await.is_err() {
                    // Caller stopped listening.
                    break;
                }
            }

            debug!("transcription worker {} finished", worker_id);
        });
    }

    let producer_error_tx = error_tx;
    tokio::spawn(async move {
        loop {
            let event = match segmenter.next_event().await {
                Ok(event) => event,
                Err(err) if err.is_stream_end() => {
                    debug!("audio stream ended");
                    break;
                }
                Err(err) => {
                    warn!("audio segmentation failed: {}", err);
                    let _ = producer_error_tx.send(err).await;
                    break;
                }
            };

            if event_tx.send(event).await.is_err() {
                // All workers exited.
                break;
            }
        }

        event_tx.close();
    });

    Ok((result_rx, error_rx))
}

/// Runs [`transcribe_audio_groups`] to completion, collecting every
/// transcription.
///
/// Stream-end errors are swallowed; the first other error aborts the run.
pub async fn transcribe_all_audio_groups<R>(
    reader: R,
    spec: AudioSpec,
    server_addr: &str,
    config: PipelineConfig,
) -> Result<Vec<Transcription>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (mut result_rx, mut error_rx) = transcribe_audio_groups(reader, spec, server_addr, config)?;
    let mut transcriptions = Vec::new();

    loop {
        tokio::select! {
            result = result_rx.recv() => match result {
                Some(transcription) => transcriptions.push(transcription),
                None => return Ok(transcriptions),
            },
            Some(err) = error_rx.recv() => {
                if !err.is_stream_end() {
                    return Err(err);
                }
            }
        }
    }
}

/// Transcribes every audio event found in the WAV file at `path`.
///
/// The file must contain 16-bit PCM; the stream format is taken from its
/// header.
pub async fn transcribe_wav_file(
    path: &Path,
    server_addr: &str,
    config: PipelineConfig,
) -> Result<Vec<Transcription>> {
    let mut file = tokio::fs::File::open(path).await?;
    let info = wav::read_wav_info(&mut file).await?;
    if info.bits_per_sample != 16 {
        return Err(Error::UnsupportedBitsPerSample(info.bits_per_sample));
    }
    file.seek(SeekFrom::Start(info.data_offset)).await?;

    let spec = AudioSpec {
        rate: info.rate,
        width: info.width(),
        channels: info.channels,
    };

    info!(
        "transcribing {} ({} Hz, {} channel(s), {} workers)",
        path.display(),
        spec.rate,
        spec.channels,
        config.workers
    );

    transcribe_all_audio_groups(BufReader::new(file), spec, server_addr, config).await
}

/// One transcription request over a dedicated connection, closed on every
/// exit path.
async fn transcribe_event(
    server_addr: &str,
    spec: AudioSpec,
    event: &AudioEvent,
    model_name: Option<&str>,
    language: Option<&str>,
) -> Result<String> {
    let mut conn = Connection::dial(server_addr).await?;
    let mut samples = event.samples.as_slice();
    let result = conn.transcribe(&mut samples, spec, model_name, language).await;
    let _ = conn.close().await;
    result
}
