use std::io::ErrorKind;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::error::{Error, Result};

/// Detection parameters for the energy-based segmenter.
#[derive(Debug, Clone)]
pub struct VadConfig {
    /// Analysis window length in milliseconds.
    pub audio_window_ms: u32,
    /// Peak-to-peak span above which a window counts as sound.
    pub sound_threshold: i32,
    /// Peak-to-peak span below which a window counts as silence.
    pub silence_threshold: i32,
    /// Consecutive sound required to confirm an onset.
    pub min_sound_duration_ms: u32,
    /// Consecutive silence required to end an event.
    pub min_silence_duration_ms: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            audio_window_ms: 100,
            sound_threshold: 20000,
            silence_threshold: 2000,
            min_sound_duration_ms: 100,
            min_silence_duration_ms: 100,
        }
    }
}

impl VadConfig {
    /// Rejects non-positive parameters and durations that are not exact
    /// multiples of the analysis window.
    pub fn validate(&self) -> Result<()> {
        if self.audio_window_ms == 0 {
            return Err(Error::InvalidConfig(
                "audio window must be greater than 0".into(),
            ));
        }
        if self.sound_threshold <= 0 {
            return Err(Error::InvalidConfig(
                "sound threshold must be greater than 0".into(),
            ));
        }
        if self.silence_threshold <= 0 {
            return Err(Error::InvalidConfig(
                "silence threshold must be greater than 0".into(),
            ));
        }
        if self.min_sound_duration_ms == 0 {
            return Err(Error::InvalidConfig(
                "minimum sound duration must be greater than 0".into(),
            ));
        }
        if self.min_silence_duration_ms == 0 {
            return Err(Error::InvalidConfig(
                "minimum silence duration must be greater than 0".into(),
            ));
        }
        if self.min_sound_duration_ms % self.audio_window_ms != 0 {
            return Err(Error::InvalidConfig(
                "minimum sound duration must be a multiple of the audio window".into(),
            ));
        }
        if self.min_silence_duration_ms % self.audio_window_ms != 0 {
            return Err(Error::InvalidConfig(
                "minimum silence duration must be a multiple of the audio window".into(),
            ));
        }
        Ok(())
    }
}

/// A contiguous region of sound detected in a PCM stream.
///
/// `samples` holds interleaved 16-bit little-endian PCM covering `start`
/// through `end`, with the trailing silence that ended the event trimmed off.
#[derive(Debug, Clone)]
pub struct AudioEvent {
    pub start: Duration,
    pub end: Duration,
    pub samples: Vec<u8>,
}

/// Streams 16-bit PCM from a reader and yields audio events delimited by
/// sustained sound onset and sustained silence offset.
///
/// Windows are consumed whole and strictly in order, so segmentation is
/// deterministic for a given input and configuration. Event timestamps are
/// measured on a single global timeline: each event's end becomes the time
/// origin for the next search.
#[derive(Debug)]
pub struct Segmenter<R> {
    reader: R,
    config: VadConfig,
    window_bytes: usize,
    offset_ms: u64,
}

impl<R> Segmenter<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, rate: u32, channels: u16, config: VadConfig) -> Result<Self> {
        Self::with_offset(reader, rate, channels, config, 0)
    }

    /// Like [`Segmenter::new`] but with a non-zero starting time offset.
    pub fn with_offset(
        reader: R,
        rate: u32,
        channels: u16,
        config: VadConfig,
        offset_ms: u64,
    ) -> Result<Self> {
        config.validate()?;
        if rate == 0 {
            return Err(Error::InvalidConfig(
                "audio rate must be greater than 0".into(),
            ));
        }
        if channels == 0 {
            return Err(Error::InvalidConfig(
                "channel count must be greater than 0".into(),
            ));
        }

        let frames_per_window =
            ((rate as f64 * config.audio_window_ms as f64) / 1000.0).round() as usize;
        let window_bytes = frames_per_window * channels as usize * 2;
        if window_bytes == 0 {
            return Err(Error::InvalidConfig("window holds no samples".into()));
        }

        Ok(Self {
            reader,
            config,
            window_bytes,
            offset_ms,
        })
    }

    /// Current position on the global timeline, in milliseconds.
    pub fn offset_ms(&self) -> u64 {
        self.offset_ms
    }

    /// Detects the next audio event.
    ///
    /// End-of-stream while searching for an onset surfaces as an I/O error
    /// (see [`Error::is_stream_end`]); end-of-stream after an onset has been
    /// confirmed finalizes the event as though silence had been detected.
    pub async fn next_event(&mut self) -> Result<AudioEvent> {
        let window_ms = self.config.audio_window_ms as u64;
        let min_sound_windows = (self.config.min_sound_duration_ms / self.config.audio_window_ms) as usize;
        let min_silence_windows =
            (self.config.min_silence_duration_ms / self.config.audio_window_ms) as usize;

        let mut window = vec![0u8; self.window_bytes];
        let mut samples: Vec<u8> = Vec::new();

        // Onset search: count consecutive sound windows, discarding samples
        // accumulated before any break in the run.
        let mut sound_run = 0usize;
        let mut window_index: u64 = 0;
        let mut onset_ms: u64 = 0;
        loop {
            self.reader.read_exact(&mut window).await?;
            if window_span(&window) > self.config.sound_threshold {
                if sound_run == 0 {
                    onset_ms = window_index * window_ms;
                }
                sound_run += 1;
                samples.extend_from_slice(&window);
            } else {
                sound_run = 0;
                samples.clear();
            }
            window_index += 1;
            if sound_run >= min_sound_windows {
                break;
            }
        }
        let start_ms = self.offset_ms + onset_ms;

        // Offset search: keep accumulating until silence persists. A sound
        // window resets the silence run but the samples stay in the buffer.
        let mut silence_run = 0usize;
        let mut silence_start_index: u64 = 0;
        let mut phase_index: u64 = 0;
        let end_phase_ms;
        loop {
            match self.reader.read_exact(&mut window).await {
                Ok(_) => {}
                Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                    // Stream ended mid-event: finalize here.
                    if silence_run == 0 {
                        end_phase_ms = phase_index * window_ms;
                    } else {
                        end_phase_ms = silence_start_index * window_ms;
                        samples.truncate(samples.len() - silence_run * self.window_bytes);
                    }
                    break;
                }
                Err(err) => return Err(err.into()),
            }

            samples.extend_from_slice(&window);
            if window_span(&window) < self.config.silence_threshold {
                if silence_run == 0 {
                    silence_start_index = phase_index;
                }
                silence_run += 1;
            } else {
                silence_run = 0;
            }
            phase_index += 1;

            if silence_run >= min_silence_windows {
                end_phase_ms = silence_start_index * window_ms;
                samples.truncate(samples.len() - silence_run * self.window_bytes);
                break;
            }
        }

        let end_ms = start_ms + self.config.min_sound_duration_ms as u64 + end_phase_ms;
        self.offset_ms = end_ms;

        debug!(
            "audio event: {} ms - {} ms ({} bytes)",
            start_ms,
            end_ms,
            samples.len()
        );

        Ok(AudioEvent {
            start: Duration::from_millis(start_ms),
            end: Duration::from_millis(end_ms),
            samples,
        })
    }

}

/// Peak-to-peak amplitude of a window of interleaved 16-bit LE samples.
///
/// Each sample is sign-folded by adding `i16::MAX` before comparison; the
/// span is the difference between the largest and smallest folded value.
fn window_span(window: &[u8]) -> i32 {
    let mut highest = i32::MIN;
    let mut lowest = i32::MAX;
    for pair in window.chunks_exact(2) {
        let value = i16::from_le_bytes([pair[0], pair[1]]) as i32 + i16::MAX as i32;
        highest = highest.max(value);
        lowest = lowest.min(value);
    }
    highest - lowest
}
