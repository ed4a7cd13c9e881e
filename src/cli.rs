use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};

use wyoming_voice::VadConfig;

#[derive(Parser, Debug)]
#[command(name = "wyoming-voice", version, about = "Client for Wyoming voice servers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synthesize speech from text
    Tts(TtsArgs),

    /// Transcribe speech to text
    Asr(AsrArgs),
}

#[derive(Args, Debug)]
pub struct TtsArgs {
    /// Text to be spoken
    #[arg(long)]
    pub text: String,

    /// Address and port of the TTS Wyoming server
    #[arg(long, default_value = "localhost:10200")]
    pub addr: String,

    /// Output WAV file path
    #[arg(long = "output_file")]
    pub output_file: Option<PathBuf>,

    /// Stream raw PCM audio to stdout instead of writing a WAV file
    #[arg(long)]
    pub output_raw: bool,

    /// Voice name
    #[arg(long)]
    pub voice_name: Option<String>,
}

impl TtsArgs {
    pub fn validate(&self) -> Result<()> {
        if self.text.is_empty() {
            bail!("missing text");
        }
        if self.addr.is_empty() {
            bail!("missing server address");
        }
        if !self.output_raw {
            match &self.output_file {
                None => bail!("missing output file path"),
                Some(path) if path.exists() => bail!("output file already exists"),
                Some(_) => {}
            }
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct AsrArgs {
    /// Address and port of the ASR Wyoming server
    #[arg(long, default_value = "localhost:10300")]
    pub addr: String,

    /// Input WAV file path
    #[arg(long = "input_file")]
    pub input_file: Option<PathBuf>,

    /// Name of the model
    #[arg(long)]
    pub model_name: Option<String>,

    /// Language
    #[arg(long)]
    pub language: Option<String>,

    /// Listen for raw PCM audio on stdin and print results in a loop
    #[arg(long)]
    pub input_raw: bool,

    /// Audio rate of the stdin stream
    #[arg(long, default_value_t = 22050)]
    pub input_raw_rate: u32,

    /// Number of audio channels in the stdin stream
    #[arg(long, default_value_t = 1)]
    pub input_raw_channels: u16,

    /// Number of transcription requests running at once
    #[arg(long, default_value_t = 3)]
    pub num_workers: usize,

    /// Window size in milliseconds used for detecting sound
    #[arg(long, default_value_t = 100)]
    pub audio_window_ms: u32,

    /// Level of noise for a sound event
    #[arg(long, default_value_t = 20000)]
    pub sound_threshold: i32,

    /// Level of noise for a silence event
    #[arg(long, default_value_t = 2000)]
    pub silence_threshold: i32,

    /// Minimum length of a sound event in milliseconds
    #[arg(long, default_value_t = 100)]
    pub min_sound_duration_ms: u32,

    /// Minimum length of a silence event in milliseconds
    #[arg(long, default_value_t = 100)]
    pub min_silence_duration_ms: u32,
}

impl AsrArgs {
    pub fn validate(&self) -> Result<()> {
        if self.addr.is_empty() {
            bail!("missing server address");
        }
        if self.num_workers == 0 {
            bail!("num-workers must be greater than 0");
        }

        self.vad_config().validate()?;

        if self.input_raw {
            if self.input_raw_rate == 0 {
                bail!("input-raw-rate must be greater than 0");
            }
            if self.input_raw_channels == 0 {
                bail!("input-raw-channels must be greater than 0");
            }
        } else {
            let path = match &self.input_file {
                Some(path) => path,
                None => bail!("missing input file path"),
            };
            let is_wav = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("wav"))
                .unwrap_or(false);
            if !is_wav {
                bail!("input_file must be a WAV audio file");
            }
            if !path.exists() {
                bail!("input file does not exist: {}", path.display());
            }
        }

        Ok(())
    }

    pub fn vad_config(&self) -> VadConfig {
        VadConfig {
            audio_window_ms: self.audio_window_ms,
            sound_threshold: self.sound_threshold,
            silence_threshold: self.silence_threshold,
            min_sound_duration_ms: self.min_sound_duration_ms,
            min_silence_duration_ms: self.min_silence_duration_ms,
        }
    }
}
