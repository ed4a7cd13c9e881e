pub mod audio;
pub mod error;
pub mod wyoming;

pub use audio::{AudioEvent, Segmenter, VadConfig, WavInfo};
pub use error::{Error, Result};
pub use wyoming::{
    AudioSpec, Connection, Message, MessageContainer, PipelineConfig, SynthesizeVoice,
    Transcription, VoiceServices,
};
