pub mod asr;
pub mod connection;
pub mod message;
pub mod pipeline;
pub mod tts;

pub use connection::Connection;
pub use message::{
    AsrService, Attribution, AudioSpec, Message, MessageContainer, SynthesizeVoice, TranscriptBody,
    TtsService, VoiceServices,
};
pub use pipeline::{
    transcribe_all_audio_groups, transcribe_audio_groups, transcribe_wav_file, PipelineConfig,
    Transcription,
};
