use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

pub const DESCRIBE_MESSAGE_TYPE: &str = "describe";
pub const SYNTHESIZE_MESSAGE_TYPE: &str = "synthesize";
pub const TRANSCRIBE_MESSAGE_TYPE: &str = "transcribe";
pub const TRANSCRIPT_MESSAGE_TYPE: &str = "transcript";
pub const AUDIO_START_MESSAGE_TYPE: &str = "audio-start";
pub const AUDIO_CHUNK_MESSAGE_TYPE: &str = "audio-chunk";
pub const AUDIO_STOP_MESSAGE_TYPE: &str = "audio-stop";

/// Wyoming message header: one line of JSON terminated by a newline.
///
/// `data_length` and `payload_length` declare the sizes of the trailing
/// JSON and binary blobs; both are omitted on the wire when zero, and
/// peers that omit them are tolerated on receive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub message_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub data_length: usize,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub payload_length: usize,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

impl Message {
    pub fn new(message_type: &str) -> Self {
        Self {
            message_type: message_type.to_string(),
            ..Self::default()
        }
    }

    /// Builds a header carrying `data` inline as a JSON object.
    pub fn with_data<T: Serialize>(message_type: &str, data: &T) -> Result<Self> {
        Ok(Self {
            message_type: message_type.to_string(),
            data: Some(serde_json::to_value(data)?),
            ..Self::default()
        })
    }
}

/// A complete wire message: header plus its trailing data and payload blobs.
#[derive(Debug, Clone, Default)]
pub struct MessageContainer {
    pub message: Message,
    pub data: Vec<u8>,
    pub payload: Vec<u8>,
}

impl MessageContainer {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            data: Vec::new(),
            payload: Vec::new(),
        }
    }

    /// True when the message carries a body, either as a trailing data blob
    /// or inline in the header.
    pub fn has_body(&self) -> bool {
        !self.data.is_empty() || self.message.data.is_some()
    }

    /// Parses the message body, preferring the trailing data blob over the
    /// header's inline object. Returns the default value when neither is
    /// present.
    pub fn parse_body<T>(&self) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        if !self.data.is_empty() {
            return Ok(serde_json::from_slice(&self.data)?);
        }
        if let Some(value) = &self.message.data {
            return Ok(serde_json::from_value(value.clone())?);
        }
        Ok(T::default())
    }
}

/// PCM stream parameters carried by the audio-start/chunk/stop messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSpec {
    pub rate: u32,
    /// Sample width in bytes.
    pub width: u16,
    pub channels: u16,
}

/// Voice selection for a synthesize request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesizeVoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesizeBody {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<SynthesizeVoice>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscribeBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptBody {
    #[serde(default)]
    pub text: String,
}

/// Service catalogue reported by the describe handshake.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceServices {
    pub tts: Vec<TtsService>,
    pub asr: Vec<AsrService>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Attribution {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsVoice {
    pub name: String,
    pub attribution: Attribution,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsSpeaker {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsService {
    pub name: String,
    pub languages: Vec<String>,
    pub voices: Vec<TtsVoice>,
    pub speakers: Vec<TtsSpeaker>,
    pub attribution: Attribution,
    pub installed: bool,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AsrService {
    pub name: String,
    pub languages: Vec<String>,
    pub attribution: Attribution,
    pub installed: bool,
    pub description: Option<String>,
    pub version: Option<String>,
}
