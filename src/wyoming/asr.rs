use tokio::io::AsyncRead;
use tracing::debug;

use super::connection::Connection;
use super::message::{
    AudioSpec, Message, TranscribeBody, TranscriptBody, TRANSCRIBE_MESSAGE_TYPE,
    TRANSCRIPT_MESSAGE_TYPE,
};
use crate::error::{Error, Result};

impl Connection {
    /// Sends a transcribe request followed by the PCM from `reader` and
    /// returns the transcript text.
    ///
    /// The server must answer the audio-stop with exactly one `transcript`
    /// message; any other reply type is a protocol error.
    pub async fn transcribe<R>(
        &mut self,
        reader: &mut R,
        spec: AudioSpec,
        model_name: Option<&str>,
        language: Option<&str>,
    ) -> Result<String>
    where
        R: AsyncRead + Unpin,
    {
        let body = TranscribeBody {
            name: model_name.map(str::to_string),
            language: language.map(str::to_string),
        };
        self.send_message(&Message::with_data(TRANSCRIBE_MESSAGE_TYPE, &body)?)
            .await?;

        self.send_audio(reader, spec).await?;

        let reply = self.receive_message().await?;
        if reply.message.message_type != TRANSCRIPT_MESSAGE_TYPE {
            return Err(Error::UnexpectedMessage(reply.message.message_type));
        }

        let transcript: TranscriptBody = reply.parse_body()?;
        debug!("received transcript: {:?}", transcript.text);
        Ok(transcript.text)
    }
}
