// Integration tests for the TTS and ASR request flows, run against
// in-process fake servers.

use std::io::Cursor;

use anyhow::Result;
use serde_json::json;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use wyoming_voice::audio::read_wav_info;
use wyoming_voice::{AudioSpec, Connection, Error};

mod common;

use common::{read_frame, write_frame};

/// Serves one synthesize request with the given chunk payloads, attaching
/// the audio format to the first chunk only.
async fn spawn_tts_server(
    chunks: Vec<Vec<u8>>,
    spec: Option<AudioSpec>,
) -> Result<std::net::SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let frame = read_frame(&mut reader).await.unwrap();
        assert_eq!(frame.message_type(), "synthesize");

        write_frame(&mut write_half, json!({"type": "audio-start"}), b"", b"").await;

        // An unrelated message the client must ignore.
        write_frame(&mut write_half, json!({"type": "ping"}), b"", b"").await;

        let spec_body = spec
            .map(|spec| serde_json::to_vec(&spec).unwrap())
            .unwrap_or_default();
        for (i, chunk) in chunks.iter().enumerate() {
            let data: &[u8] = if i == 0 { &spec_body } else { &[] };
            write_frame(&mut write_half, json!({"type": "audio-chunk"}), data, chunk).await;
        }

        write_frame(&mut write_half, json!({"type": "audio-stop"}), b"", b"").await;
    });

    Ok(addr)
}

#[tokio::test]
async fn test_synthesize_assembles_chunk_stream() -> Result<()> {
    let spec = AudioSpec {
        rate: 22050,
        width: 2,
        channels: 1,
    };
    let addr = spawn_tts_server(vec![b"abcd".to_vec(), b"efgh".to_vec()], Some(spec)).await?;

    let mut conn = Connection::dial(&addr.to_string()).await?;
    let mut sink = Cursor::new(Vec::new());
    let observed = conn.synthesize("hello", None, &mut sink).await?;

    assert_eq!(observed, spec);
    assert_eq!(sink.into_inner(), b"abcdefgh");

    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_synthesize_without_chunks_returns_zeroed_spec() -> Result<()> {
    let addr = spawn_tts_server(Vec::new(), None).await?;

    let mut conn = Connection::dial(&addr.to_string()).await?;
    let mut sink = Cursor::new(Vec::new());
    let observed = conn.synthesize("hello", None, &mut sink).await?;

    assert_eq!(observed, AudioSpec::default());
    assert!(sink.into_inner().is_empty());

    conn.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_synthesize_to_wav_file() -> Result<()> {
    let pcm = common::square_wave(100, 22050, 1, 10000);
    let spec = AudioSpec {
        rate: 22050,
        width: 2,
        channels: 1,
    };
    let addr = spawn_tts_server(vec![pcm.clone()], Some(spec)).await?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("speech.wav");

    let mut conn = Connection::dial(&addr.to_string()).await?;
    conn.synthesize_to_wav_file("hello", None, &path).await?;
    conn.close().await?;

    let bytes = tokio::fs::read(&path).await?;
    let mut cursor = Cursor::new(bytes.clone());
    let info = read_wav_info(&mut cursor).await?;
    assert_eq!(info.rate, 22050);
    assert_eq!(info.channels, 1);
    assert_eq!(info.bits_per_sample, 16);
    assert_eq!(&bytes[info.data_offset as usize..], pcm.as_slice());

    Ok(())
}

#[tokio::test]
async fn test_synthesize_to_wav_file_refuses_existing_output() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("speech.wav");
    tokio::fs::write(&path, b"occupied").await?;

    // The output check fires before any request is sent, so the dial target
    // never has to answer.
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let mut conn = Connection::dial(&addr.to_string()).await?;
    let err = conn
        .synthesize_to_wav_file("hello", None, &path)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::OutputFileExists(_)));

    Ok(())
}

#[tokio::test]
async fn test_transcribe_exchange() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let pcm = common::square_wave(200, 16000, 1, 20000);
    let pcm_len = pcm.len();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let frame = read_frame(&mut reader).await.unwrap();
        assert_eq!(frame.message_type(), "transcribe");
        assert_eq!(frame.header["data"]["name"], "base.en");
        assert_eq!(frame.header["data"]["language"], "en");

        let frame = read_frame(&mut reader).await.unwrap();
        assert_eq!(frame.message_type(), "audio-start");
        let spec: AudioSpec = serde_json::from_slice(&frame.data).unwrap();
        assert_eq!(spec.rate, 16000);

        let mut received = Vec::new();
        let mut chunk_count = 0usize;
        loop {
            let frame = read_frame(&mut reader).await.unwrap();
            match frame.message_type() {
                "audio-chunk" => {
                    assert!(frame.payload.len() <= 1024);
                    received.extend_from_slice(&frame.payload);
                    chunk_count += 1;
                }
                "audio-stop" => break,
                other => panic!("unexpected message type: {other}"),
            }
        }
        assert_eq!(received.len(), pcm_len);
        assert_eq!(chunk_count, pcm_len.div_ceil(1024));

        write_frame(
            &mut write_half,
            json!({"type": "transcript"}),
            br#"{"text":"hello world"}"#,
            b"",
        )
        .await;
    });

    let mut conn = Connection::dial(&addr.to_string()).await?;
    let spec = AudioSpec {
        rate: 16000,
        width: 2,
        channels: 1,
    };
    let mut samples = pcm.as_slice();
    let text = conn
        .transcribe(&mut samples, spec, Some("base.en"), Some("en"))
        .await?;

    assert_eq!(text, "hello world");

    conn.close().await?;
    server.await?;
    Ok(())
}

#[tokio::test]
async fn test_transcribe_rejects_unexpected_reply() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        loop {
            let frame = read_frame(&mut reader).await.unwrap();
            if frame.message_type() == "audio-stop" {
                break;
            }
        }
        write_frame(&mut write_half, json!({"type": "error"}), b"", b"").await;
    });

    let mut conn = Connection::dial(&addr.to_string()).await?;
    let spec = AudioSpec {
        rate: 16000,
        width: 2,
        channels: 1,
    };
    let pcm = vec![0u8; 64];
    let mut samples = pcm.as_slice();
    let err = conn
        .transcribe(&mut samples, spec, None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnexpectedMessage(kind) if kind == "error"));

    Ok(())
}
