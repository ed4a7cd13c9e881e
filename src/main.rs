use anyhow::{Context, Result};
use clap::Parser;

use wyoming_voice::wyoming::{transcribe_wav_file, PipelineConfig};
use wyoming_voice::{AudioSpec, Connection, Segmenter, SynthesizeVoice};

mod cli;

use cli::{AsrArgs, Cli, Commands, TtsArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries audio or transcriptions.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Tts(args) => run_tts(args).await,
        Commands::Asr(args) => run_asr(args).await,
    }
}

async fn run_tts(args: TtsArgs) -> Result<()> {
    args.validate()?;

    let mut conn = Connection::connect(&args.addr)
        .await
        .with_context(|| format!("failed to connect to {}", args.addr))?;
    conn.require_tts()?;

    let voice = args.voice_name.clone().map(|name| SynthesizeVoice {
        name: Some(name),
        ..SynthesizeVoice::default()
    });

    if args.output_raw {
        conn.synthesize_to_stdout(&args.text, voice).await?;
    } else {
        let path = args
            .output_file
            .as_deref()
            .context("missing output file path")?;
        conn.synthesize_to_wav_file(&args.text, voice, path).await?;
    }

    conn.close().await?;
    Ok(())
}

async fn run_asr(args: AsrArgs) -> Result<()> {
    args.validate()?;

    let config = PipelineConfig {
        workers: args.num_workers,
        model_name: args.model_name.clone(),
        language: args.language.clone(),
        vad: args.vad_config(),
    };

    if !args.input_raw {
        let path = args.input_file.as_deref().context("missing input file path")?;

        // One capability check up front; pipeline workers connect blindly.
        let conn = Connection::connect(&args.addr)
            .await
            .with_context(|| format!("failed to connect to {}", args.addr))?;
        conn.require_asr()?;
        conn.close().await?;

        let transcriptions = transcribe_wav_file(path, &args.addr, config).await?;
        for (i, transcription) in transcriptions.iter().enumerate() {
            println!(
                "{}: {:.6} - {:.6} '{}'",
                i,
                transcription.start.as_secs_f64(),
                transcription.end.as_secs_f64(),
                transcription.text
            );
        }
        return Ok(());
    }

    // Raw mode: segment stdin and issue one request per connection.
    let mut conn = Connection::connect(&args.addr)
        .await
        .with_context(|| format!("failed to connect to {}", args.addr))?;
    conn.require_asr()?;

    let spec = AudioSpec {
        rate: args.input_raw_rate,
        width: 2,
        channels: args.input_raw_channels,
    };
    let mut segmenter = Segmenter::new(
        tokio::io::stdin(),
        spec.rate,
        spec.channels,
        args.vad_config(),
    )?;

    loop {
        let event = match segmenter.next_event().await {
            Ok(event) => event,
            Err(err) if err.is_stream_end() => break,
            Err(err) => return Err(err.into()),
        };

        let mut samples = event.samples.as_slice();
        let text = conn
            .transcribe(
                &mut samples,
                spec,
                args.model_name.as_deref(),
                args.language.as_deref(),
            )
            .await?;
        println!("{}", text);

        conn.reconnect().await?;
    }

    conn.close().await?;
    Ok(())
}
