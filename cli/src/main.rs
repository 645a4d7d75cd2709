use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tonalpulse_core::{
    export_file_name, read_wav, wav, DemodulatorConfig, Prefix, Preset, ReceiverSession,
    SampleFrameSource, SpectrumAnalyzer, TonalPulse, FFT_SIZE, SAMPLE_RATE,
    SMOOTHING_TIME_CONSTANT, TICK_HOP_SAMPLES,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod server;

#[derive(Parser)]
#[command(name = "tonalpulse")]
#[command(about = "Tonal Pulse: a small vocabulary spoken as sequences of tones")]
struct Cli {
    /// Frequency preset (bright, warm, deep, subsonic, scifi)
    #[arg(long, global = true, default_value = "bright")]
    preset: Preset,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate text into the written form (reads stdin when TEXT is omitted)
    Encode {
        text: Option<String>,

        /// Sentence prefix (COMMAND, QUESTION, URGENT, NEGATE, CONDITION, SCHEDULE, BROADCAST, EMERGENCY)
        #[arg(short, long, default_value = "command")]
        prefix: Prefix,

        /// Print the tone timeline as well
        #[arg(long)]
        timeline: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Translate a written form back into text (reads stdin when WRITTEN is omitted)
    Decode { written: Option<String> },

    /// Render a transmission to a 16-bit mono WAV file
    Export {
        /// Text to encode (ignored when --written is given)
        text: Option<String>,

        /// Render this written form as-is instead of encoding text
        #[arg(short, long, conflicts_with = "text")]
        written: Option<String>,

        #[arg(short, long, default_value = "command")]
        prefix: Prefix,

        /// Output WAV file (defaults to a name derived from the written form)
        #[arg(short, long, value_name = "OUTPUT.WAV")]
        output: Option<PathBuf>,

        #[arg(long, default_value_t = SAMPLE_RATE)]
        sample_rate: u32,
    },

    /// Run the receiver over a WAV recording
    Listen {
        #[arg(value_name = "INPUT.WAV")]
        input: PathBuf,

        /// Analyser FFT size (power of two)
        #[arg(long, default_value_t = FFT_SIZE)]
        fft_size: usize,

        /// Samples between receiver ticks (defaults to ~60 ticks per second)
        #[arg(long)]
        hop: Option<usize>,

        /// Detection threshold in dB
        #[arg(long, default_value_t = -40.0, allow_hyphen_values = true)]
        threshold: f32,

        /// Recover long symbols from tone length
        #[arg(long)]
        durations: bool,
    },

    /// List frequency presets
    Presets,

    /// Show the vocabulary, optionally filtered by substring
    Dict { filter: Option<String> },

    /// Show the alphabet, prefixes and capacity for the selected preset
    Info,

    /// Serve the codec over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let preset = cli.preset;

    match cli.command {
        Commands::Encode {
            text,
            prefix,
            timeline,
            json,
        } => encode_command(preset, text, prefix, timeline, json)?,
        Commands::Decode { written } => decode_command(preset, written)?,
        Commands::Export {
            text,
            written,
            prefix,
            output,
            sample_rate,
        } => export_command(preset, text, written, prefix, output, sample_rate)?,
        Commands::Listen {
            input,
            fft_size,
            hop,
            threshold,
            durations,
        } => {
            let config = DemodulatorConfig {
                threshold_db: threshold,
                classify_durations: durations,
                ..DemodulatorConfig::default()
            };
            listen_command(preset, &input, fft_size, hop, config)?
        }
        Commands::Presets => presets_command(preset),
        Commands::Dict { filter } => dict_command(preset, filter.as_deref().unwrap_or(""))?,
        Commands::Info => info_command(preset)?,
        Commands::Serve { bind } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(bind, preset))?
        }
    }

    Ok(())
}

/// Argument if present, otherwise all of stdin
fn arg_or_stdin(arg: Option<String>) -> io::Result<String> {
    match arg {
        Some(value) => Ok(value),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf.trim().to_string())
        }
    }
}

fn encode_command(
    preset: Preset,
    text: Option<String>,
    prefix: Prefix,
    timeline: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let codec = TonalPulse::with_preset(preset)?;
    let text = arg_or_stdin(text)?;
    let encoded = codec.encode(&text, prefix);
    for word in &encoded.unknown {
        warn!("no code for {:?}, skipped", word);
    }

    let synthesis = codec.synthesizer().synthesize(&encoded.written);
    if json {
        let response = server::EncodeResponse::new(encoded, &synthesis);
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}", encoded.written);
    if timeline {
        for event in &synthesis.events {
            println!(
                "  {:>7.3}s  {}  {:<4}  {:>6.1} Hz  {:>3.0} ms",
                event.start,
                event.symbol,
                event.band.label(),
                event.frequency,
                event.duration * 1000.0
            );
        }
    }
    info!(
        "{} word(s) matched, {:.2}s of audio",
        encoded.matched, synthesis.total_duration
    );
    Ok(())
}

fn decode_command(preset: Preset, written: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let codec = TonalPulse::with_preset(preset)?;
    let written = arg_or_stdin(written)?;
    println!("{}", codec.decode(&written));
    Ok(())
}

fn export_command(
    preset: Preset,
    text: Option<String>,
    written: Option<String>,
    prefix: Prefix,
    output: Option<PathBuf>,
    sample_rate: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let codec = TonalPulse::with_preset(preset)?;
    let written = match written {
        Some(written) => written,
        None => {
            let encoded = codec.encode(&arg_or_stdin(text)?, prefix);
            for word in &encoded.unknown {
                warn!("no code for {:?}, skipped", word);
            }
            encoded.written
        }
    };

    let samples = codec.render_samples(&written, sample_rate);
    let output = output.unwrap_or_else(|| PathBuf::from(export_file_name(&written)));
    let mut writer = BufWriter::new(File::create(&output)?);
    wav::write_wav(&mut writer, &samples, sample_rate)?;
    writer.flush()?;

    println!("{}", written);
    info!(
        "wrote {} samples ({:.2}s at {} Hz) to {}",
        samples.len(),
        samples.len() as f64 / sample_rate as f64,
        sample_rate,
        output.display()
    );
    Ok(())
}

fn listen_command(
    preset: Preset,
    input: &Path,
    fft_size: usize,
    hop: Option<usize>,
    config: DemodulatorConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let codec = TonalPulse::with_preset(preset)?;
    let audio = read_wav(File::open(input)?)?;
    info!(
        "read {}: {} Hz, {:.2}s",
        input.display(),
        audio.sample_rate,
        audio.duration()
    );

    let hop = hop.unwrap_or_else(|| {
        (TICK_HOP_SAMPLES as u64 * audio.sample_rate as u64 / SAMPLE_RATE as u64).max(1) as usize
    });
    let analyzer = SpectrumAnalyzer::new(audio.sample_rate, fft_size, SMOOTHING_TIME_CONSTANT)?;
    let source = SampleFrameSource::new(audio.samples, analyzer, hop);
    let mut session = ReceiverSession::new(source, codec.demodulator(config));

    session.run(|outcome| {
        if let Some(tone) = outcome.detected {
            debug!("{} tone at {} Hz", tone.band, tone.frequency);
        }
        if let Some(word) = &outcome.flushed {
            info!("word: {}", word);
        }
    });
    debug!("{} ticks", session.ticks());

    let written = session.finish();
    println!("{}", written);
    println!("{}", codec.decode(&written));
    Ok(())
}

fn presets_command(selected: Preset) {
    for preset in Preset::ALL {
        let marker = if preset == selected { "*" } else { " " };
        let freqs: Vec<String> = preset.frequencies().iter().map(|f| format!("{}", f)).collect();
        println!(
            "{} {:<9} {:<9} [{}] Hz  {}",
            marker,
            preset.key(),
            preset.label(),
            freqs.join(", "),
            preset.description()
        );
    }
}

fn dict_command(preset: Preset, filter: &str) -> Result<(), Box<dyn std::error::Error>> {
    let codec = TonalPulse::with_preset(preset)?;
    let groups = codec.vocabulary().search(filter);
    if groups.is_empty() {
        println!("no words match {:?}", filter);
        return Ok(());
    }
    for (category, entries) in groups {
        println!("{}", category.label());
        for entry in entries {
            println!("  {:<14} {}", entry.word, entry.code);
        }
    }
    Ok(())
}

fn info_command(preset: Preset) -> Result<(), Box<dyn std::error::Error>> {
    let codec = TonalPulse::with_preset(preset)?;
    let profile = codec.profile();

    println!(
        "Preset {} ({}), bin tolerance ±{:.0} Hz",
        preset.label(),
        preset.key(),
        profile.bin_tolerance()
    );

    println!("Alphabet:");
    for tone in codec.symbols().iter() {
        println!(
            "  {}  {:<4}  {:>6.1} Hz  {} ms",
            tone.symbol.letter,
            tone.symbol.band.label(),
            tone.frequency,
            tone.duration_ms()
        );
    }
    println!("  ~  LINK  {:>6.1} Hz", profile.link_frequency());

    println!("Prefixes:");
    for prefix in Prefix::ALL {
        println!("  {:<3} {:<10} {}", prefix.code(), prefix.key(), prefix.label());
    }

    let capacity = codec.vocabulary().capacity();
    println!(
        "Capacity: {} symbols, {} codes per slot, {} prefixes, {} words",
        capacity.symbols, capacity.codes_per_slot, capacity.prefixes, capacity.words
    );
    Ok(())
}
