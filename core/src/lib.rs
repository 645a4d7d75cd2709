//! Tonal Pulse codec: a small acoustic symbol language
//!
//! Text is mapped to 3-symbol codes over an 8-symbol tone alphabet (4 bands × short/long),
//! synthesized as enveloped sine tones, serialized to 16-bit PCM WAV, and recovered from a
//! stream of spectrum frames by a debouncing demodulator.

pub mod error;
pub mod profile;
pub mod alphabet;
pub mod vocabulary;
pub mod written;
pub mod translate;
pub mod synth;
pub mod wav;
pub mod spectrum;
pub mod demod;

pub use alphabet::{DurationClass, Symbol, SymbolTable, ToneSpec};
pub use demod::{
    BandLevel, DemodulatorConfig, DetectedTone, DetectionFrame, Demodulator, FrameSource,
    ReceiverSession, ReceiverState, RunEnd, TickOutcome,
};
pub use error::{Result, TonalPulseError};
pub use profile::{Band, FrequencyBin, FrequencyProfile, Preset};
pub use spectrum::{SampleFrameSource, SpectrumAnalyzer};
pub use synth::{estimate_duration, render, Synthesis, Synthesizer, ToneEvent, ToneSink};
pub use translate::{decode, encode, Encoded, LINK_MARKER};
pub use vocabulary::{Capacity, Category, Prefix, Vocabulary, VocabularyEntry, EXAMPLE_PHRASES};
pub use wav::{read_wav, serialize, WavAudio};
pub use written::{parse, Token};

// Tone timing (milliseconds)
pub const SHORT_MS: u32 = 100;
pub const LONG_MS: u32 = 200;
pub const GAP_SYMBOL_MS: u32 = 50;
pub const GAP_WORD_MS: u32 = 200;
pub const LEAD_IN_MS: u32 = 50;
pub const TRAILING_PAD_MS: u32 = 300;
pub const FADE_MS: u32 = 10;

// Tone levels
pub const SYMBOL_AMPLITUDE: f32 = 0.4;
pub const LINK_AMPLITUDE: f32 = 0.35;

// Export configuration
pub const SAMPLE_RATE: u32 = 44100;

// Receiver defaults (Web Audio analyser compatible)
pub const FFT_SIZE: usize = 4096;
pub const SMOOTHING_TIME_CONSTANT: f32 = 0.3;
pub const MIN_DECIBELS: f32 = -100.0;
pub const TICK_HOP_SAMPLES: usize = 735; // ~60 ticks/s at 44.1 kHz

/// Three-symbol codes per vocabulary slot: 8 symbols over 4 case patterns
pub const CODES_PER_SLOT: usize = 4096;

/// One codec session: a frequency profile plus the tables derived from it.
///
/// Everything that turns sound into symbols or back (synthesis, bins, demodulation) must be
/// built from the same session, otherwise the bin tolerances no longer match the tones.
#[derive(Debug, Clone)]
pub struct TonalPulse {
    profile: FrequencyProfile,
    symbols: SymbolTable,
    bins: [FrequencyBin; 5],
    vocabulary: Vocabulary,
}

impl TonalPulse {
    pub fn new(profile: FrequencyProfile) -> Result<Self> {
        let vocabulary = Vocabulary::standard()?;
        log::debug!(
            "tonal pulse session: profile {:?}, {} words",
            profile.frequencies(),
            vocabulary.len()
        );
        Ok(Self {
            symbols: SymbolTable::new(&profile),
            bins: profile.bins(),
            profile,
            vocabulary,
        })
    }

    pub fn with_preset(preset: Preset) -> Result<Self> {
        Self::new(preset.profile())
    }

    pub fn profile(&self) -> &FrequencyProfile {
        &self.profile
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn bins(&self) -> &[FrequencyBin; 5] {
        &self.bins
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn encode(&self, text: &str, prefix: Prefix) -> Encoded {
        translate::encode(&self.vocabulary, text, prefix)
    }

    pub fn decode(&self, written: &str) -> String {
        translate::decode(&self.vocabulary, written)
    }

    pub fn synthesizer(&self) -> Synthesizer {
        Synthesizer::new(&self.profile)
    }

    pub fn demodulator(&self, config: DemodulatorConfig) -> Demodulator {
        Demodulator::new(&self.profile, config)
    }

    /// Synthesize and render a written form to PCM at `sample_rate`
    pub fn render_samples(&self, written: &str, sample_rate: u32) -> Vec<f32> {
        let synthesis = self.synthesizer().synthesize(written);
        synth::render(&synthesis.events, sample_rate, synthesis.total_duration)
    }

    /// Render a written form straight to WAV bytes at [`SAMPLE_RATE`]
    pub fn render_wav(&self, written: &str) -> Vec<u8> {
        wav::serialize(&self.render_samples(written, SAMPLE_RATE), SAMPLE_RATE)
    }

    /// Run the receiver over recorded audio and return the written form it heard
    pub fn receive_samples(
        &self,
        samples: Vec<f32>,
        sample_rate: u32,
        config: DemodulatorConfig,
    ) -> Result<String> {
        let source = SampleFrameSource::with_defaults(samples, sample_rate)?;
        let mut session = ReceiverSession::new(source, self.demodulator(config));
        session.run(|_| {});
        Ok(session.finish())
    }
}

/// Download name for an exported transmission: `tpl_` + the written form with every
/// non-letter replaced by `_`, cut to 25 characters
pub fn export_file_name(written: &str) -> String {
    let stem: String = written
        .chars()
        .map(|c| if c.is_ascii_alphabetic() { c } else { '_' })
        .take(25)
        .collect();
    format!("tpl_{}.wav", stem)
}
