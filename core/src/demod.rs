//! Tone demodulator
//!
//! Consumes one spectrum frame per tick, finds the loudest bin, classifies it into a profile
//! band and turns tone onsets into written-form letters. Two silence thresholds drive it:
//! a short one releases the debounce memory so a repeated tone counts again, a long one ends
//! the current word and flushes its letters to the output.
//!
//! The receiver cannot see symbol length by default, so every band comes out as its lowercase
//! letter. With [`DemodulatorConfig::classify_durations`] the run length of each tone is used
//! to restore the uppercase (long) letters.

use crate::alphabet::{DurationClass, Symbol};
use crate::profile::{Band, FrequencyProfile};
use crate::written::WORD_GAP;
use crate::MIN_DECIBELS;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Onset events kept for display
const HISTORY_LEN: usize = 30;

/// One spectrum snapshot: power in dB for bins spaced `bin_width` Hz apart, bin 0 at DC
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionFrame {
    pub bin_width: f32,
    pub powers: Vec<f32>,
}

impl DetectionFrame {
    pub fn new(bin_width: f32, powers: Vec<f32>) -> Self {
        Self { bin_width, powers }
    }

    /// A frame with every bin at the analyser floor
    pub fn silent(bins: usize, bin_width: f32) -> Self {
        Self::new(bin_width, vec![MIN_DECIBELS; bins])
    }

    /// Set the bin nearest `freq` to `power_db`
    pub fn with_tone(mut self, freq: f32, power_db: f32) -> Self {
        if let Some(idx) = self.bin_index(freq) {
            self.powers[idx] = power_db;
        }
        self
    }

    pub fn frequency_of(&self, bin: usize) -> f32 {
        bin as f32 * self.bin_width
    }

    fn bin_index(&self, freq: f32) -> Option<usize> {
        if self.bin_width <= 0.0 || freq < 0.0 {
            return None;
        }
        let idx = (freq / self.bin_width).round() as usize;
        (idx < self.powers.len()).then_some(idx)
    }

    /// Power of the bin nearest `freq`, or the floor when it is out of range
    pub fn power_at(&self, freq: f32) -> f32 {
        self.bin_index(freq)
            .map(|idx| self.powers[idx])
            .unwrap_or(MIN_DECIBELS)
    }

    /// Loudest bin at or above `from_bin` as (frequency, power). Ties keep the lowest bin.
    pub fn peak(&self, from_bin: usize) -> Option<(f32, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, &power) in self.powers.iter().enumerate().skip(from_bin) {
            if best.map_or(true, |(_, p)| power > p) {
                best = Some((idx, power));
            }
        }
        best.map(|(idx, power)| (self.frequency_of(idx), power))
    }
}

/// Supplies frames to a receiver; `None` ends the session
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<DetectionFrame>;
}

impl<I: Iterator<Item = DetectionFrame>> FrameSource for I {
    fn next_frame(&mut self) -> Option<DetectionFrame> {
        self.next()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemodulatorConfig {
    /// Peak power (dB) above which a tone counts as present
    pub threshold_db: f32,
    /// Silent ticks after which the same tone may be recorded again (strictly more than this)
    pub release_ticks: u32,
    /// Silent ticks at which the buffered tones are flushed as one word
    pub flush_ticks: u32,
    /// Bins below this index (DC and rumble) are ignored by the peak search
    pub min_bin: usize,
    /// Recover long symbols from tone run length
    pub classify_durations: bool,
    /// Ticks a tone must last to count as long when `classify_durations` is set
    pub long_tone_ticks: u32,
}

impl Default for DemodulatorConfig {
    fn default() -> Self {
        Self {
            threshold_db: -40.0,
            release_ticks: 5,
            flush_ticks: 15,
            min_bin: 5,
            classify_durations: false,
            long_tone_ticks: 14,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// Nothing buffered
    Idle,
    /// A band was just heard; repeats of it are ignored until released
    ToneActive(Band),
    /// Tone released, letters buffered until the word boundary
    Flushing,
}

/// Level of one profile frequency on a `0..=100`-ish scale (dB above the floor)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandLevel {
    pub band: Band,
    pub frequency: f32,
    pub level: f32,
}

/// A recorded tone onset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedTone {
    pub band: Band,
    /// Peak frequency at onset, rounded to whole Hz
    pub frequency: f32,
    /// Ticks the tone has been held so far
    pub ticks: u32,
}

impl DetectedTone {
    /// Written-form letter for this tone, uppercase when `config` classifies it as long
    pub fn letter(&self, config: &DemodulatorConfig) -> char {
        if config.classify_durations && self.ticks >= config.long_tone_ticks {
            if let Some(symbol) = Symbol::for_band(self.band, DurationClass::Long) {
                return symbol.letter;
            }
        }
        self.band.letter()
    }
}

/// What one tick produced
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub levels: [BandLevel; 5],
    /// Loudest (frequency, power) in the frame
    pub peak: Option<(f32, f32)>,
    pub detected: Option<DetectedTone>,
    /// Word flushed on this tick, without the separating space
    pub flushed: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Demodulator {
    profile: FrequencyProfile,
    config: DemodulatorConfig,
    state: ReceiverState,
    silence: u32,
    tone_buffer: Vec<DetectedTone>,
    history: VecDeque<DetectedTone>,
    output: String,
}

impl Demodulator {
    pub fn new(profile: &FrequencyProfile, config: DemodulatorConfig) -> Self {
        Self {
            profile: *profile,
            config,
            state: ReceiverState::Idle,
            silence: 0,
            tone_buffer: Vec::new(),
            history: VecDeque::with_capacity(HISTORY_LEN),
            output: String::new(),
        }
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn config(&self) -> &DemodulatorConfig {
        &self.config
    }

    /// Written form received so far (flushed words only)
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Most recent onsets, oldest first
    pub fn history(&self) -> impl Iterator<Item = &DetectedTone> {
        self.history.iter()
    }

    /// Tones heard since the last word boundary
    pub fn pending(&self) -> &[DetectedTone] {
        &self.tone_buffer
    }

    /// Letters the pending tones will flush as, using the same rules as the flush itself
    pub fn pending_word(&self) -> String {
        self.tone_buffer
            .iter()
            .map(|tone| tone.letter(&self.config))
            .collect()
    }

    pub fn tick(&mut self, frame: &DetectionFrame) -> TickOutcome {
        let levels = Band::ALL.map(|band| {
            let frequency = self.profile.frequency(band);
            BandLevel {
                band,
                frequency,
                level: (frame.power_at(frequency) - MIN_DECIBELS).max(0.0),
            }
        });

        let peak = frame.peak(self.config.min_bin);
        let mut detected = None;
        let mut flushed = None;

        match peak {
            Some((freq, power)) if power > self.config.threshold_db => {
                match self.profile.classify(freq) {
                    Some(band) => detected = self.on_tone(band, freq),
                    None => log::trace!("peak {:.1} Hz at {:.1} dB outside every bin", freq, power),
                }
            }
            _ => flushed = self.on_silence(),
        }

        TickOutcome {
            levels,
            peak,
            detected,
            flushed,
        }
    }

    fn on_tone(&mut self, band: Band, freq: f32) -> Option<DetectedTone> {
        self.silence = 0;
        if self.state == ReceiverState::ToneActive(band) {
            if let Some(current) = self.tone_buffer.last_mut().filter(|t| t.band == band) {
                current.ticks += 1;
            }
            return None;
        }

        self.state = ReceiverState::ToneActive(band);
        let tone = DetectedTone {
            band,
            frequency: freq.round(),
            ticks: 1,
        };
        log::trace!("onset {} at {} Hz", band, tone.frequency);
        self.tone_buffer.push(tone);
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(tone);
        Some(tone)
    }

    fn on_silence(&mut self) -> Option<String> {
        self.silence = self.silence.saturating_add(1);

        if self.silence > self.config.release_ticks {
            if let ReceiverState::ToneActive(_) = self.state {
                self.state = ReceiverState::Flushing;
            }
        }

        if self.silence == self.config.flush_ticks && !self.tone_buffer.is_empty() {
            let word = self.flush();
            if self.state == ReceiverState::Flushing {
                self.state = ReceiverState::Idle;
            }
            return Some(word);
        }
        None
    }

    fn flush(&mut self) -> String {
        let word: String = self
            .tone_buffer
            .drain(..)
            .map(|tone| tone.letter(&self.config))
            .collect();
        if !self.output.is_empty() {
            self.output.push(WORD_GAP);
        }
        self.output.push_str(&word);
        log::debug!("word boundary: {:?}", word);
        word
    }

    /// End of input: flush whatever is buffered and return the full written form
    pub fn finish(mut self) -> String {
        if !self.tone_buffer.is_empty() {
            self.flush();
        }
        self.output
    }

    /// Stop now: pending tones are discarded, flushed words are returned
    pub fn cancel(self) -> String {
        if !self.tone_buffer.is_empty() {
            log::debug!("receiver stopped, dropping {} pending tone(s)", self.tone_buffer.len());
        }
        self.output
    }
}

/// Why [`ReceiverSession::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    Exhausted,
    Stopped,
}

/// A receiver bound to a frame source for its whole lifetime.
///
/// The source (and whatever device handle it wraps) is owned by the session and released when
/// the session is finished, cancelled or dropped.
pub struct ReceiverSession<S: FrameSource> {
    source: S,
    demodulator: Demodulator,
    stop: Arc<AtomicBool>,
    ticks: u64,
}

impl<S: FrameSource> ReceiverSession<S> {
    pub fn new(source: S, demodulator: Demodulator) -> Self {
        Self {
            source,
            demodulator,
            stop: Arc::new(AtomicBool::new(false)),
            ticks: 0,
        }
    }

    /// Flag that ends [`run`](Self::run) before the next frame is read
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn demodulator(&self) -> &Demodulator {
        &self.demodulator
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Poll frames until the source runs dry or the stop flag is raised
    pub fn run<F: FnMut(&TickOutcome)>(&mut self, mut on_tick: F) -> RunEnd {
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return RunEnd::Stopped;
            }
            let Some(frame) = self.source.next_frame() else {
                return RunEnd::Exhausted;
            };
            let outcome = self.demodulator.tick(&frame);
            self.ticks += 1;
            on_tick(&outcome);
        }
    }

    /// Graceful end: flush pending tones and release the source
    pub fn finish(self) -> String {
        log::debug!("receiver finished after {} tick(s)", self.ticks);
        self.demodulator.finish()
    }

    /// Immediate stop: pending tones are lost, the source is released
    pub fn cancel(self) -> String {
        self.demodulator.cancel()
    }
}
