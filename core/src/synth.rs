use crate::alphabet::{DurationClass, Symbol, SymbolTable};
use crate::profile::{Band, FrequencyProfile};
use crate::written::{parse, Token, LINK};
use crate::{
    FADE_MS, GAP_SYMBOL_MS, GAP_WORD_MS, LEAD_IN_MS, LINK_AMPLITUDE, SYMBOL_AMPLITUDE,
    TRAILING_PAD_MS,
};
use std::f64::consts::PI;

/// One scheduled tone: a sine at `frequency` with a linear fade in, plateau, and fade out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneEvent {
    /// Written character this tone realizes (`~` for the link tone)
    pub symbol: char,
    pub band: Band,
    pub frequency: f32,
    /// Seconds from the start of the transmission
    pub start: f64,
    /// Seconds
    pub duration: f64,
    pub amplitude: f32,
    /// Length of each linear ramp in seconds
    pub fade: f64,
}

impl ToneEvent {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Envelope gain at `t` seconds after the tone starts
    pub fn gain_at(&self, t: f64) -> f32 {
        if t < 0.0 || t > self.duration {
            return 0.0;
        }
        let fade = self.fade.min(self.duration / 2.0);
        let amp = self.amplitude as f64;
        let gain = if fade <= 0.0 {
            amp
        } else if t < fade {
            amp * t / fade
        } else if t > self.duration - fade {
            amp * (self.duration - t) / fade
        } else {
            amp
        };
        gain as f32
    }
}

/// Output of one synthesis pass
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub events: Vec<ToneEvent>,
    /// Seconds, including lead-in and trailing pad
    pub total_duration: f64,
}

impl Synthesis {
    /// Hand every event to `sink`, offset by `base_time` on the sink's clock
    pub fn play_into<S: ToneSink>(&self, sink: &mut S, base_time: f64) -> Result<(), S::Error> {
        for event in &self.events {
            sink.schedule(base_time + event.start, event)?;
        }
        Ok(())
    }
}

/// Something that can emit a tone at an absolute time (an audio device, a scheduler)
pub trait ToneSink {
    type Error;

    fn schedule(&mut self, start_time: f64, event: &ToneEvent) -> Result<(), Self::Error>;
}

/// Timing-only view of a tone, produced by the shared walker
struct Slot {
    symbol: char,
    band: Band,
    start_ms: u32,
    duration_ms: u32,
}

/// Walk tokens with the timing rules; returns the cursor after the last token (ms).
/// Used by both synthesis and the duration estimator so the two cannot drift apart.
fn walk<F: FnMut(Slot)>(tokens: &[Token], mut emit: F) -> u32 {
    let mut cursor = LEAD_IN_MS;
    for token in tokens {
        match *token {
            Token::Symbol(c) => {
                let Some(symbol) = Symbol::from_char(c) else {
                    continue;
                };
                let duration_ms = symbol.duration.millis();
                emit(Slot {
                    symbol: c,
                    band: symbol.band,
                    start_ms: cursor,
                    duration_ms,
                });
                cursor += duration_ms + GAP_SYMBOL_MS;
            }
            Token::WordGap => cursor += GAP_WORD_MS,
            Token::Link => {
                let duration_ms = DurationClass::Short.millis();
                emit(Slot {
                    symbol: LINK,
                    band: Band::Link,
                    start_ms: cursor,
                    duration_ms,
                });
                cursor += duration_ms + GAP_WORD_MS;
            }
            Token::Prefix => cursor += GAP_SYMBOL_MS,
        }
    }
    cursor
}

/// Total signal length in seconds, without synthesizing anything
pub fn estimate_duration(written: &str) -> f64 {
    let end = walk(&parse(written), |_| {});
    ms_to_secs(end + TRAILING_PAD_MS)
}

fn ms_to_secs(ms: u32) -> f64 {
    ms as f64 / 1000.0
}

/// Turns written forms into timed tone events for one frequency profile
#[derive(Debug, Clone)]
pub struct Synthesizer {
    symbols: SymbolTable,
    link_frequency: f32,
}

impl Synthesizer {
    pub fn new(profile: &FrequencyProfile) -> Self {
        Self {
            symbols: SymbolTable::new(profile),
            link_frequency: profile.link_frequency(),
        }
    }

    pub fn synthesize(&self, written: &str) -> Synthesis {
        let tokens = parse(written);
        let mut events = Vec::with_capacity(tokens.len());

        let end = walk(&tokens, |slot| {
            let (frequency, amplitude) = if slot.band == Band::Link {
                (self.link_frequency, LINK_AMPLITUDE)
            } else {
                // the walker only yields alphabet letters for non-link slots
                let frequency = self
                    .symbols
                    .get(slot.symbol)
                    .map(|t| t.frequency)
                    .unwrap_or(0.0);
                (frequency, SYMBOL_AMPLITUDE)
            };
            events.push(ToneEvent {
                symbol: slot.symbol,
                band: slot.band,
                frequency,
                start: ms_to_secs(slot.start_ms),
                duration: ms_to_secs(slot.duration_ms),
                amplitude,
                fade: ms_to_secs(FADE_MS),
            });
        });

        let total_duration = ms_to_secs(end + TRAILING_PAD_MS);
        log::debug!(
            "synthesized {} tone(s), {:.3}s total",
            events.len(),
            total_duration
        );
        Synthesis {
            events,
            total_duration,
        }
    }
}

/// Number of samples needed to hold `duration` seconds
pub fn buffer_len(duration: f64, sample_rate: u32) -> usize {
    (duration * sample_rate as f64).ceil() as usize
}

/// Render tone events into a mono PCM buffer of `ceil(sample_rate * total_duration)` samples.
/// Each tone starts at phase zero, like a freshly started oscillator.
pub fn render(events: &[ToneEvent], sample_rate: u32, total_duration: f64) -> Vec<f32> {
    let len = buffer_len(total_duration, sample_rate);
    let mut samples = vec![0.0f32; len];
    let sr = sample_rate as f64;

    for event in events {
        let first = (event.start * sr).round() as usize;
        let count = (event.duration * sr).round() as usize;
        let omega = 2.0 * PI * event.frequency as f64;

        for i in 0..count {
            let Some(sample) = samples.get_mut(first + i) else {
                break;
            };
            let t = i as f64 / sr;
            *sample += event.gain_at(t) * (omega * t).sin() as f32;
        }
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Preset;

    fn synth() -> Synthesizer {
        Synthesizer::new(&Preset::Bright.profile())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_single_short_symbol() {
        let s = synth().synthesize("a");
        assert_eq!(s.events.len(), 1);
        let e = s.events[0];
        assert_eq!(e.frequency, 400.0);
        assert!(approx(e.start, 0.05));
        assert!(approx(e.duration, 0.1));
        assert_eq!(e.amplitude, SYMBOL_AMPLITUDE);
        // 50 lead + 100 tone + 50 gap + 300 pad
        assert!(approx(s.total_duration, 0.5));
    }

    #[test]
    fn test_prefixed_word_timing() {
        // a / gap gap A i
        let s = synth().synthesize("a/ Ai");
        let starts: Vec<f64> = s.events.iter().map(|e| e.start).collect();
        assert_eq!(s.events.len(), 3);
        assert!(approx(starts[0], 0.05));
        // 0.05 + 0.1 + 0.05 (gap) + 0.05 (prefix) + 0.2 + 0.2 (two word gaps)
        assert!(approx(starts[1], 0.65));
        assert_eq!(s.events[1].symbol, 'A');
        assert!(approx(s.events[1].duration, 0.2));
        assert!(approx(starts[2], 0.9));
        assert_eq!(s.events[2].frequency, 1000.0);
        // 0.9 + 0.1 + 0.05 + 0.3
        assert!(approx(s.total_duration, 1.35));
    }

    #[test]
    fn test_link_tone() {
        let s = synth().synthesize("~o");
        assert_eq!(s.events[0].symbol, '~');
        assert_eq!(s.events[0].band, Band::Link);
        assert_eq!(s.events[0].frequency, 1600.0);
        assert_eq!(s.events[0].amplitude, LINK_AMPLITUDE);
        assert!(approx(s.events[0].duration, 0.1));
        // link advances by tone + word gap
        assert!(approx(s.events[1].start, 0.05 + 0.1 + 0.2));
    }

    #[test]
    fn test_empty_written_form() {
        let s = synth().synthesize("");
        assert!(s.events.is_empty());
        assert!(approx(s.total_duration, 0.35));
        assert!(approx(estimate_duration(""), 0.35));
    }

    #[test]
    fn test_estimate_matches_synthesis() {
        let synth = synth();
        for written in ["a/ aAi eAa iAa oEo", "ii/ aIe ~ OOo", "x?y", "//  ~~", "AEIO aeio"] {
            let s = synth.synthesize(written);
            assert!(
                approx(estimate_duration(written), s.total_duration),
                "duration mismatch for {:?}",
                written
            );
            let last_end = s.events.iter().map(|e| e.end()).fold(0.0, f64::max);
            assert!(last_end <= s.total_duration);
        }
    }

    #[test]
    fn test_envelope_shape() {
        let e = synth().synthesize("A").events[0];
        assert_eq!(e.gain_at(0.0), 0.0);
        assert!((e.gain_at(0.005) - 0.2).abs() < 1e-6);
        assert!((e.gain_at(0.01) - 0.4).abs() < 1e-6);
        assert!((e.gain_at(0.1) - 0.4).abs() < 1e-6);
        assert!((e.gain_at(0.195) - 0.2).abs() < 1e-4);
        assert!(e.gain_at(0.2).abs() < 1e-6);
        assert_eq!(e.gain_at(0.25), 0.0);
        assert_eq!(e.gain_at(-0.01), 0.0);
    }

    #[test]
    fn test_events_do_not_overlap() {
        let s = synth().synthesize("a/ aAi ~ OOo");
        for pair in s.events.windows(2) {
            assert!(pair[0].end() < pair[1].start);
        }
    }

    #[test]
    fn test_render_length_and_range() {
        let s = synth().synthesize("a/ eI");
        let samples = render(&s.events, 44100, s.total_duration);
        assert_eq!(samples.len(), buffer_len(s.total_duration, 44100));
        let peak = samples.iter().fold(0.0f32, |m, x| m.max(x.abs()));
        assert!(peak <= SYMBOL_AMPLITUDE + 1e-4);
        assert!(peak > 0.35);
        // lead-in is silent
        assert!(samples[..2000].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_render_no_clicks_at_edges() {
        let s = synth().synthesize("o");
        let samples = render(&s.events, 44100, s.total_duration);
        let start = (0.05 * 44100.0) as usize;
        // first millisecond of the ramp stays well under the plateau level
        let early = samples[start..start + 44].iter().fold(0.0f32, |m, x| m.max(x.abs()));
        assert!(early < 0.05);
    }

    struct Recorder(Vec<(f64, char)>);

    impl ToneSink for Recorder {
        type Error = ();

        fn schedule(&mut self, start_time: f64, event: &ToneEvent) -> Result<(), ()> {
            self.0.push((start_time, event.symbol));
            Ok(())
        }
    }

    #[test]
    fn test_play_into_offsets_by_base_time() {
        let s = synth().synthesize("ae");
        let mut sink = Recorder(Vec::new());
        s.play_into(&mut sink, 10.0).unwrap();
        assert_eq!(sink.0.len(), 2);
        assert!(approx(sink.0[0].0, 10.05));
        assert_eq!(sink.0[1].1, 'e');
        assert!(approx(sink.0[1].0, 10.2));
    }
}
