// End-to-end checks across the whole codec: text -> written form -> tones -> WAV -> spectrum
// frames -> demodulator -> written form -> text.
//
// The receive tests render a full second of audio per word and run a 4096-point FFT for every
// tick, so they are noticeably faster in release mode:
//   cargo test -p tonalpulse-core --test integration_test --release

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::collections::HashSet;
use std::io::Cursor;
use tonalpulse_core::{
    estimate_duration, read_wav, render, serialize, synth, DemodulatorConfig, Prefix, Preset,
    ReceiverSession, RunEnd, SampleFrameSource, TonalPulse, EXAMPLE_PHRASES, SAMPLE_RATE,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn codec() -> TonalPulse {
    TonalPulse::with_preset(Preset::Bright).expect("standard tables are valid")
}

/// Render each written word separately with a second of silence after it, so every word
/// boundary is well past the flush threshold
fn render_words(codec: &TonalPulse, words: &[&str]) -> Vec<f32> {
    let mut samples = Vec::new();
    for word in words {
        samples.extend(codec.render_samples(word, SAMPLE_RATE));
        samples.extend(std::iter::repeat(0.0).take(SAMPLE_RATE as usize));
    }
    samples
}

#[test]
fn test_every_word_round_trips() {
    let codec = codec();
    for entry in codec.vocabulary().entries() {
        for prefix in Prefix::ALL {
            let encoded = codec.encode(entry.word, prefix);
            assert!(encoded.unknown.is_empty(), "{} reported unknown", entry.word);
            let decoded = codec.decode(&encoded.written);
            assert_eq!(decoded, format!("[{}] {}", prefix.label(), entry.word));
        }
    }
}

#[test]
fn test_codes_are_unique() {
    let codec = codec();
    let mut seen = HashSet::new();
    for entry in codec.vocabulary().entries() {
        assert_eq!(entry.code.len(), 3, "{} has code {}", entry.word, entry.code);
        assert!(seen.insert(entry.code), "code {} reused by {}", entry.code, entry.word);
    }
    assert_eq!(seen.len(), codec.vocabulary().len());
}

#[test]
fn test_example_phrases_encode() {
    let codec = codec();
    for phrase in EXAMPLE_PHRASES {
        let encoded = codec.encode(phrase, Prefix::Command);
        assert!(encoded.matched > 0, "{} matched nothing", phrase);
        assert!(encoded.written.starts_with("a/ "));
    }

    // "I" is not in the vocabulary
    let encoded = codec.encode("you know what I want", Prefix::Question);
    assert_eq!(encoded.unknown, vec!["i".to_string()]);
    assert_eq!(encoded.matched, 4);
    assert!(encoded.written.starts_with("e/ "));
    assert!(codec.decode(&encoded.written).starts_with("[Question] you know what"));
}

#[test]
fn test_estimate_matches_synthesis() {
    for preset in Preset::ALL {
        let codec = TonalPulse::with_preset(preset).unwrap();
        for phrase in EXAMPLE_PHRASES {
            let written = codec.encode(phrase, Prefix::Command).written;
            let synthesis = codec.synthesizer().synthesize(&written);
            assert!(
                (synthesis.total_duration - estimate_duration(&written)).abs() < 1e-9,
                "{}: {} vs {}",
                written,
                synthesis.total_duration,
                estimate_duration(&written)
            );
        }
    }
    // link tones count like symbols
    let linked = "a/ eAa ~ aEa";
    assert!(estimate_duration(linked) > estimate_duration("a/ eAa aEa"));
}

#[test]
fn test_wav_header_and_read_back() {
    let codec = codec();
    let written = codec.encode("motor start left fast", Prefix::Command).written;
    let synthesis = codec.synthesizer().synthesize(&written);
    let samples = render(&synthesis.events, SAMPLE_RATE, synthesis.total_duration);
    assert_eq!(
        samples.len(),
        synth::buffer_len(synthesis.total_duration, SAMPLE_RATE)
    );

    let bytes = serialize(&samples, SAMPLE_RATE);
    assert_eq!(bytes.len(), 44 + samples.len() * 2);
    assert_eq!(
        u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]) as usize,
        samples.len() * 2
    );

    let reader = hound::WavReader::new(Cursor::new(bytes.clone())).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len() as usize, samples.len());

    let audio = read_wav(Cursor::new(bytes)).unwrap();
    let peak = audio.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    assert!(peak > 0.35 && peak <= 0.4 + 1e-3, "peak {}", peak);
}

#[test]
fn test_receive_distinct_bands() {
    init_logging();
    let codec = codec();
    let samples = render_words(&codec, &["aei"]);
    let heard = codec
        .receive_samples(samples, SAMPLE_RATE, DemodulatorConfig::default())
        .unwrap();
    assert_eq!(heard, "aei");
}

#[test]
fn test_receive_two_words() {
    init_logging();
    let codec = codec();
    let samples = render_words(&codec, &["aei", "oia"]);
    let heard = codec
        .receive_samples(samples, SAMPLE_RATE, DemodulatorConfig::default())
        .unwrap();
    assert_eq!(heard, "aei oia");
}

#[test]
fn test_receive_through_wav_file() {
    init_logging();
    let codec = TonalPulse::with_preset(Preset::Warm).unwrap();
    let bytes = serialize(&render_words(&codec, &["oie"]), SAMPLE_RATE);
    let audio = read_wav(Cursor::new(bytes)).unwrap();
    let heard = codec
        .receive_samples(audio.samples, audio.sample_rate, DemodulatorConfig::default())
        .unwrap();
    assert_eq!(heard, "oie");
}

#[test]
fn test_receive_with_noise() {
    init_logging();
    let codec = codec();
    let mut samples = render_words(&codec, &["eio", "aoe"]);

    let mut rng = StdRng::seed_from_u64(7);
    let noise = Normal::new(0.0f32, 0.02).unwrap();
    for s in samples.iter_mut() {
        *s += noise.sample(&mut rng);
    }

    let heard = codec
        .receive_samples(samples, SAMPLE_RATE, DemodulatorConfig::default())
        .unwrap();
    assert_eq!(heard, "eio aoe");
}

#[test]
fn test_receiver_session_stops() {
    let codec = codec();
    let samples = render_words(&codec, &["aei"]);
    let source = SampleFrameSource::with_defaults(samples, SAMPLE_RATE).unwrap();
    let mut session = ReceiverSession::new(source, codec.demodulator(DemodulatorConfig::default()));

    let stop = session.stop_handle();
    let mut onsets = 0;
    let end = session.run(|outcome| {
        if outcome.detected.is_some() {
            onsets += 1;
            if onsets == 2 {
                stop.store(true, std::sync::atomic::Ordering::Relaxed);
            }
        }
    });
    assert_eq!(end, RunEnd::Stopped);
    // two letters were buffered but cancelling discards them
    assert_eq!(session.cancel(), "");
}

#[test]
fn test_silence_produces_nothing() {
    let codec = codec();
    let heard = codec
        .receive_samples(vec![0.0; SAMPLE_RATE as usize * 2], SAMPLE_RATE, DemodulatorConfig::default())
        .unwrap();
    assert_eq!(heard, "");
}
