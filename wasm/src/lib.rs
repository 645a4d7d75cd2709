use js_sys::{Array, Object, Reflect};
use tonalpulse_core::{
    estimate_duration, export_file_name, DemodulatorConfig, Demodulator, DetectionFrame, Prefix,
    Preset, TickOutcome, ToneEvent, ToneSink, TonalPulse, FFT_SIZE, MIN_DECIBELS, SAMPLE_RATE,
    SMOOTHING_TIME_CONSTANT,
};
use wasm_bindgen::prelude::*;
use web_sys::{AnalyserNode, AudioContext, OscillatorType};

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Absolute (attack end, release start, stop) times of a tone scheduled at `start_time`
fn envelope_times(start_time: f64, event: &ToneEvent) -> [f64; 3] {
    let end = start_time + event.duration;
    let fade = event.fade.min(event.duration / 2.0);
    [start_time + fade, end - fade, end]
}

/// Schedules tone events as oscillator + gain pairs on an `AudioContext`
struct WebAudioSink<'a> {
    ctx: &'a AudioContext,
}

impl ToneSink for WebAudioSink<'_> {
    type Error = JsValue;

    fn schedule(&mut self, start_time: f64, event: &ToneEvent) -> Result<(), JsValue> {
        let [attack_end, release_start, end] = envelope_times(start_time, event);

        let osc = self.ctx.create_oscillator()?;
        osc.set_type(OscillatorType::Sine);
        osc.frequency().set_value_at_time(event.frequency, start_time)?;

        let gain = self.ctx.create_gain()?;
        let level = gain.gain();
        level.set_value_at_time(0.0, start_time)?;
        level.linear_ramp_to_value_at_time(event.amplitude, attack_end)?;
        level.set_value_at_time(event.amplitude, release_start)?;
        level.linear_ramp_to_value_at_time(0.0, end)?;

        osc.connect_with_audio_node(&gain)?;
        gain.connect_with_audio_node(&self.ctx.destination())?;
        osc.start_with_when(start_time)?;
        osc.stop_with_when(end)?;
        Ok(())
    }
}

#[wasm_bindgen]
pub struct EncodeResult {
    written: String,
    unknown: Vec<String>,
    matched: usize,
    duration: f64,
}

#[wasm_bindgen]
impl EncodeResult {
    pub fn written(&self) -> String {
        self.written.clone()
    }

    /// Words that have no code (Array of strings)
    pub fn unknown(&self) -> Array {
        self.unknown.iter().map(|w| JsValue::from_str(w)).collect()
    }

    pub fn matched(&self) -> usize {
        self.matched
    }

    /// Seconds of audio the written form will take
    pub fn duration(&self) -> f64 {
        self.duration
    }
}

#[wasm_bindgen]
pub struct WasmTonalPulse {
    inner: TonalPulse,
}

#[wasm_bindgen]
impl WasmTonalPulse {
    /// Create a codec for a named preset (bright, warm, deep, subsonic, scifi)
    #[wasm_bindgen(constructor)]
    pub fn new(preset: &str) -> Result<WasmTonalPulse, JsValue> {
        let preset: Preset = preset.parse().map_err(js_err)?;
        TonalPulse::with_preset(preset)
            .map(|inner| WasmTonalPulse { inner })
            .map_err(js_err)
    }

    /// Custom profile: five ascending frequencies (LOW, MID, HIGH, TOP, LINK)
    pub fn with_frequencies(frequencies: &[f32]) -> Result<WasmTonalPulse, JsValue> {
        let frequencies: [f32; 5] = frequencies
            .try_into()
            .map_err(|_| JsValue::from_str("expected exactly 5 frequencies"))?;
        let profile = tonalpulse_core::FrequencyProfile::new(frequencies).map_err(js_err)?;
        TonalPulse::new(profile)
            .map(|inner| WasmTonalPulse { inner })
            .map_err(js_err)
    }

    pub fn encode(&self, text: &str, prefix: &str) -> Result<EncodeResult, JsValue> {
        let prefix: Prefix = prefix.parse().map_err(js_err)?;
        let encoded = self.inner.encode(text, prefix);
        Ok(EncodeResult {
            duration: estimate_duration(&encoded.written),
            written: encoded.written,
            unknown: encoded.unknown,
            matched: encoded.matched,
        })
    }

    pub fn decode(&self, written: &str) -> String {
        self.inner.decode(written)
    }

    /// Tone timeline for highlighting: Array of `{ symbol, band, frequency, start, duration }`
    pub fn timeline(&self, written: &str) -> Result<Array, JsValue> {
        let synthesis = self.inner.synthesizer().synthesize(written);
        let out = Array::new();
        for event in &synthesis.events {
            let item = Object::new();
            Reflect::set(&item, &"symbol".into(), &event.symbol.to_string().into())?;
            Reflect::set(&item, &"band".into(), &event.band.label().into())?;
            Reflect::set(&item, &"frequency".into(), &event.frequency.into())?;
            Reflect::set(&item, &"start".into(), &event.start.into())?;
            Reflect::set(&item, &"duration".into(), &event.duration.into())?;
            out.push(&item);
        }
        Ok(out)
    }

    /// Schedule the transmission on `ctx` starting now; returns its length in seconds
    pub fn play(&self, ctx: &AudioContext, written: &str) -> Result<f64, JsValue> {
        let synthesis = self.inner.synthesizer().synthesize(written);
        let mut sink = WebAudioSink { ctx };
        synthesis.play_into(&mut sink, ctx.current_time())?;
        Ok(synthesis.total_duration)
    }

    /// 44.1 kHz 16-bit mono WAV bytes (Uint8Array)
    pub fn render_wav(&self, written: &str) -> Vec<u8> {
        self.inner.render_wav(written)
    }

    pub fn render_samples(&self, written: &str, sample_rate: u32) -> Vec<f32> {
        self.inner.render_samples(written, sample_rate)
    }

    /// Receiver bound to an analyser the page has already wired to its input
    pub fn receiver(
        &self,
        analyser: AnalyserNode,
        sample_rate: f32,
        classify_durations: bool,
    ) -> WasmReceiver {
        analyser.set_fft_size(FFT_SIZE as u32);
        analyser.set_smoothing_time_constant(SMOOTHING_TIME_CONSTANT as f64);
        analyser.set_min_decibels(MIN_DECIBELS as f64);

        let config = DemodulatorConfig {
            classify_durations,
            ..DemodulatorConfig::default()
        };
        WasmReceiver {
            buffer: vec![MIN_DECIBELS; analyser.frequency_bin_count() as usize],
            bin_width: sample_rate / FFT_SIZE as f32,
            analyser,
            demodulator: self.inner.demodulator(config),
            last: None,
        }
    }
}

/// Call `tick` once per animation frame while listening
#[wasm_bindgen]
pub struct WasmReceiver {
    analyser: AnalyserNode,
    buffer: Vec<f32>,
    bin_width: f32,
    demodulator: Demodulator,
    last: Option<TickOutcome>,
}

#[wasm_bindgen]
impl WasmReceiver {
    /// Read one analyser frame; returns the word flushed on this tick, if any
    pub fn tick(&mut self) -> Option<String> {
        self.analyser.get_float_frequency_data(&mut self.buffer);
        // -Infinity for silent bins
        for p in self.buffer.iter_mut() {
            if !p.is_finite() {
                *p = MIN_DECIBELS;
            }
        }
        let frame = DetectionFrame::new(self.bin_width, self.buffer.clone());
        let outcome = self.demodulator.tick(&frame);
        let flushed = outcome.flushed.clone();
        self.last = Some(outcome);
        flushed
    }

    /// Per-band levels (LOW, MID, HIGH, TOP, LINK) from the last tick, `0..=100`
    pub fn levels(&self) -> Vec<f32> {
        match &self.last {
            Some(outcome) => outcome.levels.iter().map(|l| l.level).collect(),
            None => vec![0.0; 5],
        }
    }

    /// Letter of the tone that started on the last tick
    pub fn detected(&self) -> Option<String> {
        let tone = self.last.as_ref()?.detected?;
        Some(format!(
            "{}:{}",
            tone.letter(self.demodulator.config()),
            tone.frequency
        ))
    }

    /// Words received so far
    pub fn output(&self) -> String {
        self.demodulator.output().to_string()
    }

    /// Letters heard since the last word boundary
    pub fn pending(&self) -> String {
        self.demodulator.pending_word()
    }

    /// Stop listening and keep the pending letters as a final word
    pub fn finish(self) -> String {
        self.demodulator.finish()
    }

    /// Stop listening and drop the pending letters
    pub fn cancel(self) -> String {
        self.demodulator.cancel()
    }
}

#[wasm_bindgen]
pub fn presets() -> Array {
    Preset::ALL
        .into_iter()
        .map(|p| JsValue::from_str(p.key()))
        .collect()
}

#[wasm_bindgen]
pub fn download_name(written: &str) -> String {
    export_file_name(written)
}

#[wasm_bindgen]
pub fn export_sample_rate() -> u32 {
    SAMPLE_RATE
}
