//! Analyser-style spectrum frames from PCM
//!
//! Mirrors what a Web Audio `AnalyserNode` reports: Blackman window, magnitude normalized by
//! the FFT size, exponential smoothing across frames, decibels floored at [`MIN_DECIBELS`].
//! This lets recorded audio run through the same receiver as a live browser capture.

use crate::demod::DetectionFrame;
use crate::error::{Result, TonalPulseError};
use crate::{FFT_SIZE, MIN_DECIBELS, SMOOTHING_TIME_CONSTANT, TICK_HOP_SAMPLES};
use realfft::{RealFftPlanner, RealToComplex};
use std::f32::consts::PI;
use std::sync::Arc;

/// Blackman window as specified for the Web Audio analyser (alpha = 0.16)
fn blackman_window(len: usize) -> Vec<f32> {
    let a0 = 0.42;
    let a1 = 0.5;
    let a2 = 0.08;
    (0..len)
        .map(|n| {
            let x = n as f32 / len as f32;
            a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
        })
        .collect()
}

pub struct SpectrumAnalyzer {
    fft_size: usize,
    sample_rate: u32,
    smoothing: f32,
    window: Vec<f32>,
    r2c: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<realfft::num_complex::Complex<f32>>,
    smoothed: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new(sample_rate: u32, fft_size: usize, smoothing: f32) -> Result<Self> {
        if fft_size < 32 || !fft_size.is_power_of_two() {
            return Err(TonalPulseError::FftError(format!(
                "FFT size must be a power of two >= 32, got {}",
                fft_size
            )));
        }
        if sample_rate == 0 {
            return Err(TonalPulseError::FftError("sample rate must be non-zero".to_string()));
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let r2c = planner.plan_fft_forward(fft_size);
        let input = r2c.make_input_vec();
        let spectrum = r2c.make_output_vec();

        Ok(Self {
            fft_size,
            sample_rate,
            smoothing: smoothing.clamp(0.0, 1.0),
            window: blackman_window(fft_size),
            r2c,
            input,
            spectrum,
            smoothed: vec![0.0; fft_size / 2],
        })
    }

    /// Analyser with the browser defaults used by the receiver
    pub fn with_defaults(sample_rate: u32) -> Result<Self> {
        Self::new(sample_rate, FFT_SIZE, SMOOTHING_TIME_CONSTANT)
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bin_width(&self) -> f32 {
        self.sample_rate as f32 / self.fft_size as f32
    }

    /// Analyse the most recent `fft_size` samples of `recent` (zero-padded in front if shorter)
    pub fn analyze(&mut self, recent: &[f32]) -> Result<DetectionFrame> {
        let take = recent.len().min(self.fft_size);
        let offset = self.fft_size - take;
        self.input[..offset].fill(0.0);
        self.input[offset..].copy_from_slice(&recent[recent.len() - take..]);
        for (sample, w) in self.input.iter_mut().zip(self.window.iter()) {
            *sample *= w;
        }

        self.r2c
            .process(&mut self.input, &mut self.spectrum)
            .map_err(|e| TonalPulseError::FftError(format!("forward FFT failed: {:?}", e)))?;

        let scale = 1.0 / self.fft_size as f32;
        let tau = self.smoothing;
        let powers = self
            .smoothed
            .iter_mut()
            .zip(self.spectrum.iter())
            .map(|(prev, bin)| {
                *prev = tau * *prev + (1.0 - tau) * bin.norm() * scale;
                if *prev > 0.0 {
                    (20.0 * prev.log10()).max(MIN_DECIBELS)
                } else {
                    MIN_DECIBELS
                }
            })
            .collect();

        Ok(DetectionFrame::new(self.bin_width(), powers))
    }

    /// Forget smoothing history
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }
}

/// Frames taken from a PCM buffer every `hop` samples, like a render loop polling an analyser
pub struct SampleFrameSource {
    samples: Vec<f32>,
    analyzer: SpectrumAnalyzer,
    hop: usize,
    position: usize,
}

impl SampleFrameSource {
    pub fn new(samples: Vec<f32>, analyzer: SpectrumAnalyzer, hop: usize) -> Self {
        Self {
            samples,
            analyzer,
            hop: hop.max(1),
            position: 0,
        }
    }

    /// Default analyser and ~60 ticks per second at 44.1 kHz
    pub fn with_defaults(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        let analyzer = SpectrumAnalyzer::with_defaults(sample_rate)?;
        let hop = (TICK_HOP_SAMPLES as u64 * sample_rate as u64 / 44100).max(1) as usize;
        Ok(Self::new(samples, analyzer, hop))
    }

    /// Frames this source will produce in total
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.hop
    }
}

impl Iterator for SampleFrameSource {
    type Item = DetectionFrame;

    fn next(&mut self) -> Option<DetectionFrame> {
        let end = self.position + self.hop;
        if end > self.samples.len() {
            return None;
        }
        self.position = end;
        let start = end.saturating_sub(self.analyzer.fft_size());
        match self.analyzer.analyze(&self.samples[start..end]) {
            Ok(frame) => Some(frame),
            Err(e) => {
                log::warn!("spectrum analysis stopped: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amplitude: f32, len: usize, sample_rate: u32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_rejects_bad_fft_size() {
        assert!(SpectrumAnalyzer::new(44100, 1000, 0.3).is_err());
        assert!(SpectrumAnalyzer::new(44100, 16, 0.3).is_err());
        assert!(SpectrumAnalyzer::new(0, 4096, 0.3).is_err());
    }

    #[test]
    fn test_window_shape() {
        let w = blackman_window(64);
        assert!(w[0].abs() < 1e-6);
        assert!((w[32] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_peak_at_tone_frequency() {
        let mut analyzer = SpectrumAnalyzer::new(44100, 4096, 0.0).unwrap();
        let frame = analyzer.analyze(&sine(1000.0, 0.4, 4096, 44100)).unwrap();
        assert_eq!(frame.powers.len(), 2048);
        let (freq, power) = frame.peak(5).unwrap();
        assert!((freq - 1000.0).abs() < frame.bin_width, "peak at {}", freq);
        // 0.4 amplitude through a Blackman window is roughly -21.5 dB
        assert!(power > -25.0 && power < -18.0, "power {}", power);
    }

    #[test]
    fn test_silence_reports_floor() {
        let mut analyzer = SpectrumAnalyzer::with_defaults(44100).unwrap();
        let frame = analyzer.analyze(&vec![0.0; 4096]).unwrap();
        assert!(frame.powers.iter().all(|&p| p == MIN_DECIBELS));
    }

    #[test]
    fn test_smoothing_decays() {
        let mut analyzer = SpectrumAnalyzer::with_defaults(44100).unwrap();
        let loud = analyzer.analyze(&sine(700.0, 0.4, 4096, 44100)).unwrap();
        let p0 = loud.power_at(700.0);
        let after = analyzer.analyze(&vec![0.0; 4096]).unwrap();
        let p1 = after.power_at(700.0);
        // one silent frame keeps 30% of the magnitude: about -10.5 dB
        assert!((p0 - p1 - 10.46).abs() < 0.1, "{} -> {}", p0, p1);
        analyzer.reset();
        let fresh = analyzer.analyze(&vec![0.0; 4096]).unwrap();
        assert_eq!(fresh.power_at(700.0), MIN_DECIBELS);
    }

    #[test]
    fn test_short_input_zero_padded() {
        let mut analyzer = SpectrumAnalyzer::new(44100, 1024, 0.0).unwrap();
        let frame = analyzer.analyze(&sine(2000.0, 0.5, 300, 44100)).unwrap();
        assert_eq!(frame.powers.len(), 512);
    }

    #[test]
    fn test_sample_source_hops() {
        let samples = vec![0.0; 44100];
        let source = SampleFrameSource::with_defaults(samples, 44100).unwrap();
        assert_eq!(source.frame_count(), 60);
        assert_eq!(source.count(), 60);
    }
}
