//! Canonical 44-byte-header PCM WAV output, and WAV input for the receiver

use crate::error::{Result, TonalPulseError};
use std::io::{self, Read, Write};

pub const WAV_HEADER_LEN: usize = 44;
const FMT_CHUNK_LEN: u32 = 16;
const FORMAT_PCM: u16 = 1;
const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const BLOCK_ALIGN: u16 = CHANNELS * BITS_PER_SAMPLE / 8;

/// Convert one float sample to 16-bit PCM.
/// Negative values scale by 32768 and positive by 32767, so both rails are reachable without overflow.
pub fn sample_to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Canonical header for `sample_count` mono 16-bit samples
pub fn header(sample_count: usize, sample_rate: u32) -> [u8; WAV_HEADER_LEN] {
    let data_len = (sample_count * BLOCK_ALIGN as usize) as u32;
    let byte_rate = sample_rate * BLOCK_ALIGN as u32;

    let mut h = [0u8; WAV_HEADER_LEN];
    // RIFF header
    h[0..4].copy_from_slice(b"RIFF");
    h[4..8].copy_from_slice(&(data_len + WAV_HEADER_LEN as u32 - 8).to_le_bytes());
    h[8..12].copy_from_slice(b"WAVE");

    // fmt chunk
    h[12..16].copy_from_slice(b"fmt ");
    h[16..20].copy_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    h[20..22].copy_from_slice(&FORMAT_PCM.to_le_bytes());
    h[22..24].copy_from_slice(&CHANNELS.to_le_bytes());
    h[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    h[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    h[32..34].copy_from_slice(&BLOCK_ALIGN.to_le_bytes());
    h[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data chunk
    h[36..40].copy_from_slice(b"data");
    h[40..44].copy_from_slice(&data_len.to_le_bytes());
    h
}

/// Write a mono 16-bit PCM WAV stream
pub fn write_wav<W: Write>(writer: &mut W, samples: &[f32], sample_rate: u32) -> io::Result<()> {
    writer.write_all(&header(samples.len(), sample_rate))?;
    for &sample in samples {
        writer.write_all(&sample_to_i16(sample).to_le_bytes())?;
    }
    Ok(())
}

/// Serialize samples into a complete WAV file in memory
pub fn serialize(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(WAV_HEADER_LEN + samples.len() * BLOCK_ALIGN as usize);
    bytes.extend_from_slice(&header(samples.len(), sample_rate));
    for &sample in samples {
        bytes.extend_from_slice(&sample_to_i16(sample).to_le_bytes());
    }
    bytes
}

/// Decoded audio: mono samples in [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct WavAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl WavAudio {
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Read a 16-bit integer or 32-bit float WAV, averaging channels down to mono
pub fn read_wav<R: Read>(reader: R) -> Result<WavAudio> {
    let mut reader = hound::WavReader::new(reader)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(TonalPulseError::InvalidWav("zero channels".to_string()));
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<std::result::Result<_, _>>()?,
        (hound::SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        (format, bits) => {
            return Err(TonalPulseError::UnsupportedWav(format!(
                "{:?} samples at {} bits",
                format, bits
            )))
        }
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    log::debug!(
        "read WAV: {} Hz, {} channel(s), {} mono samples",
        spec.sample_rate,
        channels,
        samples.len()
    );
    Ok(WavAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn u16_at(bytes: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([bytes[at], bytes[at + 1]])
    }

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    #[test]
    fn test_header_layout() {
        let samples = vec![0.0f32; 100];
        let bytes = serialize(&samples, 44100);

        assert_eq!(bytes.len(), 44 + 200);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32_at(&bytes, 4), 236);
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(u32_at(&bytes, 16), 16);
        assert_eq!(u16_at(&bytes, 20), 1);
        assert_eq!(u16_at(&bytes, 22), 1);
        assert_eq!(u32_at(&bytes, 24), 44100);
        assert_eq!(u32_at(&bytes, 28), 88200);
        assert_eq!(u16_at(&bytes, 32), 2);
        assert_eq!(u16_at(&bytes, 34), 16);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32_at(&bytes, 40), 200);
    }

    #[test]
    fn test_sample_scaling() {
        assert_eq!(sample_to_i16(1.0), 32767);
        assert_eq!(sample_to_i16(-1.0), -32768);
        assert_eq!(sample_to_i16(0.0), 0);
        assert_eq!(sample_to_i16(0.5), 16383);
        assert_eq!(sample_to_i16(-0.5), -16384);
        // out of range clamps
        assert_eq!(sample_to_i16(3.0), 32767);
        assert_eq!(sample_to_i16(-7.5), -32768);
    }

    #[test]
    fn test_data_little_endian() {
        let bytes = serialize(&[1.0, -1.0, 0.25], 8000);
        assert_eq!(&bytes[44..46], &[0xFF, 0x7F]);
        assert_eq!(&bytes[46..48], &[0x00, 0x80]);
        assert_eq!(i16::from_le_bytes([bytes[48], bytes[49]]), 8191);
    }

    #[test]
    fn test_write_wav_matches_serialize() {
        let samples: Vec<f32> = (0..64).map(|i| (i as f32 / 10.0).sin() * 0.8).collect();
        let mut out = Vec::new();
        write_wav(&mut out, &samples, 22050).unwrap();
        assert_eq!(out, serialize(&samples, 22050));
    }

    #[test]
    fn test_serialize_never_truncates() {
        let samples = vec![0.3f32; 4410];
        let bytes = serialize(&samples, 44100);
        assert_eq!(&bytes[..WAV_HEADER_LEN], &header(4410, 44100));
        assert_eq!(bytes.len(), WAV_HEADER_LEN + 4410 * 2);
        assert_eq!(i16::from_le_bytes([bytes[44], bytes[45]]), 9830);
    }

    #[test]
    fn test_empty_buffer() {
        let bytes = serialize(&[], 44100);
        assert_eq!(bytes.len(), 44);
        assert_eq!(u32_at(&bytes, 40), 0);
        assert_eq!(u32_at(&bytes, 4), 36);
    }

    #[test]
    fn test_read_back() {
        let samples = vec![0.0, 0.5, -0.5, 0.999, -1.0];
        let bytes = serialize(&samples, 44100);
        let audio = read_wav(Cursor::new(bytes)).unwrap();
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.samples.len(), samples.len());
        for (a, b) in audio.samples.iter().zip(samples.iter()) {
            assert!((a - b).abs() < 1e-3, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_read_stereo_downmix() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for (l, r) in [(16384i16, 0i16), (-16384, -16384)] {
                writer.write_sample(l).unwrap();
                writer.write_sample(r).unwrap();
            }
            writer.finalize().unwrap();
        }
        let audio = read_wav(Cursor::new(cursor.into_inner())).unwrap();
        assert_eq!(audio.sample_rate, 16000);
        assert_eq!(audio.samples, vec![0.25, -0.5]);
    }

    #[test]
    fn test_read_rejects_garbage() {
        let result = read_wav(Cursor::new(b"not a wav file at all".to_vec()));
        assert!(result.is_err());
    }
}
