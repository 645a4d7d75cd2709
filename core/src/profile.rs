use crate::error::{Result, TonalPulseError};
use std::fmt;
use std::str::FromStr;

/// Bin half-width bounds in Hz
const BIN_TOLERANCE_MIN: f32 = 30.0;
const BIN_TOLERANCE_MAX: f32 = 50.0;

/// Bin half-width as a fraction of the Low→Mid spacing
const BIN_TOLERANCE_RATIO: f32 = 0.35;

/// One of the five profile slots. The first four carry symbols, the fifth is the link tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Low,
    Mid,
    High,
    Top,
    Link,
}

impl Band {
    pub const ALL: [Band; 5] = [Band::Low, Band::Mid, Band::High, Band::Top, Band::Link];

    /// Position of this band inside a [`FrequencyProfile`]
    pub fn index(self) -> usize {
        match self {
            Band::Low => 0,
            Band::Mid => 1,
            Band::High => 2,
            Band::Top => 3,
            Band::Link => 4,
        }
    }

    /// Written-form character the receiver emits for this band
    pub fn letter(self) -> char {
        match self {
            Band::Low => 'a',
            Band::Mid => 'e',
            Band::High => 'i',
            Band::Top => 'o',
            Band::Link => '~',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Band::Low => "LOW",
            Band::Mid => "MID",
            Band::High => "HIGH",
            Band::Top => "TOP",
            Band::Link => "LINK",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tolerance window around one profile frequency
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyBin {
    pub band: Band,
    pub center: f32,
    pub min: f32,
    pub max: f32,
}

impl FrequencyBin {
    pub fn contains(&self, freq: f32) -> bool {
        freq >= self.min && freq <= self.max
    }
}

/// The five ascending frequencies (Low, Mid, High, Top, Link) used for a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyProfile {
    frequencies: [f32; 5],
}

impl FrequencyProfile {
    /// Validate a custom profile: finite, positive and strictly ascending
    pub fn new(frequencies: [f32; 5]) -> Result<Self> {
        if let Some(bad) = frequencies.iter().find(|f| !f.is_finite() || **f <= 0.0) {
            return Err(TonalPulseError::InvalidProfile(format!(
                "frequency {} Hz is not a positive finite value",
                bad
            )));
        }
        for pair in frequencies.windows(2) {
            if pair[1] <= pair[0] {
                return Err(TonalPulseError::InvalidProfile(format!(
                    "frequencies must ascend, got {} Hz after {} Hz",
                    pair[1], pair[0]
                )));
            }
        }
        Ok(Self { frequencies })
    }

    pub fn frequencies(&self) -> &[f32; 5] {
        &self.frequencies
    }

    pub fn frequency(&self, band: Band) -> f32 {
        self.frequencies[band.index()]
    }

    pub fn link_frequency(&self) -> f32 {
        self.frequency(Band::Link)
    }

    /// Half-width of every bin: 35% of the Low→Mid spacing, clamped to 30..=50 Hz
    pub fn bin_tolerance(&self) -> f32 {
        ((self.frequencies[1] - self.frequencies[0]) * BIN_TOLERANCE_RATIO)
            .clamp(BIN_TOLERANCE_MIN, BIN_TOLERANCE_MAX)
    }

    pub fn bins(&self) -> [FrequencyBin; 5] {
        let t = self.bin_tolerance();
        Band::ALL.map(|band| {
            let center = self.frequency(band);
            FrequencyBin {
                band,
                center,
                min: center - t,
                max: center + t,
            }
        })
    }

    /// Classify a peak frequency; the first matching bin wins when windows overlap
    pub fn classify(&self, freq: f32) -> Option<Band> {
        self.bins()
            .iter()
            .find(|bin| bin.contains(freq))
            .map(|bin| bin.band)
    }
}

impl Default for FrequencyProfile {
    fn default() -> Self {
        Preset::default().profile()
    }
}

/// Built-in voice presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Preset {
    #[default]
    Bright,
    Warm,
    Deep,
    Subsonic,
    SciFi,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Bright,
        Preset::Warm,
        Preset::Deep,
        Preset::Subsonic,
        Preset::SciFi,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Preset::Bright => "bright",
            Preset::Warm => "warm",
            Preset::Deep => "deep",
            Preset::Subsonic => "subsonic",
            Preset::SciFi => "scifi",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Preset::Bright => "Bright",
            Preset::Warm => "Warm",
            Preset::Deep => "Deep",
            Preset::Subsonic => "Subsonic",
            Preset::SciFi => "Sci-Fi",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Preset::Bright => "Clear chirpy, best for phones & small speakers",
            Preset::Warm => "Mid-range, balanced for most setups",
            Preset::Deep => "Low rumbling bass, needs decent speakers",
            Preset::Subsonic => "Feel more than hear, needs subwoofer",
            Preset::SciFi => "Wide dramatic range, cinematic machine voice",
        }
    }

    pub fn frequencies(self) -> [f32; 5] {
        match self {
            Preset::Bright => [400.0, 700.0, 1000.0, 1300.0, 1600.0],
            Preset::Warm => [250.0, 450.0, 680.0, 950.0, 1200.0],
            Preset::Deep => [120.0, 220.0, 340.0, 480.0, 600.0],
            Preset::Subsonic => [60.0, 110.0, 180.0, 260.0, 360.0],
            Preset::SciFi => [150.0, 400.0, 800.0, 1400.0, 2000.0],
        }
    }

    pub fn profile(self) -> FrequencyProfile {
        // Preset tables are ascending by construction
        FrequencyProfile {
            frequencies: self.frequencies(),
        }
    }
}

impl FromStr for Preset {
    type Err = TonalPulseError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase().replace('-', "");
        Preset::ALL
            .into_iter()
            .find(|preset| preset.key() == key)
            .ok_or_else(|| TonalPulseError::UnknownPreset(s.to_string()))
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
