use thiserror::Error;

#[derive(Debug, Error)]
pub enum TonalPulseError {
    #[error("Invalid frequency profile: {0}")]
    InvalidProfile(String),

    #[error("Vocabulary code {code:?} is assigned to both {first:?} and {second:?}")]
    DuplicateCode {
        code: String,
        first: String,
        second: String,
    },

    #[error("Vocabulary word {0:?} appears more than once")]
    DuplicateWord(String),

    #[error("Invalid code {code:?} for {owner:?}: {reason}")]
    InvalidCode {
        owner: String,
        code: String,
        reason: &'static str,
    },

    #[error("Unknown frequency preset: {0}")]
    UnknownPreset(String),

    #[error("Unknown prefix: {0}")]
    UnknownPrefix(String),

    #[error("Invalid WAV data: {0}")]
    InvalidWav(String),

    #[error("Unsupported WAV format: {0}")]
    UnsupportedWav(String),

    #[error("FFT error: {0}")]
    FftError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<hound::Error> for TonalPulseError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(io) => TonalPulseError::Io(io),
            hound::Error::Unsupported => {
                TonalPulseError::UnsupportedWav("unsupported sample layout".to_string())
            }
            other => TonalPulseError::InvalidWav(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TonalPulseError>;
