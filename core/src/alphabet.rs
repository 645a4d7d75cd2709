use crate::profile::{Band, FrequencyProfile};
use crate::{LONG_MS, SHORT_MS};

/// Tone length of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationClass {
    Short,
    Long,
}

impl DurationClass {
    pub fn millis(self) -> u32 {
        match self {
            DurationClass::Short => SHORT_MS,
            DurationClass::Long => LONG_MS,
        }
    }

    pub fn seconds(self) -> f64 {
        self.millis() as f64 / 1000.0
    }
}

/// One of the 8 alphabet symbols: lowercase letters are short, uppercase are long
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub letter: char,
    pub band: Band,
    pub duration: DurationClass,
}

impl Symbol {
    pub const ALL: [Symbol; 8] = [
        Symbol::new('a', Band::Low, DurationClass::Short),
        Symbol::new('A', Band::Low, DurationClass::Long),
        Symbol::new('e', Band::Mid, DurationClass::Short),
        Symbol::new('E', Band::Mid, DurationClass::Long),
        Symbol::new('i', Band::High, DurationClass::Short),
        Symbol::new('I', Band::High, DurationClass::Long),
        Symbol::new('o', Band::Top, DurationClass::Short),
        Symbol::new('O', Band::Top, DurationClass::Long),
    ];

    const fn new(letter: char, band: Band, duration: DurationClass) -> Self {
        Self {
            letter,
            band,
            duration,
        }
    }

    pub fn from_char(c: char) -> Option<Symbol> {
        Symbol::ALL.into_iter().find(|s| s.letter == c)
    }

    pub fn is_symbol_char(c: char) -> bool {
        Symbol::from_char(c).is_some()
    }

    /// The symbol for `band` with the given duration; `None` for the link band
    pub fn for_band(band: Band, duration: DurationClass) -> Option<Symbol> {
        Symbol::ALL
            .into_iter()
            .find(|s| s.band == band && s.duration == duration)
    }
}

/// A symbol bound to the concrete frequency of a profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    pub symbol: Symbol,
    pub frequency: f32,
}

impl ToneSpec {
    pub fn duration_ms(&self) -> u32 {
        self.symbol.duration.millis()
    }
}

/// Symbol → frequency lookup derived from one profile
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolTable {
    tones: [ToneSpec; 8],
}

impl SymbolTable {
    pub fn new(profile: &FrequencyProfile) -> Self {
        Self {
            tones: Symbol::ALL.map(|symbol| ToneSpec {
                symbol,
                frequency: profile.frequency(symbol.band),
            }),
        }
    }

    pub fn get(&self, letter: char) -> Option<&ToneSpec> {
        self.tones.iter().find(|t| t.symbol.letter == letter)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToneSpec> {
        self.tones.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Preset;

    #[test]
    fn test_alphabet_has_eight_symbols() {
        let letters: String = Symbol::ALL.iter().map(|s| s.letter).collect();
        assert_eq!(letters, "aAeEiIoO");
    }

    #[test]
    fn test_case_selects_duration() {
        for symbol in Symbol::ALL {
            let expected = if symbol.letter.is_lowercase() {
                DurationClass::Short
            } else {
                DurationClass::Long
            };
            assert_eq!(symbol.duration, expected);
        }
        assert_eq!(DurationClass::Short.millis(), 100);
        assert_eq!(DurationClass::Long.millis(), 200);
    }

    #[test]
    fn test_symbol_table_uses_profile() {
        let table = SymbolTable::new(&Preset::Bright.profile());
        assert_eq!(table.get('a').unwrap().frequency, 400.0);
        assert_eq!(table.get('A').unwrap().frequency, 400.0);
        assert_eq!(table.get('E').unwrap().duration_ms(), 200);
        assert_eq!(table.get('o').unwrap().frequency, 1300.0);
        assert!(table.get('~').is_none());
        assert!(table.get('u').is_none());
    }

    #[test]
    fn test_for_band() {
        let s = Symbol::for_band(Band::High, DurationClass::Long).unwrap();
        assert_eq!(s.letter, 'I');
        assert!(Symbol::for_band(Band::Link, DurationClass::Short).is_none());
    }

    #[test]
    fn test_no_link_symbol() {
        assert!(Symbol::ALL.iter().all(|s| s.band != Band::Link));
        assert!(!Symbol::is_symbol_char('~'));
        assert!(Symbol::is_symbol_char('O'));
    }
}
