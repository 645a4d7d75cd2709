use crate::alphabet::Symbol;
use crate::error::{Result, TonalPulseError};
use crate::CODES_PER_SLOT;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Number of symbols in every vocabulary code
pub const WORD_CODE_LEN: usize = 3;

/// Symbols a prefix code may use
const PREFIX_SYMBOLS: [char; 6] = ['a', 'e', 'i', 'A', 'E', 'I'];

/// Sentences used to demonstrate and exercise the codec
pub const EXAMPLE_PHRASES: [&str; 15] = [
    "hey there",
    "hello",
    "motor start left fast",
    "sensor report temperature high",
    "please help me now",
    "what is temperature",
    "door open",
    "alarm stop",
    "robot move forward",
    "system reset",
    "good thanks",
    "we need help now",
    "fan set max",
    "you know what I want",
    "if hot then fan start",
];

/// Dictionary grouping of vocabulary words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Systems,
    Properties,
    Actions,
    Directions,
    Numbers,
    Values,
    Social,
    Pronouns,
    Questions,
    Verbs,
    Time,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Systems,
        Category::Properties,
        Category::Actions,
        Category::Directions,
        Category::Numbers,
        Category::Values,
        Category::Social,
        Category::Pronouns,
        Category::Questions,
        Category::Verbs,
        Category::Time,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Systems => "Systems",
            Category::Properties => "Properties",
            Category::Actions => "Actions",
            Category::Directions => "Directions",
            Category::Numbers => "Numbers",
            Category::Values => "Values",
            Category::Social => "Social",
            Category::Pronouns => "Pronouns",
            Category::Questions => "Questions",
            Category::Verbs => "Verbs",
            Category::Time => "Time",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A word and its three-symbol code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VocabularyEntry {
    pub word: &'static str,
    pub code: &'static str,
    pub category: Category,
}

const fn entry(word: &'static str, code: &'static str, category: Category) -> VocabularyEntry {
    VocabularyEntry {
        word,
        code,
        category,
    }
}

/// Standard vocabulary, in dictionary order
pub const STANDARD_ENTRIES: &[VocabularyEntry] = &[
    // Systems
    entry("system", "aAe", Category::Systems),
    entry("motor", "aAi", Category::Systems),
    entry("sensor", "aAo", Category::Systems),
    entry("network", "aEa", Category::Systems),
    entry("power", "aEe", Category::Systems),
    entry("light", "aEi", Category::Systems),
    entry("camera", "aEo", Category::Systems),
    entry("door", "aIa", Category::Systems),
    entry("alarm", "aIe", Category::Systems),
    entry("display", "aIi", Category::Systems),
    entry("speaker", "aIo", Category::Systems),
    entry("fan", "aOa", Category::Systems),
    entry("pump", "aOe", Category::Systems),
    entry("valve", "aOi", Category::Systems),
    entry("robot", "aOo", Category::Systems),
    entry("drone", "Aae", Category::Systems),
    entry("vehicle", "Aai", Category::Systems),
    // Properties
    entry("temperature", "Aao", Category::Properties),
    entry("pressure", "Aea", Category::Properties),
    entry("humidity", "Aee", Category::Properties),
    entry("battery", "Aei", Category::Properties),
    entry("signal", "Aeo", Category::Properties),
    entry("data", "Aia", Category::Properties),
    entry("message", "Aie", Category::Properties),
    entry("file", "Aii", Category::Properties),
    entry("device", "Aio", Category::Properties),
    entry("unit", "Aoa", Category::Properties),
    entry("zone", "Aoe", Category::Properties),
    entry("group", "Aoi", Category::Properties),
    entry("all", "Aoo", Category::Properties),
    // Actions
    entry("start", "eAa", Category::Actions),
    entry("stop", "eAe", Category::Actions),
    entry("send", "eAi", Category::Actions),
    entry("report", "eAo", Category::Actions),
    entry("rotate", "eEa", Category::Actions),
    entry("move", "eEe", Category::Actions),
    entry("set", "eEi", Category::Actions),
    entry("wait", "eEo", Category::Actions),
    entry("open", "eIa", Category::Actions),
    entry("close", "eIe", Category::Actions),
    entry("increase", "eIi", Category::Actions),
    entry("decrease", "eIo", Category::Actions),
    entry("toggle", "eOa", Category::Actions),
    entry("scan", "eOe", Category::Actions),
    entry("connect", "eOi", Category::Actions),
    entry("disconnect", "eOo", Category::Actions),
    entry("save", "Eae", Category::Actions),
    entry("load", "Eai", Category::Actions),
    entry("reset", "Eao", Category::Actions),
    entry("update", "Eea", Category::Actions),
    entry("read", "Eei", Category::Actions),
    entry("write", "Eeo", Category::Actions),
    entry("enable", "Eia", Category::Actions),
    entry("disable", "Eie", Category::Actions),
    entry("lock", "Eii", Category::Actions),
    entry("unlock", "Eio", Category::Actions),
    entry("alert", "Eoa", Category::Actions),
    entry("confirm", "Eoe", Category::Actions),
    entry("deny", "Eoi", Category::Actions),
    entry("ping", "Eoo", Category::Actions),
    // Directions
    entry("left", "iAa", Category::Directions),
    entry("right", "iAe", Category::Directions),
    entry("up", "iAi", Category::Directions),
    entry("down", "iAo", Category::Directions),
    entry("forward", "iEa", Category::Directions),
    entry("backward", "iEe", Category::Directions),
    entry("north", "iEi", Category::Directions),
    entry("south", "iEo", Category::Directions),
    entry("east", "iIa", Category::Directions),
    entry("west", "iIe", Category::Directions),
    entry("center", "iIi", Category::Directions),
    entry("edge", "iIo", Category::Directions),
    entry("inside", "iOa", Category::Directions),
    entry("outside", "iOe", Category::Directions),
    entry("here", "iOi", Category::Directions),
    entry("there", "iOo", Category::Directions),
    // Numbers
    entry("one", "Iae", Category::Numbers),
    entry("two", "Iai", Category::Numbers),
    entry("three", "Iao", Category::Numbers),
    entry("four", "Iea", Category::Numbers),
    entry("five", "Iee", Category::Numbers),
    entry("six", "Ieo", Category::Numbers),
    entry("seven", "Iia", Category::Numbers),
    entry("eight", "Iie", Category::Numbers),
    entry("nine", "Iio", Category::Numbers),
    entry("ten", "Ioa", Category::Numbers),
    entry("hundred", "Ioe", Category::Numbers),
    entry("thousand", "Ioi", Category::Numbers),
    // Values
    entry("low", "oAa", Category::Values),
    entry("medium", "oAe", Category::Values),
    entry("high", "oAi", Category::Values),
    entry("max", "oAo", Category::Values),
    entry("min", "oEa", Category::Values),
    entry("on", "oEe", Category::Values),
    entry("off", "oEi", Category::Values),
    entry("fast", "oEo", Category::Values),
    entry("slow", "oIa", Category::Values),
    entry("hot", "oIe", Category::Values),
    entry("cold", "oIi", Category::Values),
    entry("full", "oIo", Category::Values),
    entry("empty", "oOa", Category::Values),
    entry("yes", "oOe", Category::Values),
    entry("no", "oOi", Category::Values),
    entry("ok", "oOo", Category::Values),
    entry("error", "Oae", Category::Values),
    entry("ready", "Oai", Category::Values),
    entry("busy", "Oao", Category::Values),
    entry("degrees", "Oea", Category::Values),
    entry("percent", "Oee", Category::Values),
    entry("seconds", "Oeo", Category::Values),
    entry("meters", "Oia", Category::Values),
    entry("critical", "Oie", Category::Values),
    entry("normal", "Oii", Category::Values),
    entry("warning", "Oio", Category::Values),
    // Social
    entry("hello", "Ooa", Category::Social),
    entry("hey", "OAa", Category::Social),
    entry("hi", "OAe", Category::Social),
    entry("goodbye", "Ooe", Category::Social),
    entry("thanks", "Ooi", Category::Social),
    entry("help", "Ooo", Category::Social),
    entry("please", "OAi", Category::Social),
    entry("sorry", "OAo", Category::Social),
    entry("good", "OOa", Category::Social),
    entry("bad", "OOe", Category::Social),
    entry("done", "OOi", Category::Social),
    // Pronouns
    entry("me", "EOa", Category::Pronouns),
    entry("you", "EOe", Category::Pronouns),
    entry("we", "EOi", Category::Pronouns),
    entry("they", "EOo", Category::Pronouns),
    entry("it", "EIi", Category::Pronouns),
    entry("them", "EIo", Category::Pronouns),
    entry("my", "EIa", Category::Pronouns),
    entry("your", "EIe", Category::Pronouns),
    entry("and", "EAe", Category::Pronouns),
    entry("or", "EAi", Category::Pronouns),
    entry("but", "EAo", Category::Pronouns),
    entry("if", "EEa", Category::Pronouns),
    entry("then", "EEe", Category::Pronouns),
    entry("so", "EEi", Category::Pronouns),
    entry("not", "EAa", Category::Pronouns),
    entry("very", "EEo", Category::Pronouns),
    // Questions
    entry("what", "OEa", Category::Questions),
    entry("where", "OEe", Category::Questions),
    entry("when", "OEi", Category::Questions),
    entry("who", "OEo", Category::Questions),
    entry("why", "OIa", Category::Questions),
    entry("how", "OIe", Category::Questions),
    entry("this", "OIi", Category::Questions),
    entry("that", "OIo", Category::Questions),
    // Verbs
    entry("want", "AAa", Category::Verbs),
    entry("need", "OOo", Category::Verbs),
    entry("have", "AAe", Category::Verbs),
    entry("go", "AAi", Category::Verbs),
    entry("come", "AAo", Category::Verbs),
    entry("give", "AEa", Category::Verbs),
    entry("take", "AEe", Category::Verbs),
    entry("know", "AEi", Category::Verbs),
    entry("see", "AEo", Category::Verbs),
    entry("am", "AOa", Category::Verbs),
    entry("is", "AOe", Category::Verbs),
    entry("are", "AOi", Category::Verbs),
    entry("was", "AOo", Category::Verbs),
    // Time
    entry("now", "AIa", Category::Time),
    entry("later", "AIe", Category::Time),
    entry("again", "AIi", Category::Time),
    entry("never", "AIo", Category::Time),
];

/// Sentence-level modifier sent ahead of the `/` terminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Prefix {
    #[default]
    Command,
    Question,
    Urgent,
    Negate,
    Condition,
    Schedule,
    Broadcast,
    Emergency,
}

impl Prefix {
    pub const ALL: [Prefix; 8] = [
        Prefix::Command,
        Prefix::Question,
        Prefix::Urgent,
        Prefix::Negate,
        Prefix::Condition,
        Prefix::Schedule,
        Prefix::Broadcast,
        Prefix::Emergency,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Prefix::Command => "COMMAND",
            Prefix::Question => "QUESTION",
            Prefix::Urgent => "URGENT",
            Prefix::Negate => "NEGATE",
            Prefix::Condition => "CONDITION",
            Prefix::Schedule => "SCHEDULE",
            Prefix::Broadcast => "BROADCAST",
            Prefix::Emergency => "EMERGENCY",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Prefix::Command => "a",
            Prefix::Question => "e",
            Prefix::Urgent => "i",
            Prefix::Negate => "aa",
            Prefix::Condition => "ae",
            Prefix::Schedule => "ai",
            Prefix::Broadcast => "ee",
            Prefix::Emergency => "ii",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Prefix::Command => "Command",
            Prefix::Question => "Question",
            Prefix::Urgent => "Urgent",
            Prefix::Negate => "Negate",
            Prefix::Condition => "Conditional",
            Prefix::Schedule => "Schedule",
            Prefix::Broadcast => "Broadcast",
            Prefix::Emergency => "Emergency",
        }
    }

    pub fn from_code(code: &str) -> Option<Prefix> {
        Prefix::ALL.into_iter().find(|p| p.code() == code)
    }
}

impl FromStr for Prefix {
    type Err = TonalPulseError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim();
        Prefix::ALL
            .into_iter()
            .find(|p| p.key().eq_ignore_ascii_case(key) || p.label().eq_ignore_ascii_case(key))
            .ok_or_else(|| TonalPulseError::UnknownPrefix(s.to_string()))
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Size of the addressable language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub symbols: usize,
    pub codes_per_slot: usize,
    pub prefixes: usize,
    pub words: usize,
}

/// Bidirectional word ↔ code table, validated once at construction
#[derive(Debug, Clone)]
pub struct Vocabulary {
    entries: &'static [VocabularyEntry],
    by_word: HashMap<&'static str, usize>,
    by_code: HashMap<&'static str, usize>,
}

impl Vocabulary {
    /// Build the standard table
    pub fn standard() -> Result<Self> {
        Self::from_entries(STANDARD_ENTRIES)
    }

    /// Build and validate a table; duplicate words or codes and malformed codes are fatal
    pub fn from_entries(entries: &'static [VocabularyEntry]) -> Result<Self> {
        validate_prefix_table()?;

        let mut by_word = HashMap::with_capacity(entries.len());
        let mut by_code: HashMap<&'static str, usize> = HashMap::with_capacity(entries.len());

        for (idx, e) in entries.iter().enumerate() {
            validate_word_code(e)?;
            if by_word.insert(e.word, idx).is_some() {
                return Err(TonalPulseError::DuplicateWord(e.word.to_string()));
            }
            if let Some(prev) = by_code.insert(e.code, idx) {
                return Err(TonalPulseError::DuplicateCode {
                    code: e.code.to_string(),
                    first: entries[prev].word.to_string(),
                    second: e.word.to_string(),
                });
            }
        }

        Ok(Self {
            entries,
            by_word,
            by_code,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[VocabularyEntry] {
        self.entries
    }

    pub fn code_for(&self, word: &str) -> Option<&'static str> {
        self.by_word.get(word).map(|&idx| self.entries[idx].code)
    }

    pub fn word_for(&self, code: &str) -> Option<&'static str> {
        self.by_code.get(code).map(|&idx| self.entries[idx].word)
    }

    pub fn lookup(&self, word: &str) -> Option<&VocabularyEntry> {
        self.by_word.get(word).map(|&idx| &self.entries[idx])
    }

    /// Dictionary view: words containing `filter` (case-insensitive), grouped by category.
    /// Empty categories are left out.
    pub fn search(&self, filter: &str) -> Vec<(Category, Vec<&VocabularyEntry>)> {
        let needle = filter.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .filter_map(|category| {
                let words: Vec<&VocabularyEntry> = self
                    .entries
                    .iter()
                    .filter(|e| e.category == category)
                    .filter(|e| needle.is_empty() || e.word.contains(needle.as_str()))
                    .collect();
                (!words.is_empty()).then_some((category, words))
            })
            .collect()
    }

    pub fn capacity(&self) -> Capacity {
        Capacity {
            symbols: Symbol::ALL.len(),
            codes_per_slot: CODES_PER_SLOT,
            prefixes: Prefix::ALL.len(),
            words: self.len(),
        }
    }
}

fn validate_word_code(e: &VocabularyEntry) -> Result<()> {
    let invalid = |reason| TonalPulseError::InvalidCode {
        owner: e.word.to_string(),
        code: e.code.to_string(),
        reason,
    };
    if e.code.chars().count() != WORD_CODE_LEN {
        return Err(invalid("word codes are exactly 3 symbols"));
    }
    if !e.code.chars().all(Symbol::is_symbol_char) {
        return Err(invalid("word codes use only alphabet symbols"));
    }
    Ok(())
}

fn validate_prefix_table() -> Result<()> {
    for (i, p) in Prefix::ALL.iter().enumerate() {
        let code = p.code();
        let len = code.chars().count();
        if !(1..=2).contains(&len) || !code.chars().all(|c| PREFIX_SYMBOLS.contains(&c)) {
            return Err(TonalPulseError::InvalidCode {
                owner: p.key().to_string(),
                code: code.to_string(),
                reason: "prefix codes are 1-2 symbols from a, e, i, A, E, I",
            });
        }
        if let Some(other) = Prefix::ALL[..i].iter().find(|q| q.code() == code) {
            return Err(TonalPulseError::DuplicateCode {
                code: code.to_string(),
                first: other.key().to_string(),
                second: p.key().to_string(),
            });
        }
    }
    Ok(())
}
