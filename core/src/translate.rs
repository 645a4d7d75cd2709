use crate::alphabet::Symbol;
use crate::vocabulary::{Prefix, Vocabulary};
use crate::written::{LINK, PREFIX_TERMINATOR};

/// Marker the decoder prints for a link tone
pub const LINK_MARKER: &str = "→";

/// Result of translating free text into a written form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub written: String,
    /// Words with no vocabulary code, in input order. They are left out of `written`.
    pub unknown: Vec<String>,
    pub matched: usize,
}

impl Encoded {
    /// True when only the prefix marker would be sent
    pub fn is_empty(&self) -> bool {
        self.matched == 0
    }
}

/// Translate free text: lowercase, strip punctuation, look every word up.
///
/// Unknown words are reported, never fatal. The prefix code, `/` and a gap always lead.
pub fn encode(vocabulary: &Vocabulary, text: &str, prefix: Prefix) -> Encoded {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();

    let mut codes = Vec::new();
    let mut unknown = Vec::new();
    for word in normalized.split_whitespace() {
        match vocabulary.code_for(word) {
            Some(code) => codes.push(code),
            None => unknown.push(word.to_string()),
        }
    }

    if !unknown.is_empty() {
        log::debug!("encode: {} unknown word(s): {:?}", unknown.len(), unknown);
    }

    let written = format!(
        "{}{} {}",
        prefix.code(),
        PREFIX_TERMINATOR,
        codes.join(" ")
    );
    Encoded {
        written,
        unknown,
        matched: codes.len(),
    }
}

/// Translate a written form back to text. Never fails: unmatched codes come back as `[code]`.
pub fn decode(vocabulary: &Vocabulary, written: &str) -> String {
    let (label, body) = split_prefix(written);

    let words: Vec<String> = body
        .split_whitespace()
        .map(|code| {
            if code.len() == 1 && code.starts_with(LINK) {
                LINK_MARKER.to_string()
            } else {
                match vocabulary.word_for(code) {
                    Some(word) => word.to_string(),
                    None => format!("[{}]", code),
                }
            }
        })
        .collect();

    let mut out = String::new();
    if let Some(label) = label {
        out.push_str(&label);
        out.push(' ');
    }
    out.push_str(&words.join(" "));
    out.trim_end().to_string()
}

/// Split a leading `code/` off the written form.
///
/// Returns the bracketed label (or the bracketed raw code when it names no prefix) and the rest.
fn split_prefix(written: &str) -> (Option<String>, &str) {
    let run_len: usize = written
        .chars()
        .take_while(|&c| Symbol::is_symbol_char(c))
        .map(char::len_utf8)
        .sum();
    if run_len == 0 || !written[run_len..].starts_with(PREFIX_TERMINATOR) {
        return (None, written);
    }

    let code = &written[..run_len];
    let rest = written[run_len + PREFIX_TERMINATOR.len_utf8()..].trim_start();
    let label = match Prefix::from_code(code) {
        Some(prefix) => format!("[{}]", prefix.label()),
        None => {
            log::debug!("decode: unrecognized prefix code {:?}", code);
            format!("[{}{}]", code, PREFIX_TERMINATOR)
        }
    };
    (Some(label), rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::standard().unwrap()
    }

    #[test]
    fn test_encode_command_sentence() {
        let encoded = encode(&vocab(), "motor start left fast", Prefix::Command);
        assert!(encoded.unknown.is_empty());
        assert_eq!(encoded.matched, 4);
        assert_eq!(encoded.written, "a/ aAi eAa iAa oEo");
    }

    #[test]
    fn test_encode_unknown_only() {
        let encoded = encode(&vocab(), "banana", Prefix::Command);
        assert_eq!(encoded.unknown, vec!["banana".to_string()]);
        assert_eq!(encoded.matched, 0);
        assert_eq!(encoded.written, "a/ ");
        assert!(encoded.is_empty());
    }

    #[test]
    fn test_encode_normalizes_case_and_punctuation() {
        let encoded = encode(&vocab(), "  Hello,   ROBOT!! move-forward?", Prefix::Question);
        // "move-forward" collapses to "moveforward"
        assert_eq!(encoded.written, "e/ Ooa aOo");
        assert_eq!(encoded.unknown, vec!["moveforward".to_string()]);
        assert_eq!(encoded.matched, 2);
    }

    #[test]
    fn test_encode_partial_match() {
        let encoded = encode(&vocab(), "you know what I want", Prefix::Command);
        assert_eq!(encoded.unknown, vec!["i".to_string()]);
        assert_eq!(encoded.matched, 4);
        assert_eq!(encoded.written, "a/ EOe AEi OEa AAa");
    }

    #[test]
    fn test_encode_uses_prefix_code() {
        let encoded = encode(&vocab(), "alarm", Prefix::Emergency);
        assert_eq!(encoded.written, "ii/ aIe");
    }

    #[test]
    fn test_decode_command_sentence() {
        let text = decode(&vocab(), "a/ aAi eAa iAa oEo");
        assert_eq!(text, "[Command] motor start left fast");
    }

    #[test]
    fn test_decode_two_symbol_prefix() {
        assert_eq!(decode(&vocab(), "ae/ oIe"), "[Conditional] hot");
        assert_eq!(decode(&vocab(), "ii/aIe"), "[Emergency] alarm");
    }

    #[test]
    fn test_decode_without_prefix() {
        assert_eq!(decode(&vocab(), "aAi eAa"), "motor start");
    }

    #[test]
    fn test_decode_link() {
        assert_eq!(
            decode(&vocab(), "a/ aIa eIa ~ aIe eAe"),
            "[Command] door open → alarm stop"
        );
    }

    #[test]
    fn test_decode_garbled_codes() {
        assert_eq!(decode(&vocab(), "a/ aAi xyz ai"), "[Command] motor [xyz] [ai]");
    }

    #[test]
    fn test_decode_unknown_prefix_code() {
        assert_eq!(decode(&vocab(), "oo/ aAi"), "[oo/] motor");
    }

    #[test]
    fn test_decode_prefix_only() {
        assert_eq!(decode(&vocab(), "a/ "), "[Command]");
        assert_eq!(decode(&vocab(), ""), "");
    }

    #[test]
    fn test_decode_total_on_noise() {
        let text = decode(&vocab(), "/ \u{e9}\u{e9} ~~ a/a");
        assert_eq!(text, "[/] [\u{e9}\u{e9}] [~~] [a/a]");
    }

    #[test]
    fn test_round_trip_every_word() {
        let vocab = vocab();
        for entry in vocab.entries() {
            let encoded = encode(&vocab, entry.word, Prefix::Command);
            assert_eq!(encoded.matched, 1, "word {} should encode", entry.word);
            let decoded = decode(&vocab, &encoded.written);
            assert_eq!(decoded, format!("[Command] {}", entry.word));
        }
    }
}
