//! Written-form parser
//!
//! The written form is the interchange text of the codec: alphabet letters, a space for a word
//! gap, `~` for the link tone and `/` to close a leading prefix. Parsing is total: characters
//! outside that set are dropped so that noisy, partially received text still yields tokens.

use crate::alphabet::Symbol;

pub const WORD_GAP: char = ' ';
pub const LINK: char = '~';
pub const PREFIX_TERMINATOR: char = '/';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Symbol(char),
    WordGap,
    Link,
    Prefix,
}

/// Tokenize a written form. `/` always yields `Prefix` followed by a `WordGap`.
pub fn parse(text: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(text.len() + 1);
    for c in text.chars() {
        match c {
            WORD_GAP => tokens.push(Token::WordGap),
            LINK => tokens.push(Token::Link),
            PREFIX_TERMINATOR => {
                tokens.push(Token::Prefix);
                tokens.push(Token::WordGap);
            }
            c if Symbol::is_symbol_char(c) => tokens.push(Token::Symbol(c)),
            _ => {}
        }
    }
    tokens
}
