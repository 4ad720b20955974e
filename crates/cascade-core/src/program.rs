//! Program text parsing.
//!
//! A program is one line of comma-separated signed decimal integers. It is
//! parsed once; every machine execution then starts from a fresh copy of
//! the parsed image, so re-running the same program with different inputs
//! never re-parses text.

use std::num::ParseIntError;
use std::str::FromStr;

use thiserror::Error;

use crate::Word;

/// Errors produced while parsing program text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The input contained no words at all.
    #[error("program text is empty")]
    Empty,
    /// A comma-separated token failed integer parsing.
    #[error("invalid program word {text:?} at index {index}")]
    InvalidWord {
        /// Zero-based index of the offending token.
        index: usize,
        /// The token as it appeared in the input, after trimming.
        text: String,
        /// Underlying integer parse failure.
        source: ParseIntError,
    },
}

/// An ordered, immutable sequence of program words.
///
/// This is the shared artifact orchestrators clone machines from; the
/// mutable execution copy lives inside [`crate::Memory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    words: Vec<Word>,
}

impl Program {
    /// Returns the program words in load order.
    #[must_use]
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Returns the number of words in the program image.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` when the program has no words.
    ///
    /// Unreachable through parsing, which rejects empty input, but hosts
    /// may build programs directly from word vectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl From<Vec<Word>> for Program {
    fn from(words: Vec<Word>) -> Self {
        Self { words }
    }
}

impl FromStr for Program {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut words = Vec::new();
        for (index, token) in trimmed.split(',').enumerate() {
            let token = token.trim();
            let word = token.parse::<Word>().map_err(|source| ParseError::InvalidWord {
                index,
                text: token.to_owned(),
                source,
            })?;
            words.push(word);
        }
        Ok(Self { words })
    }
}

#[cfg(test)]
mod tests {
    use super::{ParseError, Program};

    #[test]
    fn parses_signed_words_in_order() {
        let program: Program = "109,1,204,-1,99".parse().expect("valid program text");
        assert_eq!(program.words(), &[109, 1, 204, -1, 99]);
        assert_eq!(program.len(), 5);
        assert!(!program.is_empty());
    }

    #[test]
    fn tolerates_surrounding_whitespace_and_trailing_newline() {
        let program: Program = " 1, 0 ,0,3,99\n".parse().expect("valid program text");
        assert_eq!(program.words(), &[1, 0, 0, 3, 99]);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!("".parse::<Program>(), Err(ParseError::Empty));
        assert_eq!("  \n".parse::<Program>(), Err(ParseError::Empty));
    }

    #[test]
    fn malformed_token_reports_index_and_text() {
        let error = "1,2,x7,99".parse::<Program>().expect_err("must not parse");
        match error {
            ParseError::InvalidWord { index, text, .. } => {
                assert_eq!(index, 2);
                assert_eq!(text, "x7");
            }
            ParseError::Empty => panic!("wrong error variant"),
        }
    }

    #[test]
    fn blank_token_between_commas_is_rejected() {
        assert!("1,,99".parse::<Program>().is_err());
    }

    #[test]
    fn fifteen_digit_words_parse_without_truncation() {
        let program: Program = "104,1125899906842624,99".parse().expect("valid program text");
        assert_eq!(program.words()[1], 1_125_899_906_842_624);
    }
}
