//! Seed phrase handling for the unlocked session
//!
//! A phrase enters the session from wallet creation, import, or a vault
//! open. All three paths go through [`SeedPhrase::parse`], so the session
//! only ever holds a normalized phrase with a plausible word count. The
//! buffer is wiped when the session drops; checksum validation stays with
//! the mnemonic parser.

use crate::shared::constants::{MAX_SEED_PHRASE_WORDS, MIN_SEED_PHRASE_WORDS};
use crate::shared::error::WalletError;
use crate::shared::types::WalletResult;
use zeroize::Zeroizing;

pub struct SeedPhrase {
    words: Zeroizing<String>,
}

impl SeedPhrase {
    /// Normalize a raw phrase: trim, collapse whitespace runs to single
    /// spaces, and check the word count (12-24 in steps of 3).
    pub fn parse(raw: &str) -> WalletResult<Self> {
        let words: Vec<&str> = raw.split_whitespace().collect();
        let count = words.len();
        if count < MIN_SEED_PHRASE_WORDS || count > MAX_SEED_PHRASE_WORDS || count % 3 != 0 {
            return Err(WalletError::validation(format!(
                "Seed phrase must be {} to {} words in steps of 3, got {}",
                MIN_SEED_PHRASE_WORDS, MAX_SEED_PHRASE_WORDS, count
            )));
        }
        Ok(Self {
            words: Zeroizing::new(words.join(" ")),
        })
    }

    /// The normalized phrase, single-spaced
    pub fn as_str(&self) -> &str {
        &self.words
    }

    pub fn word_count(&self) -> usize {
        self.words.split(' ').count()
    }
}
