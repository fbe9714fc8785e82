//! Policy-compliant credential generation.
//!
//! Every generated credential contains at least one uppercase letter, one
//! lowercase letter, one digit and one symbol. The remaining characters are
//! drawn uniformly from the union of the four classes and the whole sequence
//! is shuffled, so the guaranteed characters have no fixed position.
//!
//! Production generation reads from the operating system's CSPRNG.

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::{CryptoRng, Rng, RngCore};
use zeroize::Zeroize;

use crate::error::{Error, PolicyError, Result};
use crate::types::{Credential, GeneratedCredential};

/// Smallest length that can hold one character of each class.
pub const MIN_LENGTH: usize = 4;

/// Largest supported credential length.
pub const MAX_LENGTH: usize = 4096;

/// Length used when none is configured.
pub const DEFAULT_LENGTH: usize = 32;

/// Symbol class used when none is configured.
pub const DEFAULT_SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";

/// The four character classes a credential is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterPolicy {
    symbols: Vec<u8>,
    alphabet: Vec<u8>,
}

impl CharacterPolicy {
    /// Creates a policy with a custom symbol class.
    ///
    /// Symbols must be ASCII punctuation. Duplicates are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] if the symbol class is empty or contains
    /// anything other than ASCII punctuation.
    pub fn new(symbols: &str) -> std::result::Result<Self, PolicyError> {
        let mut class: Vec<u8> = Vec::with_capacity(symbols.len());
        for c in symbols.chars() {
            if !c.is_ascii_punctuation() {
                return Err(PolicyError::NotPunctuation { found: c });
            }
            let byte = c as u8;
            if !class.contains(&byte) {
                class.push(byte);
            }
        }

        if class.is_empty() {
            return Err(PolicyError::EmptySymbols);
        }

        let mut alphabet = Vec::with_capacity(UPPERCASE.len() + LOWERCASE.len() + DIGITS.len() + class.len());
        alphabet.extend_from_slice(UPPERCASE);
        alphabet.extend_from_slice(LOWERCASE);
        alphabet.extend_from_slice(DIGITS);
        alphabet.extend_from_slice(&class);

        Ok(Self {
            symbols: class,
            alphabet,
        })
    }

    /// Returns the symbol class.
    #[must_use]
    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    /// Returns true if `c` belongs to the symbol class.
    #[must_use]
    pub fn is_symbol(&self, c: char) -> bool {
        c.is_ascii() && self.symbols.contains(&(c as u8))
    }

    /// Returns true if `c` belongs to any of the four classes.
    #[must_use]
    pub fn allows(&self, c: char) -> bool {
        c.is_ascii_alphanumeric() || self.is_symbol(c)
    }

    fn classes(&self) -> [&[u8]; 4] {
        [UPPERCASE, LOWERCASE, DIGITS, self.symbols.as_slice()]
    }
}

impl Default for CharacterPolicy {
    fn default() -> Self {
        let mut alphabet = Vec::new();
        alphabet.extend_from_slice(UPPERCASE);
        alphabet.extend_from_slice(LOWERCASE);
        alphabet.extend_from_slice(DIGITS);
        alphabet.extend_from_slice(DEFAULT_SYMBOLS.as_bytes());
        Self {
            symbols: DEFAULT_SYMBOLS.as_bytes().to_vec(),
            alphabet,
        }
    }
}

/// Generates random credentials that satisfy a [`CharacterPolicy`].
#[derive(Debug, Clone, Default)]
pub struct PasswordGenerator {
    policy: CharacterPolicy,
}

impl PasswordGenerator {
    /// Creates a generator with the default symbol class.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator for the given policy.
    #[must_use]
    pub const fn with_policy(policy: CharacterPolicy) -> Self {
        Self { policy }
    }

    /// Returns the policy this generator follows.
    #[must_use]
    pub const fn policy(&self) -> &CharacterPolicy {
        &self.policy
    }

    /// Generates a credential of `length` characters from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLength`] unless `MIN_LENGTH <= length <= MAX_LENGTH`.
    pub fn generate(&self, length: usize) -> Result<GeneratedCredential> {
        self.generate_with(&mut OsRng, length)
    }

    /// Generates a credential using the supplied cryptographic RNG.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLength`] unless `MIN_LENGTH <= length <= MAX_LENGTH`.
    pub fn generate_with<R>(&self, rng: &mut R, length: usize) -> Result<GeneratedCredential>
    where
        R: RngCore + CryptoRng,
    {
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
            return Err(Error::InvalidLength {
                length,
                minimum: MIN_LENGTH,
                maximum: MAX_LENGTH,
            });
        }

        let mut chars: Vec<u8> = Vec::with_capacity(length);
        for class in self.policy.classes() {
            chars.push(class[rng.gen_range(0..class.len())]);
        }

        let alphabet = &self.policy.alphabet;
        for _ in MIN_LENGTH..length {
            chars.push(alphabet[rng.gen_range(0..alphabet.len())]);
        }

        chars.shuffle(rng);

        let value: String = chars.iter().map(|&b| char::from(b)).collect();
        chars.zeroize();

        Ok(GeneratedCredential::new(Credential::new(value)))
    }
}
