//! Diceware word selection
//!
//! Each word is picked by rolling five six-sided dice with the operating
//! system's CSPRNG and looking the rolls up in the EFF large word list.

use crate::error::PassphraseError;
use eff_wordlist::large::LIST;
use rand::rngs::OsRng;
use rand::RngCore;

const DICE_PER_WORD: u32 = 5;
const SIDES: u8 = 6;
/// Bytes at or above this are rejected so every face is equally likely
const ROLL_LIMIT: u8 = 252;

/// Source of passphrase words
pub trait WordGenerator: Send + Sync {
    /// Returns exactly `count` words, in order
    fn generate(&self, count: i64) -> Result<Vec<String>, PassphraseError>;
}

/// Diceware over the EFF large list
///
/// A handful of list entries contain a hyphen (for example "t-shirt"), so a
/// result joined with "-" can split into more pieces than words were drawn.
#[derive(Debug, Default, Clone, Copy)]
pub struct Diceware;

impl Diceware {
    pub fn new() -> Self {
        Self
    }

    fn generate_with<R: RngCore>(
        &self,
        rng: &mut R,
        count: i64,
    ) -> Result<Vec<String>, PassphraseError> {
        let count = usize::try_from(count)
            .ok()
            .filter(|count| *count > 0)
            .ok_or_else(|| {
                PassphraseError::InvalidConfiguration(format!(
                    "word_count must be at least 1, got {}",
                    count
                ))
            })?;

        (0..count)
            .map(|_| word(&mut *rng).map(str::to_string))
            .collect()
    }
}

impl WordGenerator for Diceware {
    fn generate(&self, count: i64) -> Result<Vec<String>, PassphraseError> {
        self.generate_with(&mut OsRng, count)
    }
}

fn word<R: RngCore>(rng: &mut R) -> Result<&'static str, PassphraseError> {
    let mut index = 0usize;
    for _ in 0..DICE_PER_WORD {
        index = index * SIDES as usize + roll(rng)? as usize;
    }

    LIST.get(index).map(|(_, word)| *word).ok_or_else(|| {
        PassphraseError::Generation(format!("dice index {} is outside the word list", index))
    })
}

/// One unbiased die roll in 0..6
fn roll<R: RngCore>(rng: &mut R) -> Result<u8, PassphraseError> {
    let mut byte = [0u8; 1];
    loop {
        rng.try_fill_bytes(&mut byte)
            .map_err(|e| PassphraseError::Generation(format!("reading system entropy: {}", e)))?;
        if byte[0] < ROLL_LIMIT {
            return Ok(byte[0] % SIDES);
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    /// Replays a fixed byte sequence
    struct ScriptedRng {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl ScriptedRng {
        fn new(bytes: &[u8]) -> Self {
            Self {
                bytes: bytes.to_vec(),
                pos: 0,
            }
        }
    }

    impl RngCore for ScriptedRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for b in dest.iter_mut() {
                *b = self.bytes[self.pos % self.bytes.len()];
                self.pos += 1;
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {}

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new("entropy source unavailable"))
        }
    }

    #[test]
    fn generates_requested_number_of_words() {
        let words = Diceware::new().generate(12).unwrap();
        assert_eq!(words.len(), 12);
        assert!(words.iter().all(|w| !w.is_empty()));
    }

    #[test]
    fn words_come_from_the_list() {
        let words = Diceware::new().generate(20).unwrap();
        for word in &words {
            assert!(LIST.iter().any(|(_, w)| *w == word.as_str()), "{} not in list", word);
        }
    }

    #[test]
    fn rejects_non_positive_counts() {
        for count in [0, -1, i64::MIN] {
            let err = Diceware::new().generate(count).unwrap_err();
            assert!(matches!(err, PassphraseError::InvalidConfiguration(_)));
        }
    }

    #[test]
    fn lowest_and_highest_rolls_map_to_list_ends() {
        let mut low = ScriptedRng::new(&[0]);
        assert_eq!(word(&mut low).unwrap(), LIST[0].1);

        let mut high = ScriptedRng::new(&[5]);
        assert_eq!(word(&mut high).unwrap(), LIST[LIST.len() - 1].1);
    }

    #[test]
    fn biased_bytes_are_rejected() {
        // 252..=255 are skipped, 6 wraps to face 0
        let mut rng = ScriptedRng::new(&[255, 252, 6]);
        assert_eq!(roll(&mut rng).unwrap(), 0);
        assert_eq!(rng.pos, 3);
    }

    #[test]
    fn entropy_failure_is_a_generation_error() {
        let err = Diceware::new()
            .generate_with(&mut BrokenRng, 3)
            .unwrap_err();
        assert!(matches!(err, PassphraseError::Generation(_)));
    }
}
