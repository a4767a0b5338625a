//! Fixed-capacity bit set backed by `u64` words.
//!
//! Used for variable sets: rows of the interaction matrix and the supports
//! collected while the matrix is built.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    const BITS_PER_WORD: usize = 64;

    /// Creates an empty bit set able to hold indices `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        let num_words = capacity.div_ceil(Self::BITS_PER_WORD);
        Self {
            words: vec![0; num_words],
        }
    }

    #[inline]
    fn word_and_bit(index: usize) -> (usize, u64) {
        (index / Self::BITS_PER_WORD, 1 << (index % Self::BITS_PER_WORD))
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        let (word, bit) = Self::word_and_bit(index);
        self.words.get(word).is_some_and(|w| w & bit != 0)
    }

    /// Sets the bit at `index`, growing the set if needed.
    #[inline]
    pub fn insert(&mut self, index: usize) {
        let (word, bit) = Self::word_and_bit(index);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= bit;
    }

    /// Iterates over the set bits in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut w = word;
            std::iter::from_fn(move || {
                if w == 0 {
                    return None;
                }
                let bit = w.trailing_zeros() as usize;
                w &= w - 1;
                Some(i * Self::BITS_PER_WORD + bit)
            })
        })
    }
}
