//! Sequence Number Handling
//!
//! Selective repeat numbers its frames over a small, configurable sequence
//! space (`SEQSPACE`). Every comparison between two sequence numbers is
//! performed modulo that space, so the arithmetic lives on [`SeqSpace`]
//! rather than on the number itself.

use std::fmt;

/// Smallest usable sequence space (one outstanding frame plus one spare number)
pub const MIN_SEQ_SPACE: u32 = 2;

/// A sequence number in `[0, SEQSPACE)`
///
/// The raw value is not masked on construction: a frame damaged in transit
/// may carry a value outside the space, and [`SeqSpace::contains`] is how the
/// engine tells the two apart.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
pub struct SeqNumber(u32);

impl SeqNumber {
    /// Create a new sequence number
    #[inline]
    pub const fn new(value: u32) -> Self {
        SeqNumber(value)
    }

    /// Get the raw sequence number value
    #[inline]
    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeqNumber({})", self.0)
    }
}

impl fmt::Display for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SeqNumber {
    fn from(value: u32) -> Self {
        SeqNumber(value)
    }
}

impl From<SeqNumber> for u32 {
    fn from(seq: SeqNumber) -> u32 {
        seq.0
    }
}

/// Modulo-N arithmetic over a bounded sequence space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqSpace {
    modulus: u32,
}

impl SeqSpace {
    /// Create a sequence space of `modulus` numbers
    ///
    /// # Panics
    /// Panics if `modulus` is smaller than [`MIN_SEQ_SPACE`]
    pub fn new(modulus: u32) -> Self {
        assert!(
            modulus >= MIN_SEQ_SPACE,
            "Sequence space {} is smaller than minimum {}",
            modulus,
            MIN_SEQ_SPACE
        );
        SeqSpace { modulus }
    }

    /// Whether `seq` is a legal value in this space
    #[inline]
    pub fn contains(self, seq: SeqNumber) -> bool {
        seq.0 < self.modulus
    }

    /// The sequence number following `seq`
    #[inline]
    pub fn next(self, seq: SeqNumber) -> SeqNumber {
        self.add(seq, 1)
    }

    /// `seq + n`, wrapping at the modulus
    #[inline]
    pub fn add(self, seq: SeqNumber, n: u32) -> SeqNumber {
        let sum = (seq.0 % self.modulus) as u64 + (n % self.modulus) as u64;
        SeqNumber((sum % self.modulus as u64) as u32)
    }

    /// `seq - n`, wrapping at the modulus
    #[inline]
    pub fn sub(self, seq: SeqNumber, n: u32) -> SeqNumber {
        self.add(seq, self.modulus - n % self.modulus)
    }

    /// Number of forward steps needed to go from `from` to `to`
    ///
    /// `(to - from + SEQSPACE) mod SEQSPACE`
    #[inline]
    pub fn distance(self, from: SeqNumber, to: SeqNumber) -> u32 {
        let from = from.0 % self.modulus;
        let to = to.0 % self.modulus;
        (to + self.modulus - from) % self.modulus
    }

    /// Whether `seq` falls in `[base, base + size)` modulo the space
    ///
    /// Values outside the space are never in any window.
    #[inline]
    pub fn in_window(self, seq: SeqNumber, base: SeqNumber, size: u32) -> bool {
        self.contains(seq) && self.distance(base, seq) < size
    }
}
