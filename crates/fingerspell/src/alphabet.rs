//! The fingerspelling alphabet.

use std::fmt;

/// A letter of the fingerspelling alphabet.
///
/// The discriminant of each variant is the index of the classifier output channel scoring it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Letter {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
}

impl Letter {
    /// Number of letters, and the number of scores a classifier has to produce.
    pub const COUNT: usize = 26;

    /// All letters, in classifier output order.
    pub const ALL: [Letter; Self::COUNT] = {
        use Letter::*;
        [
            A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
        ]
    };

    /// Returns the letter scored by classifier output channel `index`.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Returns the classifier output channel index of this letter.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn as_char(self) -> char {
        char::from(b'A' + self as u8)
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
