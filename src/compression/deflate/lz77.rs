//! Finds repeated byte sequences and replaces them with back references.

use crate::compression::Bytes;
use super::{MAX_MATCH_LENGTH, MIN_MATCH_LENGTH, WINDOW_SIZE};


/// Stop searching for a longer match after inspecting this many earlier positions.
/// Limits the time spent on highly repetitive input, at the cost of missing some distant matches.
pub const MAX_CHAIN_LENGTH: usize = 4096;

const HASH_BITS: u32 = 15;
const HASH_SIZE: usize = 1 << HASH_BITS;
const WINDOW_MASK: usize = WINDOW_SIZE - 1;

/// Marks an empty hash chain link.
const NO_POSITION: usize = usize::MAX;


/// Either a single byte or a reference to a previous occurrence of a byte sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {

    /// A byte that is copied to the output unchanged.
    Literal(u8),

    /// Copy `length` bytes, starting `distance` bytes before the current output position.
    Match {
        length: u16,
        distance: u16,
    },
}

impl Token {

    /// Number of uncompressed bytes this token stands for.
    #[inline]
    pub fn byte_len(self) -> usize {
        match self {
            Token::Literal(_) => 1,
            Token::Match { length, .. } => length as usize,
        }
    }
}


/// Remembers, for each three-byte prefix, the positions where it occurred, most recent first.
struct HashChains {
    /// The most recent position of each hash.
    head: Vec<usize>,

    /// For each position in the window, the previous position with the same hash.
    previous: Vec<usize>,
}

impl HashChains {
    fn new() -> Self {
        HashChains {
            head: vec![NO_POSITION; HASH_SIZE],
            previous: vec![NO_POSITION; WINDOW_SIZE],
        }
    }

    #[inline]
    fn hash(bytes: Bytes<'_>, position: usize) -> usize {
        let prefix = (bytes[position] as u32) << 16 | (bytes[position + 1] as u32) << 8 | bytes[position + 2] as u32;
        (prefix.wrapping_mul(0x9E37_79B1) >> (32 - HASH_BITS)) as usize
    }

    #[inline]
    fn insert(&mut self, bytes: Bytes<'_>, position: usize) {
        if position + MIN_MATCH_LENGTH <= bytes.len() {
            let hash = Self::hash(bytes, position);
            self.previous[position & WINDOW_MASK] = self.head[hash];
            self.head[hash] = position;
        }
    }

    /// Find the longest earlier occurrence of the bytes at the position.
    /// Candidates are visited from the nearest to the farthest,
    /// and only a strictly longer match replaces the current one,
    /// so that among equally long matches, the smallest distance wins.
    ///
    /// The search is bounded: after `MAX_CHAIN_LENGTH` candidates, the best match so far is returned,
    /// even if a longer match exists farther back in the window.
    /// The result is still a valid match, only the compression ratio may suffer.
    fn longest_match(&self, bytes: Bytes<'_>, position: usize) -> Option<(usize, usize)> {
        if position + MIN_MATCH_LENGTH > bytes.len() {
            return None;
        }

        let max_length = MAX_MATCH_LENGTH.min(bytes.len() - position);
        let target = &bytes[position .. position + max_length];

        let mut best_length = MIN_MATCH_LENGTH - 1;
        let mut best_distance = 0;

        let mut candidate = self.head[Self::hash(bytes, position)];
        let mut visited = 0;

        while candidate != NO_POSITION && visited < MAX_CHAIN_LENGTH {
            let distance = position - candidate;
            if distance > WINDOW_SIZE { break; }

            let length = target.iter()
                .zip(&bytes[candidate ..])
                .take_while(|(a, b)| a == b)
                .count();

            if length > best_length {
                best_length = length;
                best_distance = distance;

                if length == max_length { break; }
            }

            let next = self.previous[candidate & WINDOW_MASK];
            if next == NO_POSITION || next >= candidate { break; }

            candidate = next;
            visited += 1;
        }

        if best_length >= MIN_MATCH_LENGTH { Some((best_length, best_distance)) }
        else { None }
    }
}


/// Greedily replace repeated sequences with back references.
/// The result is a deterministic function of the input bytes.
pub fn tokenize(bytes: Bytes<'_>) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(bytes.len() / 2 + 16);
    let mut chains = HashChains::new();
    let mut position = 0;

    while position < bytes.len() {
        match chains.longest_match(bytes, position) {
            Some((length, distance)) => {
                tokens.push(Token::Match { length: length as u16, distance: distance as u16 });

                for covered in position .. position + length {
                    chains.insert(bytes, covered);
                }

                position += length;
            },

            None => {
                tokens.push(Token::Literal(bytes[position]));
                chains.insert(bytes, position);
                position += 1;
            },
        }
    }

    tokens
}
