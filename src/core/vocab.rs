//! Vocabulary table and the tiktoken source format it is loaded from.
//!
//! # Tiktoken Format
//!
//! The tiktoken format is a simple text-based format where each line contains:
//! - A base64-encoded piece (the byte sequence)
//! - A space separator
//! - A decimal rank (the piece's priority in BPE merging, doubling as its token id)
//!
//! Lower ranks indicate higher priority - pieces with lower ranks are merged
//! first during the BPE encoding process.
//!
//! ```text
//! SGVsbG8= 0
//! V29ybGQ= 1
//! IQ== 2
//! ```
//!
//! Where `SGVsbG8=` decodes to `Hello` (rank 0), `V29ybGQ=` to `World` (rank 1)
//! and `IQ==` to `!` (rank 2).
//!
//! # Invariants
//!
//! A [`Vocabulary`] is immutable once built. The piece → rank mapping is injective:
//! construction rejects two pieces sharing a rank, so the reverse table built
//! alongside the forward one is always well defined.

use std::collections::hash_map::Entry;

use base64::{engine::general_purpose::STANDARD, Engine};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Token id. Ranks double as the ids emitted by the codec.
pub type Rank = u32;

/// Rank the merge engine uses to mark a join that is not in the vocabulary.
/// No piece may be assigned it.
pub const RESERVED_RANK: Rank = Rank::MAX;

/// Errors that can occur when loading or validating a vocabulary.
#[derive(Error, Debug)]
pub enum VocabError {
    #[error("Invalid base64 encoding on line {line}: {source}")]
    Base64Error {
        line: usize,
        #[source]
        source: base64::DecodeError,
    },
    #[error("Invalid line format on line {line}: {reason}")]
    ParseError { line: usize, reason: String },
    #[error("Piece {0:?} is listed more than once")]
    DuplicatePiece(Vec<u8>),
    #[error("Rank {rank} is assigned to both {first:?} and {second:?}")]
    DuplicateRank {
        rank: Rank,
        first: Vec<u8>,
        second: Vec<u8>,
    },
    #[error("Piece {piece:?} uses reserved rank {rank}")]
    ReservedRank { piece: Vec<u8>, rank: Rank },
    #[error("Vocabulary is missing {0} of the 256 single-byte pieces")]
    IncompleteByteCoverage(usize),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Load a tiktoken BPE vocabulary from raw bytes.
///
/// Format: `base64_piece rank\n` per line. Blank lines are skipped, a trailing
/// `\r` is tolerated. Any other malformed line is an error.
pub fn load_tiktoken_bpe(data: &[u8]) -> Result<FxHashMap<Vec<u8>, Rank>, VocabError> {
    let mut encoder = FxHashMap::default();

    for (idx, line) in data.split(|&b| b == b'\n').enumerate() {
        let line_no = idx + 1;
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            continue;
        }

        let space_pos = line
            .iter()
            .rposition(|&b| b == b' ')
            .ok_or_else(|| VocabError::ParseError {
                line: line_no,
                reason: "missing space separator".to_string(),
            })?;

        let piece_b64 = &line[..space_pos];
        let rank_str = &line[space_pos + 1..];

        let piece = STANDARD
            .decode(piece_b64)
            .map_err(|source| VocabError::Base64Error {
                line: line_no,
                source,
            })?;
        if piece.is_empty() {
            return Err(VocabError::ParseError {
                line: line_no,
                reason: "empty piece".to_string(),
            });
        }

        let rank_str = std::str::from_utf8(rank_str).map_err(|_| VocabError::ParseError {
            line: line_no,
            reason: "invalid UTF-8 in rank".to_string(),
        })?;
        let rank: Rank = rank_str.parse().map_err(|_| VocabError::ParseError {
            line: line_no,
            reason: format!("invalid rank: {:?}", rank_str),
        })?;

        match encoder.entry(piece) {
            Entry::Occupied(e) => return Err(VocabError::DuplicatePiece(e.key().clone())),
            Entry::Vacant(e) => {
                e.insert(rank);
            }
        }
    }

    log::debug!("parsed tiktoken vocabulary with {} ranks", encoder.len());
    Ok(encoder)
}

/// Load a tiktoken BPE vocabulary from a file path.
pub fn load_tiktoken_bpe_file(
    path: impl AsRef<std::path::Path>,
) -> Result<FxHashMap<Vec<u8>, Rank>, VocabError> {
    let data = std::fs::read(path)?;
    load_tiktoken_bpe(&data)
}

/// Build a decoder map (rank → piece) from an encoder map (piece → rank).
///
/// Fails with [`VocabError::DuplicateRank`] if two pieces share a rank, or
/// [`VocabError::ReservedRank`] if a piece sits at [`RESERVED_RANK`].
pub fn build_decoder(
    encoder: &FxHashMap<Vec<u8>, Rank>,
) -> Result<FxHashMap<Rank, Vec<u8>>, VocabError> {
    let mut decoder = FxHashMap::with_capacity_and_hasher(encoder.len(), Default::default());
    for (piece, &rank) in encoder {
        if rank == RESERVED_RANK {
            return Err(VocabError::ReservedRank {
                piece: piece.clone(),
                rank,
            });
        }
        if let Some(first) = decoder.insert(rank, piece.clone()) {
            // Report the pair in a stable order regardless of map iteration.
            let (first, second) = if first <= *piece {
                (first, piece.clone())
            } else {
                (piece.clone(), first)
            };
            return Err(VocabError::DuplicateRank {
                rank,
                first,
                second,
            });
        }
    }
    Ok(decoder)
}

/// Immutable piece ↔ rank table for one encoding family.
///
/// Both directions are built at construction; nothing is initialized lazily.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    encoder: FxHashMap<Vec<u8>, Rank>,
    decoder: FxHashMap<Rank, Vec<u8>>,
}

impl Vocabulary {
    /// Build a vocabulary from a piece → rank map.
    pub fn new(encoder: FxHashMap<Vec<u8>, Rank>) -> Result<Self, VocabError> {
        let decoder = build_decoder(&encoder)?;
        Ok(Self { encoder, decoder })
    }

    /// Parse a tiktoken-format resource and build the vocabulary.
    pub fn from_tiktoken(data: &[u8]) -> Result<Self, VocabError> {
        Self::new(load_tiktoken_bpe(data)?)
    }

    /// Read a tiktoken-format file and build the vocabulary.
    pub fn from_tiktoken_file(path: impl AsRef<std::path::Path>) -> Result<Self, VocabError> {
        Self::new(load_tiktoken_bpe_file(path)?)
    }

    /// Rank of `piece`, or `None` if it needs further decomposition.
    #[inline]
    pub fn lookup(&self, piece: &[u8]) -> Option<Rank> {
        self.encoder.get(piece).copied()
    }

    /// Piece registered under `rank`.
    #[inline]
    pub fn reverse_lookup(&self, rank: Rank) -> Option<&[u8]> {
        self.decoder.get(&rank).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.encoder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoder.is_empty()
    }

    /// Largest rank in the table.
    pub fn max_rank(&self) -> Option<Rank> {
        self.decoder.keys().max().copied()
    }

    /// Single-byte values that have no piece of their own, in ascending order.
    pub fn missing_bytes(&self) -> Vec<u8> {
        (0..=u8::MAX)
            .filter(|b| !self.encoder.contains_key(std::slice::from_ref(b)))
            .collect()
    }

    /// Fail unless every byte value 0-255 is present as a one-byte piece.
    pub fn ensure_byte_coverage(&self) -> Result<(), VocabError> {
        match self.missing_bytes().len() {
            0 => Ok(()),
            n => Err(VocabError::IncompleteByteCoverage(n)),
        }
    }

    /// Iterate over `(piece, rank)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], Rank)> {
        self.encoder.iter().map(|(k, &v)| (k.as_slice(), v))
    }

    /// The forward map (piece → rank).
    pub fn encoder(&self) -> &FxHashMap<Vec<u8>, Rank> {
        &self.encoder
    }

    /// The reverse map (rank → piece).
    pub fn decoder(&self) -> &FxHashMap<Rank, Vec<u8>> {
        &self.decoder
    }
}
