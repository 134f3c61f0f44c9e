//! Core tokenization engine for tokcodec.
//!
//! - [`vocab`]: piece/rank tables loaded from tiktoken format
//! - [`splitter`]: regex pre-tokenization into chunks
//! - [`bpe`]: rank-ordered byte-pair merging over a boundary array
//! - [`pool`]: reusable boundary arrays shared by concurrent merges
//! - [`Codec`]: encode/count/decode facade with special tokens, an LRU chunk
//!   cache and Rayon batch operations
//! - [`pretrained`] and [`model`]: encoding identifiers and model-name lookup

pub mod bpe;
mod codec;
pub mod model;
pub mod pool;
pub mod pretrained;
pub mod splitter;
pub mod vocab;

pub use bpe::{byte_pair_encode, byte_pair_merge, byte_pair_split, Span};
pub use codec::{Codec, CodecError, CodecOptions, Encoded, DEFAULT_CACHE_SIZE};
pub use model::{encoding_for_model, for_model};
pub use pretrained::Encoding;
pub use splitter::{Splitter, CL100K_BASE_PATTERN, O200K_BASE_PATTERN, R50K_BASE_PATTERN};
pub use vocab::{
    build_decoder, load_tiktoken_bpe, load_tiktoken_bpe_file, Rank, VocabError, Vocabulary,
    RESERVED_RANK,
};
