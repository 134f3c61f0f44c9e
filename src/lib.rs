//! tokcodec - byte-pair encoding for OpenAI-compatible vocabularies.
//!
//! A [`Codec`] turns text into token ids and back for one encoding family
//! (`r50k_base`, `p50k_base`, `p50k_edit`, `cl100k_base`, `o200k_base`, `gpt2`):
//! - regex pre-tokenization (fancy-regex, or PCRE2 with the `pcre2` feature)
//! - greedy rank-ordered merging inside each chunk
//! - Aho-Corasick special token matching
//! - an LRU cache for frequently encoded chunks
//! - Rayon parallelism for batch calls
//!
//! ```no_run
//! use tokcodec::{encoding_for_model, pretrained};
//!
//! let encoding = encoding_for_model("gpt-4")?;
//! let codec = pretrained::from_dir(encoding, "/usr/share/tiktoken")?;
//! let encoded = codec.encode("hello world")?;
//! println!("{:?}", encoded.ids);
//! # Ok::<(), tokcodec::CodecError>(())
//! ```

pub mod core;

pub use crate::core::{
    encoding_for_model, for_model, model, pretrained, Codec, CodecError, CodecOptions, Encoded,
    Encoding, Rank, Splitter, VocabError, Vocabulary, CL100K_BASE_PATTERN, O200K_BASE_PATTERN,
    R50K_BASE_PATTERN,
};
