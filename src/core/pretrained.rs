//! Codec construction for the known encoding families.
//!
//! - `gpt2`, `r50k_base` - GPT-2 and the original GPT-3 models (~50k tokens)
//! - `p50k_base` - Codex and `text-davinci-002/003`
//! - `p50k_edit` - the edit models; p50k ranks plus FIM special tokens
//! - `cl100k_base` - GPT-4, GPT-3.5-turbo, `text-embedding-ada-002` (~100k tokens)
//! - `o200k_base` - GPT-4o (~200k tokens)
//!
//! Vocabulary ranks are read from `<dir>/<file>.tiktoken`. The directory is
//! passed explicitly to [`from_dir`] or taken from the `TOKCODEC_VOCAB_DIR`
//! environment variable by [`get`].
//!
//! # Example
//!
//! ```no_run
//! use tokcodec::pretrained::{self, Encoding};
//!
//! let codec = pretrained::get(Encoding::Cl100kBase).unwrap();
//! let encoded = codec.encode("supercalifragilistic").unwrap();
//! assert_eq!(codec.decode(&encoded.ids).unwrap(), "supercalifragilistic");
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rustc_hash::FxHashMap;

use super::codec::{Codec, CodecError};
use super::splitter::{CL100K_BASE_PATTERN, O200K_BASE_PATTERN, R50K_BASE_PATTERN};
use super::vocab::{Rank, Vocabulary};

/// Environment variable naming the directory that holds `*.tiktoken` files.
pub const VOCAB_DIR_ENV: &str = "TOKCODEC_VOCAB_DIR";

pub const ENDOFTEXT: &str = "<|endoftext|>";
pub const FIM_PREFIX: &str = "<|fim_prefix|>";
pub const FIM_MIDDLE: &str = "<|fim_middle|>";
pub const FIM_SUFFIX: &str = "<|fim_suffix|>";
pub const ENDOFPROMPT: &str = "<|endofprompt|>";

/// Supported encoding identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// GPT-2 (same ranks and grammar as r50k_base)
    Gpt2,
    R50kBase,
    P50kBase,
    P50kEdit,
    /// OpenAI cl100k_base (GPT-4, GPT-3.5-turbo)
    Cl100kBase,
    /// OpenAI o200k_base (GPT-4o)
    O200kBase,
}

impl Encoding {
    /// Every supported encoding, in table order.
    pub fn all() -> &'static [Encoding] {
        &[
            Self::Gpt2,
            Self::R50kBase,
            Self::P50kBase,
            Self::P50kEdit,
            Self::Cl100kBase,
            Self::O200kBase,
        ]
    }

    /// Parse an encoding identifier.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "gpt2" => Some(Self::Gpt2),
            "r50k_base" => Some(Self::R50kBase),
            "p50k_base" => Some(Self::P50kBase),
            "p50k_edit" => Some(Self::P50kEdit),
            "cl100k_base" => Some(Self::Cl100kBase),
            "o200k_base" => Some(Self::O200kBase),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Gpt2 => "gpt2",
            Self::R50kBase => "r50k_base",
            Self::P50kBase => "p50k_base",
            Self::P50kEdit => "p50k_edit",
            Self::Cl100kBase => "cl100k_base",
            Self::O200kBase => "o200k_base",
        }
    }

    /// Get all supported encoding names.
    pub fn supported_names() -> Vec<&'static str> {
        Self::all().iter().map(|e| e.name()).collect()
    }

    /// Split grammar for this encoding.
    pub fn pattern(self) -> &'static str {
        match self {
            Self::Gpt2 | Self::R50kBase | Self::P50kBase | Self::P50kEdit => R50K_BASE_PATTERN,
            Self::Cl100kBase => CL100K_BASE_PATTERN,
            Self::O200kBase => O200K_BASE_PATTERN,
        }
    }

    /// File holding this encoding's ranks. Some encodings share one.
    pub fn vocab_file(self) -> &'static str {
        match self {
            Self::Gpt2 | Self::R50kBase => "r50k_base.tiktoken",
            Self::P50kBase | Self::P50kEdit => "p50k_base.tiktoken",
            Self::Cl100kBase => "cl100k_base.tiktoken",
            Self::O200kBase => "o200k_base.tiktoken",
        }
    }

    /// Get the special tokens map for this encoding.
    pub fn special_tokens(self) -> FxHashMap<String, Rank> {
        let entries: &[(&str, Rank)] = match self {
            Self::Gpt2 | Self::R50kBase | Self::P50kBase => &[(ENDOFTEXT, 50256)],
            Self::P50kEdit => &[
                (ENDOFTEXT, 50256),
                (FIM_PREFIX, 50281),
                (FIM_MIDDLE, 50282),
                (FIM_SUFFIX, 50283),
            ],
            Self::Cl100kBase => &[
                (ENDOFTEXT, 100257),
                (FIM_PREFIX, 100258),
                (FIM_MIDDLE, 100259),
                (FIM_SUFFIX, 100260),
                (ENDOFPROMPT, 100276),
            ],
            Self::O200kBase => &[(ENDOFTEXT, 199999), (ENDOFPROMPT, 200018)],
        };
        entries
            .iter()
            .map(|&(token, rank)| (token.to_string(), rank))
            .collect()
    }

    /// Get the EOS (end of text) token ID.
    pub fn eos_token_id(self) -> Rank {
        match self {
            Self::Gpt2 | Self::R50kBase | Self::P50kBase | Self::P50kEdit => 50256,
            Self::Cl100kBase => 100257,
            Self::O200kBase => 199999,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| CodecError::UnsupportedEncoding(s.to_string()))
    }
}

/// Directory configured through [`VOCAB_DIR_ENV`], if any.
pub fn vocab_dir() -> Option<PathBuf> {
    std::env::var_os(VOCAB_DIR_ENV)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
}

/// Build a codec for `encoding` from an already-loaded vocabulary.
///
/// Fails if the vocabulary does not cover every single byte.
pub fn from_vocabulary(encoding: Encoding, vocab: Vocabulary) -> Result<Codec, CodecError> {
    vocab.ensure_byte_coverage()?;
    Codec::new(
        encoding.name(),
        vocab,
        encoding.special_tokens(),
        encoding.pattern(),
    )
}

/// Build a codec for `encoding` from raw tiktoken-format bytes.
pub fn from_bytes(encoding: Encoding, vocab_data: &[u8]) -> Result<Codec, CodecError> {
    from_vocabulary(encoding, Vocabulary::from_tiktoken(vocab_data)?)
}

/// Build a codec for `encoding` from the matching file under `dir`.
pub fn from_dir(encoding: Encoding, dir: impl AsRef<Path>) -> Result<Codec, CodecError> {
    let path = dir.as_ref().join(encoding.vocab_file());
    log::debug!("loading {} ranks from {}", encoding, path.display());
    from_vocabulary(encoding, Vocabulary::from_tiktoken_file(&path)?)
}

/// Build a codec for `encoding` from the directory named by [`VOCAB_DIR_ENV`].
pub fn get(encoding: Encoding) -> Result<Codec, CodecError> {
    let dir = vocab_dir().ok_or(CodecError::VocabDirUnset(VOCAB_DIR_ENV))?;
    from_dir(encoding, dir)
}

/// Build a codec by encoding identifier.
pub fn get_by_name(name: &str) -> Result<Codec, CodecError> {
    get(name.parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for &encoding in Encoding::all() {
            assert_eq!(Encoding::from_name(encoding.name()), Some(encoding));
            assert_eq!(encoding.to_string().parse::<Encoding>().unwrap(), encoding);
        }
        assert_eq!(Encoding::supported_names().len(), Encoding::all().len());
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(Encoding::from_name("cl100k"), None);
        assert!(matches!(
            "p50k".parse::<Encoding>(),
            Err(CodecError::UnsupportedEncoding(name)) if name == "p50k"
        ));
    }

    #[test]
    fn test_shared_vocab_files() {
        assert_eq!(Encoding::Gpt2.vocab_file(), Encoding::R50kBase.vocab_file());
        assert_eq!(Encoding::P50kEdit.vocab_file(), Encoding::P50kBase.vocab_file());
        assert_eq!(Encoding::Gpt2.pattern(), Encoding::R50kBase.pattern());
    }

    #[test]
    fn test_special_tokens() {
        let edit = Encoding::P50kEdit.special_tokens();
        assert_eq!(edit.get(FIM_MIDDLE), Some(&50282));
        assert_eq!(edit.len(), 4);

        let cl100k = Encoding::Cl100kBase.special_tokens();
        assert_eq!(cl100k.get(ENDOFPROMPT), Some(&100276));
        assert_eq!(cl100k.get(ENDOFTEXT), Some(&Encoding::Cl100kBase.eos_token_id()));

        for &encoding in Encoding::all() {
            assert_eq!(
                encoding.special_tokens().get(ENDOFTEXT),
                Some(&encoding.eos_token_id())
            );
        }
    }

    #[test]
    fn test_from_vocabulary_requires_byte_coverage() {
        let vocab = Vocabulary::from_tiktoken(b"YQ== 0\nYg== 1\n").unwrap();
        assert!(matches!(
            from_vocabulary(Encoding::Cl100kBase, vocab),
            Err(CodecError::Vocab(
                crate::core::vocab::VocabError::IncompleteByteCoverage(254)
            ))
        ));
    }
}
