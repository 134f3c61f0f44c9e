use std::borrow::Cow;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use aho_corasick::{AhoCorasick, MatchKind};
use lru::LruCache;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::bpe::{byte_pair_spans, Span};
use super::pool::{PartPool, DEFAULT_PART_CAPACITY, MAX_IDLE_PARTS, MAX_POOLED_PART_CAPACITY};
use super::splitter::Splitter;
use super::vocab::{Rank, VocabError, Vocabulary};

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Invalid split pattern: {0}")]
    Pattern(#[from] fancy_regex::Error),
    #[cfg(feature = "pcre2")]
    #[error("Invalid split pattern (PCRE2): {0}")]
    Pcre2Pattern(#[from] pcre2::Error),
    #[error("error matching: {0}")]
    Match(String),
    #[error("Vocabulary error: {0}")]
    Vocab(#[from] VocabError),
    #[error("invalid token: {0}")]
    UnknownTokenId(Rank),
    #[error("Piece {0:?} is not in the vocabulary")]
    UnknownPiece(Vec<u8>),
    #[error("Special token {token:?} reuses rank {rank}")]
    SpecialRankConflict { token: String, rank: Rank },
    #[error("Decoding error: invalid UTF-8")]
    Utf8Error,
    #[error("Aho-Corasick build error: {0}")]
    AhoCorasickError(#[from] aho_corasick::BuildError),
    #[error("PCRE2 feature not enabled. Compile with --features pcre2")]
    Pcre2NotEnabled,
    #[error("encoding not supported: {0}")]
    UnsupportedEncoding(String),
    #[error("model not supported: {0}")]
    UnsupportedModel(String),
    #[error("Vocabulary directory not configured. Set {0} or pass a directory explicitly")]
    VocabDirUnset(&'static str),
}

/// Default cache size for encoded chunks
pub const DEFAULT_CACHE_SIZE: usize = 4096;

/// Tuning knobs for a [`Codec`]. None of them change the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecOptions {
    /// Chunk cache capacity in entries; `0` disables the cache.
    pub cache_size: usize,
    /// Capacity of a freshly allocated boundary array.
    pub part_capacity: usize,
    /// Boundary arrays that grew past this are not returned to the pool.
    pub max_part_capacity: usize,
    /// Maximum number of idle boundary arrays kept by the pool.
    pub max_idle_parts: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            part_capacity: DEFAULT_PART_CAPACITY,
            max_part_capacity: MAX_POOLED_PART_CAPACITY,
            max_idle_parts: MAX_IDLE_PARTS,
        }
    }
}

/// Ids and pieces produced by one encode call.
///
/// `pieces[i]` is the input slice that produced `ids[i]`; concatenating the
/// pieces in order yields the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encoded<'t> {
    pub ids: Vec<Rank>,
    pub pieces: Vec<&'t [u8]>,
}

impl<'t> Encoded<'t> {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[inline]
    fn push(&mut self, id: Rank, piece: &'t [u8]) {
        self.ids.push(id);
        self.pieces.push(piece);
    }

    /// Pieces rendered as text; bytes that split a UTF-8 sequence become U+FFFD.
    pub fn pieces_lossy(&self) -> Vec<Cow<'t, str>> {
        self.pieces
            .iter()
            .map(|p| String::from_utf8_lossy(p))
            .collect()
    }
}

/// BPE codec for one encoding family.
///
/// Immutable after construction and `Sync`: a single instance can serve
/// concurrent callers. The only interior mutability is the chunk cache and
/// the scratch-buffer pool, both mutex guarded.
///
/// # Performance Characteristics
///
/// - **Single text encoding**: sequential via [`Codec::encode`].
/// - **Batch encoding**: Rayon parallelism across texts via [`Codec::encode_batch`].
///
/// # Regex Backend
///
/// By default, uses `fancy-regex`. To use PCRE2 instead, enable the `pcre2`
/// feature and call `.pcre2(true)`:
///
/// ```ignore
/// let codec = tokcodec::pretrained::get(Encoding::Cl100kBase)?.pcre2(true)?;
/// ```
pub struct Codec {
    name: String,
    vocab: Vocabulary,
    special_tokens: FxHashMap<String, Rank>,
    special_tokens_decoder: FxHashMap<Rank, String>,
    special_token_strings: Vec<String>,
    special_matcher: Option<AhoCorasick>,
    splitter: Splitter,
    parts: PartPool,
    chunk_cache: Option<Mutex<LruCache<Vec<u8>, Vec<Span>>>>,
    cache_size: usize,
}

impl Codec {
    /// Create a new codec from a vocabulary, special tokens, and split pattern.
    ///
    /// # Arguments
    /// * `name` - Encoding identifier reported by [`Codec::name`]
    /// * `vocab` - Piece/rank table
    /// * `special_tokens` - Map of special token strings to ranks
    /// * `pattern` - Regex pattern for pre-tokenization
    pub fn new(
        name: impl Into<String>,
        vocab: Vocabulary,
        special_tokens: FxHashMap<String, Rank>,
        pattern: &str,
    ) -> Result<Self, CodecError> {
        Self::with_cache_size(name, vocab, special_tokens, pattern, DEFAULT_CACHE_SIZE)
    }

    /// Create a new codec with a custom chunk cache size. `0` disables the cache.
    pub fn with_cache_size(
        name: impl Into<String>,
        vocab: Vocabulary,
        special_tokens: FxHashMap<String, Rank>,
        pattern: &str,
        cache_size: usize,
    ) -> Result<Self, CodecError> {
        let options = CodecOptions {
            cache_size,
            ..CodecOptions::default()
        };
        Self::with_options(name, vocab, special_tokens, pattern, options)
    }

    /// Create a new codec with explicit cache and pool settings.
    pub fn with_options(
        name: impl Into<String>,
        vocab: Vocabulary,
        special_tokens: FxHashMap<String, Rank>,
        pattern: &str,
        options: CodecOptions,
    ) -> Result<Self, CodecError> {
        let name = name.into();
        let splitter = Splitter::new(pattern)?;

        // Special ranks must not shadow vocabulary ranks or each other.
        let mut special_tokens_decoder = FxHashMap::default();
        let mut sorted: Vec<(&String, &Rank)> = special_tokens.iter().collect();
        sorted.sort();
        for (token, &rank) in sorted {
            if vocab.reverse_lookup(rank).is_some()
                || special_tokens_decoder.insert(rank, token.clone()).is_some()
            {
                return Err(CodecError::SpecialRankConflict {
                    token: token.clone(),
                    rank,
                });
            }
        }

        // Leftmost-longest so a literal never loses to one of its own prefixes.
        let special_token_strings: Vec<String> = special_tokens.keys().cloned().collect();
        let special_matcher = if special_token_strings.is_empty() {
            None
        } else {
            Some(
                AhoCorasick::builder()
                    .match_kind(MatchKind::LeftmostLongest)
                    .build(&special_token_strings)?,
            )
        };

        let cache_size = options.cache_size;
        let chunk_cache = NonZeroUsize::new(cache_size).map(|n| Mutex::new(LruCache::new(n)));

        log::debug!(
            "built codec {} ({} ranks, {} special tokens, {})",
            name,
            vocab.len(),
            special_tokens.len(),
            splitter.backend()
        );

        Ok(Self {
            name,
            vocab,
            special_tokens,
            special_tokens_decoder,
            special_token_strings,
            special_matcher,
            splitter,
            parts: PartPool::with_limits(
                options.part_capacity,
                options.max_part_capacity,
                options.max_idle_parts,
            ),
            chunk_cache,
            cache_size,
        })
    }

    /// Create a codec from raw tiktoken-format vocabulary bytes.
    pub fn from_bytes(
        name: impl Into<String>,
        vocab_data: &[u8],
        pattern: &str,
        special_tokens: FxHashMap<String, Rank>,
    ) -> Result<Self, CodecError> {
        let vocab = Vocabulary::from_tiktoken(vocab_data)?;
        Self::new(name, vocab, special_tokens, pattern)
    }

    /// Create a codec from a tiktoken vocabulary file.
    pub fn from_file(
        name: impl Into<String>,
        vocab_path: impl AsRef<std::path::Path>,
        pattern: &str,
        special_tokens: FxHashMap<String, Rank>,
    ) -> Result<Self, CodecError> {
        let vocab = Vocabulary::from_tiktoken_file(vocab_path)?;
        Self::new(name, vocab, special_tokens, pattern)
    }

    /// Switch to PCRE2 regex backend.
    ///
    /// # Errors
    /// Returns an error if `pcre2` feature is not enabled or regex compilation fails.
    #[cfg(feature = "pcre2")]
    pub fn pcre2(mut self, use_pcre2: bool) -> Result<Self, CodecError> {
        let pattern = self.splitter.pattern().to_string();
        self.splitter = if use_pcre2 {
            Splitter::pcre2(&pattern)?
        } else {
            Splitter::new(&pattern)?
        };
        Ok(self)
    }

    /// Switch to PCRE2 regex backend (stub when feature not enabled).
    #[cfg(not(feature = "pcre2"))]
    pub fn pcre2(self, use_pcre2: bool) -> Result<Self, CodecError> {
        if use_pcre2 {
            Err(CodecError::Pcre2NotEnabled)
        } else {
            Ok(self)
        }
    }

    /// Encoding identifier this codec was built for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve one chunk that is not itself a vocabulary piece.
    fn merge_chunk(&self, chunk: &[u8]) -> Result<Vec<Span>, CodecError> {
        let Some(cache) = &self.chunk_cache else {
            return byte_pair_spans(chunk, &self.vocab, &self.parts);
        };

        if let Ok(mut cache) = cache.lock() {
            if let Some(cached) = cache.get(chunk) {
                return Ok(cached.clone());
            }
        }

        let spans = byte_pair_spans(chunk, &self.vocab, &self.parts)?;

        if let Ok(mut cache) = cache.lock() {
            cache.put(chunk.to_vec(), spans.clone());
        }

        Ok(spans)
    }

    fn encode_ordinary_into<'t>(
        &self,
        text: &'t str,
        out: &mut Encoded<'t>,
    ) -> Result<(), CodecError> {
        for chunk in self.splitter.split(text) {
            let chunk = chunk?.as_bytes();

            // Fast path: check if entire chunk is a known piece
            if let Some(rank) = self.vocab.lookup(chunk) {
                out.push(rank, chunk);
                continue;
            }

            for span in self.merge_chunk(chunk)? {
                out.push(span.rank, &chunk[span.start..span.end]);
            }
        }
        Ok(())
    }

    fn count_ordinary(&self, text: &str) -> Result<usize, CodecError> {
        let mut count = 0;
        for chunk in self.splitter.split(text) {
            let chunk = chunk?.as_bytes();
            count += if self.vocab.lookup(chunk).is_some() {
                1
            } else {
                self.merge_chunk(chunk)?.len()
            };
        }
        Ok(count)
    }

    /// Encode text to ids and pieces. Special-token text is treated as ordinary text.
    pub fn encode<'t>(&self, text: &'t str) -> Result<Encoded<'t>, CodecError> {
        let mut out = Encoded::default();
        self.encode_ordinary_into(text, &mut out)?;
        Ok(out)
    }

    /// Encode text, mapping special-token literals directly to their ranks.
    pub fn encode_with_special<'t>(&self, text: &'t str) -> Result<Encoded<'t>, CodecError> {
        let Some(special_matcher) = &self.special_matcher else {
            return self.encode(text);
        };

        let mut out = Encoded::default();
        let mut last_end = 0;

        for m in special_matcher.find_iter(text) {
            if m.start() > last_end {
                self.encode_ordinary_into(&text[last_end..m.start()], &mut out)?;
            }

            let token_str = &self.special_token_strings[m.pattern().as_usize()];
            if let Some(&rank) = self.special_tokens.get(token_str) {
                out.push(rank, text[m.start()..m.end()].as_bytes());
            }

            last_end = m.end();
        }

        if last_end < text.len() {
            self.encode_ordinary_into(&text[last_end..], &mut out)?;
        }

        Ok(out)
    }

    /// Number of tokens [`Codec::encode`] would produce, without materializing them.
    pub fn count(&self, text: &str) -> Result<usize, CodecError> {
        self.count_ordinary(text)
    }

    /// Number of tokens [`Codec::encode_with_special`] would produce.
    pub fn count_with_special(&self, text: &str) -> Result<usize, CodecError> {
        let Some(special_matcher) = &self.special_matcher else {
            return self.count(text);
        };

        let mut count = 0;
        let mut last_end = 0;
        for m in special_matcher.find_iter(text) {
            if m.start() > last_end {
                count += self.count_ordinary(&text[last_end..m.start()])?;
            }
            count += 1;
            last_end = m.end();
        }
        if last_end < text.len() {
            count += self.count_ordinary(&text[last_end..])?;
        }
        Ok(count)
    }

    /// Decode ids back to bytes, failing on the first unknown id.
    pub fn decode_bytes(&self, tokens: &[Rank]) -> Result<Vec<u8>, CodecError> {
        let mut result = Vec::with_capacity(tokens.len() * 4);

        for &token in tokens {
            if let Some(bytes) = self.vocab.reverse_lookup(token) {
                result.extend_from_slice(bytes);
            } else if let Some(special) = self.special_tokens_decoder.get(&token) {
                result.extend_from_slice(special.as_bytes());
            } else {
                return Err(CodecError::UnknownTokenId(token));
            }
        }

        Ok(result)
    }

    /// Decode ids to a string.
    pub fn decode(&self, tokens: &[Rank]) -> Result<String, CodecError> {
        let bytes = self.decode_bytes(tokens)?;
        String::from_utf8(bytes).map_err(|_| CodecError::Utf8Error)
    }

    /// Decode ids to a string, replacing invalid UTF-8 with the replacement character.
    pub fn decode_lossy(&self, tokens: &[Rank]) -> Result<String, CodecError> {
        let bytes = self.decode_bytes(tokens)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Batch encode multiple texts in parallel, returning ids only.
    pub fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<Rank>>, CodecError> {
        texts
            .par_iter()
            .map(|text| self.encode(text).map(|e| e.ids))
            .collect()
    }

    /// Batch encode multiple texts with special token handling.
    pub fn encode_batch_with_special(
        &self,
        texts: &[String],
    ) -> Result<Vec<Vec<Rank>>, CodecError> {
        texts
            .par_iter()
            .map(|text| self.encode_with_special(text).map(|e| e.ids))
            .collect()
    }

    /// Batch count multiple texts in parallel.
    pub fn count_batch(&self, texts: &[String]) -> Result<Vec<usize>, CodecError> {
        texts.par_iter().map(|text| self.count(text)).collect()
    }

    /// Batch decode multiple token lists in parallel.
    pub fn decode_batch(&self, token_lists: &[Vec<Rank>]) -> Result<Vec<String>, CodecError> {
        token_lists
            .par_iter()
            .map(|tokens| self.decode(tokens))
            .collect()
    }

    /// Total number of token ids (max rank across vocabulary and special tokens + 1).
    pub fn vocab_size(&self) -> usize {
        let max_vocab = self.vocab.max_rank();
        let max_special = self.special_tokens.values().max().copied();
        max_vocab
            .max(max_special)
            .map_or(0, |max| max as usize + 1)
    }

    /// The piece/rank table.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Get the special tokens map.
    pub fn special_tokens(&self) -> &FxHashMap<String, Rank> {
        &self.special_tokens
    }

    /// The compiled split grammar.
    pub fn splitter(&self) -> &Splitter {
        &self.splitter
    }

    /// Clear the encoding cache.
    pub fn clear_cache(&self) {
        if let Some(Ok(mut cache)) = self.chunk_cache.as_ref().map(Mutex::lock) {
            cache.clear();
        }
    }

    /// Get the current cache size.
    pub fn cache_len(&self) -> usize {
        match &self.chunk_cache {
            Some(cache) => cache.lock().map(|c| c.len()).unwrap_or(0),
            None => 0,
        }
    }

    /// Configured cache capacity (`0` when caching is disabled).
    pub fn cache_capacity(&self) -> usize {
        self.cache_size
    }
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("name", &self.name)
            .field("vocab_len", &self.vocab.len())
            .field("special_tokens", &self.special_tokens.len())
            .field("pattern", &self.splitter.pattern())
            .field("cache_size", &self.cache_size)
            .finish()
    }
}
