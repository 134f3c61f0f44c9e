//! Pre-tokenization: partitioning text into chunks with an encoding's pattern.
//!
//! Each encoding family ships its own split grammar. The grammar is data: the
//! splitter only relies on it matching every character of the input exactly once,
//! in order. Matching is lazy and fallible; a backtracking fault surfaces as
//! [`CodecError::Match`] from the iterator instead of being dropped.

use fancy_regex::Regex as FancyRegex;

#[cfg(feature = "pcre2")]
use pcre2::bytes::{Regex as Pcre2Regex, RegexBuilder as Pcre2RegexBuilder};

use super::codec::CodecError;

/// Split pattern for r50k_base, p50k_base, p50k_edit and gpt2.
pub const R50K_BASE_PATTERN: &str =
    r"'s|'t|'re|'ve|'m|'ll|'d| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+";

/// Default regex pattern for cl100k_base (GPT-4, GPT-3.5-turbo)
pub const CL100K_BASE_PATTERN: &str = r"(?i:'s|'t|'re|'ve|'m|'ll|'d)|[^\r\n\p{L}\p{N}]?\p{L}+|\p{N}{1,3}| ?[^\s\p{L}\p{N}]+[\r\n]*|\s*[\r\n]+|\s+(?!\S)|\s+";

/// Default regex pattern for o200k_base (GPT-4o)
pub const O200K_BASE_PATTERN: &str = r"[^\r\n\p{L}\p{N}]?[\p{Lu}\p{Lt}\p{Lm}\p{Lo}\p{M}]*[\p{Ll}\p{Lm}\p{Lo}\p{M}]+(?i:'s|'t|'re|'ve|'m|'ll|'d)?|[^\r\n\p{L}\p{N}]?[\p{Lu}\p{Lt}\p{Lm}\p{Lo}\p{M}]+[\p{Ll}\p{Lm}\p{Lo}\p{M}]*(?i:'s|'t|'re|'ve|'m|'ll|'d)?|\p{N}{1,3}| ?[^\s\p{L}\p{N}]+[\r\n]*|\s*[\r\n]+|\s+(?!\S)|\s+";

/// Regex backend enum for switching between fancy-regex (default) and PCRE2 (optional)
#[derive(Debug)]
enum RegexBackend {
    Fancy(Box<FancyRegex>),
    #[cfg(feature = "pcre2")]
    Pcre2(Pcre2Regex),
}

/// Compiled split grammar.
#[derive(Debug)]
pub struct Splitter {
    regex: RegexBackend,
    pattern: String,
}

impl Splitter {
    /// Compile `pattern` with the fancy-regex backend.
    pub fn new(pattern: &str) -> Result<Self, CodecError> {
        let regex = FancyRegex::new(pattern)?;
        Ok(Self {
            regex: RegexBackend::Fancy(Box::new(regex)),
            pattern: pattern.to_string(),
        })
    }

    /// Compile `pattern` with PCRE2 in UTF/UCP mode, using the JIT when the
    /// platform supports it.
    #[cfg(feature = "pcre2")]
    pub fn pcre2(pattern: &str) -> Result<Self, CodecError> {
        let mut builder = Pcre2RegexBuilder::new();
        builder.jit_if_available(true);
        builder.utf(true);
        builder.ucp(true);
        let regex = builder.build(pattern)?;
        Ok(Self {
            regex: RegexBackend::Pcre2(regex),
            pattern: pattern.to_string(),
        })
    }

    /// Source text of the grammar.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Name of the active regex engine.
    pub fn backend(&self) -> &'static str {
        match self.regex {
            RegexBackend::Fancy(_) => "fancy-regex",
            #[cfg(feature = "pcre2")]
            RegexBackend::Pcre2(_) => "pcre2",
        }
    }

    /// Lazily iterate over the chunks of `text`, left to right.
    ///
    /// Each call starts a fresh scan; empty matches are skipped.
    pub fn split<'r, 't>(&'r self, text: &'t str) -> Chunks<'r, 't> {
        let inner = match &self.regex {
            RegexBackend::Fancy(regex) => ChunksInner::Fancy(regex.find_iter(text)),
            #[cfg(feature = "pcre2")]
            RegexBackend::Pcre2(regex) => ChunksInner::Pcre2(regex.find_iter(text.as_bytes())),
        };
        Chunks { text, inner }
    }

    /// Eagerly collect the chunks of `text`, failing on the first matching fault.
    pub fn split_all<'t>(&self, text: &'t str) -> Result<Vec<&'t str>, CodecError> {
        self.split(text).collect()
    }
}

enum ChunksInner<'r, 't> {
    Fancy(fancy_regex::Matches<'r, 't>),
    #[cfg(feature = "pcre2")]
    Pcre2(pcre2::bytes::Matches<'r, 't>),
}

/// Iterator over the chunks of one input, created by [`Splitter::split`].
pub struct Chunks<'r, 't> {
    text: &'t str,
    inner: ChunksInner<'r, 't>,
}

impl<'t> Iterator for Chunks<'_, 't> {
    type Item = Result<&'t str, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (start, end) = match &mut self.inner {
                ChunksInner::Fancy(matches) => match matches.next()? {
                    Ok(m) => (m.start(), m.end()),
                    Err(e) => return Some(Err(CodecError::Match(e.to_string()))),
                },
                #[cfg(feature = "pcre2")]
                ChunksInner::Pcre2(matches) => match matches.next()? {
                    Ok(m) => (m.start(), m.end()),
                    Err(e) => return Some(Err(CodecError::Match(e.to_string()))),
                },
            };
            if start < end {
                return Some(Ok(&self.text[start..end]));
            }
        }
    }
}
