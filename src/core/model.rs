//! Model name to encoding resolution.

use super::codec::{Codec, CodecError};
use super::pretrained::Encoding::*;
use super::pretrained::{self, Encoding};

/// Exact model names.
static MODEL_TO_ENCODING: &[(&str, Encoding)] = &[
    // chat
    ("gpt-4o", O200kBase),
    ("gpt-4", Cl100kBase),
    ("gpt-3.5-turbo", Cl100kBase),
    ("gpt-35-turbo", Cl100kBase), // Azure deployment name
    // base
    ("davinci-002", Cl100kBase),
    ("babbage-002", Cl100kBase),
    // embeddings
    ("text-embedding-ada-002", Cl100kBase),
    // text (deprecated)
    ("text-davinci-003", P50kBase),
    ("text-davinci-002", P50kBase),
    ("text-davinci-001", R50kBase),
    ("text-curie-001", R50kBase),
    ("text-babbage-001", R50kBase),
    ("text-ada-001", R50kBase),
    ("davinci", R50kBase),
    ("curie", R50kBase),
    ("babbage", R50kBase),
    ("ada", R50kBase),
    // code (deprecated)
    ("code-davinci-002", P50kBase),
    ("code-davinci-001", P50kBase),
    ("code-cushman-002", P50kBase),
    ("code-cushman-001", P50kBase),
    ("davinci-codex", P50kBase),
    ("cushman-codex", P50kBase),
    // edit (deprecated)
    ("text-davinci-edit-001", P50kEdit),
    ("code-davinci-edit-001", P50kEdit),
    // old embeddings (deprecated)
    ("text-similarity-davinci-001", R50kBase),
    ("text-similarity-curie-001", R50kBase),
    ("text-similarity-babbage-001", R50kBase),
    ("text-similarity-ada-001", R50kBase),
    ("text-search-davinci-doc-001", R50kBase),
    ("text-search-curie-doc-001", R50kBase),
    ("text-search-babbage-doc-001", R50kBase),
    ("text-search-ada-doc-001", R50kBase),
    ("code-search-babbage-code-001", R50kBase),
    ("code-search-ada-code-001", R50kBase),
    // open source
    ("gpt2", Gpt2),
];

/// Model name prefixes, for dated snapshots and fine-tunes.
static MODEL_PREFIX_TO_ENCODING: &[(&str, Encoding)] = &[
    // chat
    ("gpt-4o-", O200kBase), // e.g. gpt-4o-2024-05-13
    ("chatgpt-4o-", O200kBase),
    ("gpt-4-", Cl100kBase), // e.g. gpt-4-0314, gpt-4-32k
    ("gpt-3.5-turbo-", Cl100kBase),
    ("gpt-35-turbo-", Cl100kBase),
    // fine-tuned
    ("ft:gpt-4o", O200kBase),
    ("ft:gpt-4", Cl100kBase),
    ("ft:gpt-3.5-turbo", Cl100kBase),
    ("ft:davinci-002", Cl100kBase),
    ("ft:babbage-002", Cl100kBase),
];

/// Resolve the encoding used by `model`.
///
/// Exact names are checked first. Otherwise the longest matching prefix wins,
/// so `ft:gpt-4o-mini:org` resolves through `ft:gpt-4o` rather than `ft:gpt-4`.
pub fn encoding_for_model(model: &str) -> Result<Encoding, CodecError> {
    if let Some(&(_, encoding)) = MODEL_TO_ENCODING.iter().find(|(name, _)| *name == model) {
        return Ok(encoding);
    }

    MODEL_PREFIX_TO_ENCODING
        .iter()
        .filter(|(prefix, _)| model.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|&(_, encoding)| encoding)
        .ok_or_else(|| CodecError::UnsupportedModel(model.to_string()))
}

/// Build the codec for `model` from the configured vocabulary directory.
pub fn for_model(model: &str) -> Result<Codec, CodecError> {
    pretrained::get(encoding_for_model(model)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_names() {
        assert_eq!(encoding_for_model("gpt-4").unwrap(), Cl100kBase);
        assert_eq!(encoding_for_model("gpt-3.5-turbo").unwrap(), Cl100kBase);
        assert_eq!(encoding_for_model("text-davinci-003").unwrap(), P50kBase);
        assert_eq!(
            encoding_for_model("code-davinci-edit-001").unwrap(),
            P50kEdit
        );
        assert_eq!(encoding_for_model("davinci").unwrap(), R50kBase);
        assert_eq!(encoding_for_model("gpt2").unwrap(), Gpt2);
        assert_eq!(encoding_for_model("gpt-4o").unwrap(), O200kBase);
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(encoding_for_model("gpt-4-0314").unwrap(), Cl100kBase);
        assert_eq!(encoding_for_model("gpt-35-turbo-16k").unwrap(), Cl100kBase);
        assert_eq!(encoding_for_model("gpt-4o-2024-05-13").unwrap(), O200kBase);
        assert_eq!(
            encoding_for_model("ft:davinci-002:org::id").unwrap(),
            Cl100kBase
        );
    }

    #[test]
    fn test_longest_prefix_wins() {
        assert_eq!(
            encoding_for_model("ft:gpt-4o-mini:org").unwrap(),
            O200kBase
        );
        assert_eq!(encoding_for_model("ft:gpt-4-0613:org").unwrap(), Cl100kBase);
    }

    #[test]
    fn test_unsupported_model() {
        for model in ["", "gpt-5", "llama", "gpt-4o2"] {
            assert!(
                matches!(
                    encoding_for_model(model),
                    Err(CodecError::UnsupportedModel(ref m)) if m == model
                ),
                "{model} should be rejected"
            );
        }
    }

    #[test]
    fn test_every_table_entry_resolves() {
        for &(name, encoding) in MODEL_TO_ENCODING {
            assert_eq!(encoding_for_model(name).unwrap(), encoding, "{name}");
        }
    }
}
