//! Integration tests for cl100k_base (GPT-4, GPT-3.5-turbo) against the real ranks.
//!
//! These need `cl100k_base.tiktoken` in `$TOKCODEC_VOCAB_DIR` and are ignored by
//! default. Run with `cargo test -- --ignored`.

use tokcodec::pretrained::{self, Encoding};
use tokcodec::Codec;

fn create_cl100k_codec() -> Codec {
    pretrained::get(Encoding::Cl100kBase).expect("cl100k_base.tiktoken in TOKCODEC_VOCAB_DIR")
}

/// Test known token ids.
#[test]
#[ignore = "needs cl100k_base.tiktoken"]
fn test_cl100k_known_ids() {
    let codec = create_cl100k_codec();
    assert_eq!(codec.encode("hello world").unwrap().ids, vec![15339, 1917]);
    assert_eq!(codec.encode("").unwrap().ids, Vec::<u32>::new());
}

/// Test basic encoding and decoding roundtrip.
#[test]
#[ignore = "needs cl100k_base.tiktoken"]
fn test_cl100k_encode_decode_roundtrip() {
    let codec = create_cl100k_codec();

    let test_cases = vec![
        "Hello, world!",
        "The quick brown fox jumps over the lazy dog.",
        "Rust is a systems programming language.",
        "1234567890",
        "Special characters: !@#$%^&*()",
        "Multi-line\ntext\nwith\nnewlines",
        "Unicode: こんにちは 世界 🦀",
    ];

    for text in test_cases {
        let encoded = codec.encode(text).unwrap();
        let decoded = codec.decode(&encoded.ids).unwrap();
        assert_eq!(decoded, text, "Roundtrip failed for: {:?}", text);
        assert_eq!(codec.count(text).unwrap(), encoded.len());
    }
}

/// Test that vocab size is correct (100,256 BPE tokens plus special tokens).
#[test]
#[ignore = "needs cl100k_base.tiktoken"]
fn test_cl100k_vocab_size() {
    let codec = create_cl100k_codec();
    assert_eq!(codec.vocabulary().len(), 100256);
    assert_eq!(codec.vocab_size(), 100277);
}

/// Test OpenAI standard special tokens.
#[test]
#[ignore = "needs cl100k_base.tiktoken"]
fn test_cl100k_special_tokens() {
    let codec = create_cl100k_codec();

    let encoded = codec.encode_with_special("Hello<|endoftext|>World").unwrap();
    assert!(
        encoded.ids.contains(&100257),
        "Should contain endoftext (100257)"
    );

    let encoded = codec
        .encode_with_special("<|fim_prefix|>code<|fim_middle|>")
        .unwrap();
    assert_eq!(encoded.ids.first(), Some(&100258));
    assert_eq!(encoded.ids.last(), Some(&100259));
}
