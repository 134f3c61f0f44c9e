//! Encode command implementation.

use anyhow::{Context, Result};
use clap::Parser;
use tokcodec::{Codec, Encoded};

use super::{read_input, CodecArgs};

/// Encode command arguments.
#[derive(Parser)]
pub struct EncodeCommand {
    /// Text to encode (`-` reads stdin)
    pub text: String,

    /// Print token strings instead of ids
    #[arg(short, long, default_value_t = false)]
    pub tokens: bool,
}

pub fn encode_text<'t>(codec: &Codec, text: &'t str, special: bool) -> Result<Encoded<'t>> {
    let encoded = if special {
        codec.encode_with_special(text)
    } else {
        codec.encode(text)
    };
    encoded.context("error encoding text")
}

pub fn run(args: &CodecArgs, cmd: EncodeCommand) -> Result<()> {
    let codec = args.load()?;
    let text = read_input(cmd.text)?;

    let encoded = encode_text(&codec, &text, args.special)?;

    let output: Vec<String> = if cmd.tokens {
        encoded
            .pieces_lossy()
            .into_iter()
            .map(|piece| piece.into_owned())
            .collect()
    } else {
        encoded.ids.iter().map(|id| id.to_string()).collect()
    };
    println!("{}", output.join(" "));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::byte_codec;

    #[test]
    fn test_encode_text() {
        let codec = byte_codec(r"\S+|\s+");
        let encoded = encode_text(&codec, "hi", false).unwrap();
        assert_eq!(encoded.ids, vec![b'h' as u32, b'i' as u32]);
    }

    #[test]
    fn test_encode_failure_has_context() {
        let codec = byte_codec(r"(?:(?=((a|aa)*)\1c)a|\s+|\S)");
        let err = encode_text(&codec, &"a".repeat(60), false).unwrap_err();
        assert_eq!(err.to_string(), "error encoding text");
        assert!(matches!(
            err.downcast_ref::<tokcodec::CodecError>(),
            Some(tokcodec::CodecError::Match(_))
        ));
    }
}
