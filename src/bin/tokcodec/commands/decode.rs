//! Decode command implementation.

use anyhow::{Context, Result};
use clap::Parser;
use tokcodec::{Codec, Rank};

use super::CodecArgs;

/// Decode command arguments.
#[derive(Parser)]
pub struct DecodeCommand {
    /// Token ids, separated by whitespace
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<String>,
}

/// Every whitespace-separated field across `args` as a token id.
pub fn parse_ids(args: &[String]) -> Result<Vec<Rank>> {
    args.iter()
        .flat_map(|arg| arg.split_whitespace())
        .map(|field| {
            field
                .parse::<Rank>()
                .with_context(|| format!("invalid token id: {field}"))
        })
        .collect()
}

pub fn decode_ids(codec: &Codec, ids: &[Rank]) -> Result<String> {
    codec.decode(ids).context("error decoding tokens")
}

pub fn run(args: &CodecArgs, cmd: DecodeCommand) -> Result<()> {
    let ids = parse_ids(&cmd.ids)?;
    let codec = args.load()?;
    let text = decode_ids(&codec, &ids)?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ids_splits_fields() {
        let args = vec!["1 2".to_string(), "3".to_string(), "  4\t5 ".to_string()];
        assert_eq!(parse_ids(&args).unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_decode_failure_has_context() {
        let codec = crate::commands::byte_codec(r"\S+|\s+");
        assert_eq!(decode_ids(&codec, &[104, 105]).unwrap(), "hi");

        let err = decode_ids(&codec, &[104, 999_999]).unwrap_err();
        assert_eq!(err.to_string(), "error decoding tokens");
        assert_eq!(err.root_cause().to_string(), "invalid token: 999999");
    }

    #[test]
    fn test_parse_ids_rejects_garbage() {
        let err = parse_ids(&["12 x3".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "invalid token id: x3");
    }
}
