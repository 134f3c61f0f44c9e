//! CLI commands for tokcodec.

pub mod count;
pub mod decode;
pub mod encode;
pub mod encodings;

pub use count::CountCommand;
pub use decode::DecodeCommand;
pub use encode::EncodeCommand;

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tokcodec::{encoding_for_model, pretrained, Codec, Encoding};

/// Codec selection shared by every subcommand.
#[derive(Args, Debug)]
pub struct CodecArgs {
    /// Model whose encoding to use
    #[arg(short, long, global = true, default_value = "gpt-3.5-turbo")]
    pub model: String,

    /// Encoding to use; overrides --model
    #[arg(short, long, global = true)]
    pub encoding: Option<String>,

    /// Directory holding the *.tiktoken vocabulary files
    #[arg(long, global = true, env = pretrained::VOCAB_DIR_ENV)]
    pub vocab_dir: Option<PathBuf>,

    /// Map special-token literals such as <|endoftext|> to their ids
    #[arg(short, long, global = true, default_value_t = false)]
    pub special: bool,
}

impl CodecArgs {
    pub fn encoding(&self) -> Result<Encoding> {
        match &self.encoding {
            Some(name) => name
                .parse::<Encoding>()
                .with_context(|| format!("error creating tokenizer for {name:?}")),
            None => encoding_for_model(&self.model)
                .with_context(|| format!("cannot pick an encoding for model {:?}", self.model)),
        }
    }

    pub fn load(&self) -> Result<Codec> {
        let encoding = self.encoding()?;
        let codec = match &self.vocab_dir {
            Some(dir) => pretrained::from_dir(encoding, dir)
                .with_context(|| format!("failed to load {} from {}", encoding, dir.display()))?,
            None => pretrained::get(encoding)
                .with_context(|| format!("error creating tokenizer for {encoding}"))?,
        };
        log::info!("using encoding {}", codec.name());
        Ok(codec)
    }
}

/// The argument itself, or all of stdin when it is `-`.
pub fn read_input(arg: String) -> Result<String> {
    if arg != "-" {
        return Ok(arg);
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("failed to read stdin")?;
    Ok(buffer)
}

#[cfg(test)]
pub(crate) fn byte_codec(pattern: &str) -> Codec {
    use rustc_hash::FxHashMap;
    use tokcodec::{Rank, Vocabulary};

    let encoder: FxHashMap<Vec<u8>, Rank> = (0..=255u8).map(|b| (vec![b], b as Rank)).collect();
    let vocab = Vocabulary::new(encoder).unwrap();
    Codec::new("bytes", vocab, FxHashMap::default(), pattern).unwrap()
}
