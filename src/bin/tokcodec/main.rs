//! tokcodec CLI - encode, decode and count tokens from the command line.

mod commands;

use clap::{Parser, Subcommand};
use commands::{CodecArgs, CountCommand, DecodeCommand, EncodeCommand};

#[derive(Parser)]
#[command(name = "tokcodec")]
#[command(about = "BPE tokenizer for OpenAI-compatible vocabularies", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    codec: CodecArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode text to token IDs
    Encode(EncodeCommand),
    /// Decode token IDs back to text
    Decode(DecodeCommand),
    /// Count the tokens in a text
    Count(CountCommand),
    /// List supported encodings
    Encodings,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode(cmd) => commands::encode::run(&cli.codec, cmd)?,
        Commands::Decode(cmd) => commands::decode::run(&cli.codec, cmd)?,
        Commands::Count(cmd) => commands::count::run(&cli.codec, cmd)?,
        Commands::Encodings => commands::encodings::run(),
    }

    Ok(())
}
