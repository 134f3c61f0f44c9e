//! Count command implementation.

use anyhow::{Context, Result};
use clap::Parser;

use super::{read_input, CodecArgs};

/// Count command arguments.
#[derive(Parser)]
pub struct CountCommand {
    /// Text to count (`-` reads stdin)
    pub text: String,
}

pub fn run(args: &CodecArgs, cmd: CountCommand) -> Result<()> {
    let codec = args.load()?;
    let text = read_input(cmd.text)?;
    let count = if args.special {
        codec.count_with_special(&text)
    } else {
        codec.count(&text)
    };
    let count = count.context("error counting tokens")?;
    println!("{count}");
    Ok(())
}
