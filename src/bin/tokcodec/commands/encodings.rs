//! Encodings command implementation.

use tokcodec::Encoding;

pub fn run() {
    for encoding in Encoding::all() {
        println!("{:<12} {}", encoding.name(), encoding.vocab_file());
    }
}
