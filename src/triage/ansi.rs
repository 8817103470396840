//! ANSI escape stripping.
//!
//! Colourising wrappers around the toolchain (and some test runners) emit SGR
//! sequences that would otherwise defeat substring classification.

use vte::{Parser, Perform};

/// Collects printable characters, dropping escape and control sequences.
struct PlainText {
    out: String,
}

impl Perform for PlainText {
    fn print(&mut self, c: char) {
        self.out.push(c);
    }

    fn execute(&mut self, byte: u8) {
        if byte == b'\t' {
            self.out.push('\t');
        }
    }
}

/// Remove ANSI escape sequences and control characters (tabs survive).
pub fn strip_ansi(line: &str) -> String {
    // Fast path: nothing to strip
    if !line.bytes().any(|b| b == 0x1b || (b < 0x20 && b != b'\t')) {
        return line.to_string();
    }

    let mut performer = PlainText {
        out: String::with_capacity(line.len()),
    };
    let mut parser = Parser::new();
    parser.advance(&mut performer, line.as_bytes());
    performer.out
}
