//! Hex dumps for diagnostics.

use std::fmt::Write;

const ROW: usize = 16;

/// Renders `data` as offset / hex / ASCII rows, 16 bytes per row.
///
/// ```text
/// 0000  08 00 ff ff 41 42 00 00                           |....AB..|
/// ```
pub fn hex_dump(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 4 + 16);
    for (row, chunk) in data.chunks(ROW).enumerate() {
        let _ = write!(out, "{:04x} ", row * ROW);
        for i in 0..ROW {
            match chunk.get(i) {
                Some(b) => {
                    let _ = write!(out, " {b:02x}");
                }
                None => out.push_str("   "),
            }
        }
        out.push_str("  |");
        for &b in chunk {
            out.push(if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            });
        }
        out.push('|');
        out.push('\n');
    }
    out
}
