//! Hex/ASCII memory dump
//!
//! Every line has the same visual width whatever the element width: 16
//! bytes, 8 halfwords or 4 words, each followed by an ASCII sidebar.
//!
//! ```text
//! 00001000: 64636261 68676665 6C6B6A69 706F6E6D  dcbahgfelkjiponm
//! ```

extern crate alloc;

use alloc::string::String;
use core::fmt::Write;
use td_model::{MemoryError, Width};
use td_shared::memory::MemoryAccess;

/// Elements per line for a given width
pub fn elements_per_line(width: Width) -> usize {
    match width {
        Width::Byte => 16,
        Width::Half => 8,
        Width::Word => 4,
    }
}

/// Render `len` bytes starting at `base` as hex dump lines
///
/// # Arguments
///
/// * `memory` - source of the values, read one element at a time
/// * `base` - address of the first element
/// * `len` - byte count; a trailing partial element is not shown
/// * `display_offset` - address printed for the first element
/// * `width` - element width
/// * `stride` - element step; a new line starts every `elements_per_line` steps
pub fn render(
    memory: &mut dyn MemoryAccess,
    base: u64,
    len: usize,
    display_offset: u64,
    width: Width,
    stride: usize,
) -> Result<String, MemoryError> {
    let bytes = width.bytes();
    let per_line = elements_per_line(width);
    let stride = stride.max(1);
    let hex_area = per_line * (bytes * 2 + 1);
    let count = len / bytes;

    let mut out = String::new();
    let mut line: Option<Line> = None;

    let mut i = 0;
    while i < count {
        let offset = (i * bytes) as u64;
        if (i / stride) % per_line == 0 {
            if let Some(done) = line.take() {
                done.finish(&mut out, hex_area);
            }
            line = Some(Line::new(display_offset + offset));
        }

        let value = memory.read(base + offset, width)?;
        if let Some(current) = line.as_mut() {
            current.push(value, bytes);
        }
        i += stride;
    }

    if let Some(done) = line {
        done.finish(&mut out, hex_area);
    }
    Ok(out)
}

struct Line {
    label: u64,
    hex: String,
    ascii: String,
}

impl Line {
    fn new(label: u64) -> Self {
        Self {
            label,
            hex: String::new(),
            ascii: String::new(),
        }
    }

    fn push(&mut self, value: u32, bytes: usize) {
        let _ = write!(self.hex, " {:0digits$X}", value, digits = bytes * 2);
        // Sidebar shows the value most significant byte first
        for j in (0..bytes).rev() {
            let c = (value >> (j * 8)) as u8;
            self.ascii
                .push(if c.is_ascii_graphic() { c as char } else { '.' });
        }
    }

    fn finish(self, out: &mut String, hex_area: usize) {
        let _ = writeln!(
            out,
            "{:08x}:{:<hex_area$}  {}",
            self.label, self.hex, self.ascii
        );
    }
}
