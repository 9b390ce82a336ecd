//! Plaintext pixel-map encoding.

use std::fmt::Write;

use crate::metadata::{FrameMetadata, SAMPLES_PER_PIXEL};

/// Write `samples` as a `P3` document, one image row per line.
///
/// The caller is responsible for passing exactly `metadata.sample_count()`
/// samples; a short buffer produces a short (undecodable) document.
pub fn encode(metadata: &FrameMetadata, samples: &[u16]) -> String {
    let row_len = metadata.width as usize * SAMPLES_PER_PIXEL;
    let mut out = String::with_capacity(16 + samples.len() * 4);

    // Writing into a String cannot fail.
    let _ = write!(
        out,
        "P3\n{} {}\n{}\n",
        metadata.width, metadata.height, metadata.max_sample
    );

    for row in samples.chunks(row_len.max(1)) {
        for (i, sample) in row.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{sample}");
        }
        out.push('\n');
    }

    out
}
