use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

pub const RELEASE_MARKER: &str = "PDU Session Release";

/// Number of lines in `path` containing `marker`, counted like `grep -c`.
///
/// The worker may still be writing; a line is counted once the marker text
/// in it is complete.
pub fn count_marker_lines(path: &Path, marker: &str) -> io::Result<usize> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut line: Vec<u8> = Vec::new();
    let mut hits = 0;

    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line)?;
        if read == 0 {
            break;
        }
        if String::from_utf8_lossy(&line).contains(marker) {
            hits += 1;
        }
    }

    Ok(hits)
}
