//! Shared parsing helpers.

use std::path::Path;

/// Parse the embedded timestamp (seconds) from a frame file reference.
///
/// Frame files are named `frame-<seconds>.jpg`; the timestamp is the only
/// reliable ordering signal because directory listings are returned in
/// unspecified order. Returns 0 when the name does not match.
pub fn frame_timestamp(path: impl AsRef<Path>) -> f64 {
    let name = match path.as_ref().file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return 0.0,
    };

    let rest = match name.strip_prefix("frame-") {
        Some(rest) => rest,
        None => return 0.0,
    };

    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0.0)
}
