//! Page size classification.

use serde::{Deserialize, Serialize};

/// Standard (A4) page size in PDF units, portrait.
pub const STANDARD_SIZE: (f32, f32) = (595.0, 842.0);

/// Oversized (A3) page size in PDF units, portrait.
pub const OVERSIZED_SIZE: (f32, f32) = (842.0, 1191.0);

/// Maximum difference per dimension for a size match (exclusive).
pub const SIZE_TOLERANCE: f32 = 5.0;

/// Physical size class of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SizeClass {
    /// About 595 x 842 in either orientation.
    Standard,
    /// About 842 x 1191 in either orientation.
    Oversized,
    /// Anything else.
    Other,
}

/// Classify a displayed page size.
pub fn classify(width: f32, height: f32) -> SizeClass {
    if matches_size(width, height, STANDARD_SIZE) {
        SizeClass::Standard
    } else if matches_size(width, height, OVERSIZED_SIZE) {
        SizeClass::Oversized
    } else {
        SizeClass::Other
    }
}

fn matches_size(width: f32, height: f32, (a, b): (f32, f32)) -> bool {
    let close = |x: f32, y: f32| (x - y).abs() < SIZE_TOLERANCE;
    (close(width, a) && close(height, b)) || (close(width, b) && close(height, a))
}
