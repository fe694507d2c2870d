//! QR decoding with a rotation search.
//!
//! Scanned sheets are rarely perfectly straight. The decoder tries the image
//! as is first and then, unless restricted to the fast sequence, small
//! rotations in both directions until a code is read.

use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{Interpolation, warp_with};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Largest rotation tried in either direction, in degrees.
pub const MAX_SKEW_DEGREES: i32 = 15;

const EDGE_INSET: f32 = 1e-3;

/// Horizontal position of a detected code on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Placement {
    /// Code center left of the vertical midline.
    Left,
    /// Code center on or right of the vertical midline.
    Right,
    /// No code was read.
    #[default]
    None,
}

/// A code found by a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Decoded text.
    pub payload: String,
    /// Corner points in image pixel coordinates.
    pub corners: [(f32, f32); 4],
}

impl Detection {
    /// Mean x coordinate of the corners.
    pub fn center_x(&self) -> f32 {
        self.corners.iter().map(|(x, _)| x).sum::<f32>() / 4.0
    }
}

/// Finds and decodes a QR code in a grayscale image.
pub trait QrDetector: Send + Sync {
    /// The first readable code in `image`, if any.
    fn detect(&self, image: &GrayImage) -> Option<Detection>;
}

/// Detector backed by `rqrr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrDetector;

impl QrDetector for RqrrDetector {
    fn detect(&self, image: &GrayImage) -> Option<Detection> {
        let (width, height) = image.dimensions();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            width as usize,
            height as usize,
            |x, y| image.get_pixel(x as u32, y as u32).0[0],
        );

        prepared.detect_grids().into_iter().find_map(|grid| {
            let (_, payload) = grid.decode().ok()?;
            if payload.is_empty() {
                return None;
            }
            let corners = grid.bounds.map(|p| (p.x as f32, p.y as f32));
            Some(Detection { payload, corners })
        })
    }
}

/// Ordered rotation angles (degrees, positive is counter-clockwise) to try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AngleSequence(Vec<i32>);

impl AngleSequence {
    /// `0`, then `-15..=-1`, then `1..=15`.
    pub fn standard() -> Self {
        let angles = std::iter::once(0)
            .chain(-MAX_SKEW_DEGREES..0)
            .chain(1..=MAX_SKEW_DEGREES)
            .collect();
        Self(angles)
    }

    /// Only the unrotated image.
    pub fn fast() -> Self {
        Self(vec![0])
    }

    /// The sequence for the fast-decode flag.
    pub fn for_fast_mode(fast: bool) -> Self {
        if fast { Self::fast() } else { Self::standard() }
    }

    /// A custom sequence, tried in the given order.
    pub fn custom(angles: Vec<i32>) -> Self {
        Self(angles)
    }

    /// The angles in trial order.
    pub fn angles(&self) -> &[i32] {
        &self.0
    }

    /// Number of angles.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no angle would be tried.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for AngleSequence {
    fn default() -> Self {
        Self::standard()
    }
}

/// Result of decoding one page image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodeOutcome {
    /// Decoded payload, `None` if no angle produced one.
    pub payload: Option<String>,
    /// Where the code sat, `Placement::None` if not decoded.
    pub placement: Placement,
    /// Angle that produced the payload.
    pub angle: Option<i32>,
}

impl DecodeOutcome {
    /// The "unreadable" outcome.
    pub fn not_found() -> Self {
        Self::default()
    }

    /// True if a payload was read.
    pub fn is_decoded(&self) -> bool {
        self.payload.is_some()
    }
}

/// Decodes page images with a rotation search.
#[derive(Clone)]
pub struct QrDecoder {
    detector: Arc<dyn QrDetector>,
    angles: AngleSequence,
}

impl QrDecoder {
    /// Decoder using `rqrr` and the given angles.
    pub fn new(angles: AngleSequence) -> Self {
        Self::with_detector(Arc::new(RqrrDetector), angles)
    }

    /// Decoder with a custom detector.
    pub fn with_detector(detector: Arc<dyn QrDetector>, angles: AngleSequence) -> Self {
        Self { detector, angles }
    }

    /// The angles this decoder tries.
    pub fn angles(&self) -> &AngleSequence {
        &self.angles
    }

    /// Try each angle in order and return the first non-empty read.
    pub fn decode(&self, image: &GrayImage) -> DecodeOutcome {
        let midline = image.width() as f32 / 2.0;

        for &angle in self.angles.angles() {
            let detection = if angle == 0 {
                self.detector.detect(image)
            } else {
                self.detector.detect(&rotate_about_center(image, angle as f32))
            };

            if let Some(detection) = detection.filter(|d| !d.payload.is_empty()) {
                trace!(angle, payload = %detection.payload, "code read");
                let placement = if detection.center_x() < midline {
                    Placement::Left
                } else {
                    Placement::Right
                };
                return DecodeOutcome {
                    payload: Some(detection.payload),
                    placement,
                    angle: Some(angle),
                };
            }
        }

        DecodeOutcome::not_found()
    }
}

impl Default for QrDecoder {
    fn default() -> Self {
        Self::new(AngleSequence::standard())
    }
}

impl fmt::Debug for QrDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QrDecoder")
            .field("angles", &self.angles)
            .finish_non_exhaustive()
    }
}

/// Rotate an image about its center by `degrees` (positive is counter-clockwise).
///
/// The output keeps the input size. Samples are bilinear; coordinates outside
/// the source are clamped to the nearest edge pixel.
pub fn rotate_about_center(image: &GrayImage, degrees: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width < 2 || height < 2 {
        return image.clone();
    }

    let (sin, cos) = degrees.to_radians().sin_cos();
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    // Bilinear lookups need a right and lower neighbour inside the image.
    let max_x = width as f32 - 1.0 - EDGE_INSET;
    let max_y = height as f32 - 1.0 - EDGE_INSET;

    warp_with(
        image,
        move |x, y| {
            let dx = x - cx;
            let dy = y - cy;
            (
                (cos * dx - sin * dy + cx).clamp(0.0, max_x),
                (sin * dx + cos * dy + cy).clamp(0.0, max_y),
            )
        },
        Interpolation::Bilinear,
        Luma([255]),
    )
}
