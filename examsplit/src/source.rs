//! The merged, read-only source document and its page geometry.
//!
//! Pages are addressed by zero-based index in document order. Geometry is
//! always resolved through the page tree, so attributes inherited from
//! `/Pages` nodes (`MediaBox`, `CropBox`, `Resources`, `Rotate`) are honored.

use lopdf::{Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

use crate::error::{ExamSplitError, Result};
use crate::raster::PageRenderer;
use crate::scan::SizeClass;
use crate::scan::classify::classify;

/// Page attributes that a page may inherit from its ancestors.
pub const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Maximum depth followed through `/Parent` links and reference chains.
const MAX_DEPTH: usize = 64;

/// Axis-aligned rectangle in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Lower-left x.
    pub x0: f32,
    /// Lower-left y.
    pub y0: f32,
    /// Upper-right x.
    pub x1: f32,
    /// Upper-right y.
    pub y1: f32,
}

impl Rect {
    /// Create a normalized rectangle (`x0 <= x1`, `y0 <= y1`).
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Width of the rectangle.
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Height of the rectangle.
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Parse a PDF rectangle array, following references.
    pub fn from_object(doc: &Document, obj: &Object) -> Option<Self> {
        let array = resolve(doc, obj)?.as_array().ok()?;
        if array.len() != 4 {
            return None;
        }

        let mut values = [0.0f32; 4];
        for (slot, item) in values.iter_mut().zip(array) {
            *slot = resolve(doc, item)?.as_float().ok()?;
        }

        Some(Self::new(values[0], values[1], values[2], values[3]))
    }

    /// Encode as a PDF rectangle array.
    pub fn to_object(self) -> Object {
        Object::Array(vec![
            Object::Real(self.x0),
            Object::Real(self.y0),
            Object::Real(self.x1),
            Object::Real(self.y1),
        ])
    }

    fn intersect(&self, other: &Rect) -> Option<Rect> {
        let rect = Rect {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        };
        (rect.width() > 0.0 && rect.height() > 0.0).then_some(rect)
    }
}

/// Left or right half of a displayed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HalfSide {
    /// The half left of the vertical midline.
    Left,
    /// The half right of the vertical midline.
    Right,
}

/// Visible box and rotation of one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// The visible page box (CropBox clipped to MediaBox, or MediaBox).
    pub page_box: Rect,
    /// Clockwise display rotation, normalized to 0, 90, 180 or 270.
    pub rotate: i64,
}

impl PageGeometry {
    /// Width and height as displayed (swapped for 90/270 rotation).
    pub fn visual_size(&self) -> (f32, f32) {
        let (w, h) = (self.page_box.width(), self.page_box.height());
        if self.rotate % 180 == 0 { (w, h) } else { (h, w) }
    }

    /// Size class of the displayed page.
    pub fn size_class(&self) -> SizeClass {
        let (w, h) = self.visual_size();
        classify(w, h)
    }

    /// The part of the page box that is displayed left or right of the
    /// vertical midline, in unrotated page space.
    pub fn half_box(&self, side: HalfSide) -> Rect {
        let Rect { x0, y0, x1, y1 } = self.page_box;
        let mid_x = (x0 + x1) / 2.0;
        let mid_y = (y0 + y1) / 2.0;

        let low_x = Rect::new(x0, y0, mid_x, y1);
        let high_x = Rect::new(mid_x, y0, x1, y1);
        let low_y = Rect::new(x0, y0, x1, mid_y);
        let high_y = Rect::new(x0, mid_y, x1, y1);

        match (self.rotate, side) {
            (0, HalfSide::Left) | (180, HalfSide::Right) => low_x,
            (0, HalfSide::Right) | (180, HalfSide::Left) => high_x,
            (90, HalfSide::Left) | (270, HalfSide::Right) => low_y,
            (90, HalfSide::Right) | (270, HalfSide::Left) => high_y,
            _ => low_x,
        }
    }
}

/// Read-only, page-indexed view of the merged scan.
#[derive(Debug)]
pub struct SourceDocument {
    document: Document,
    page_ids: Vec<ObjectId>,
    /// The document serialized for the renderer, built on first render.
    serialized: OnceLock<std::result::Result<Arc<Vec<u8>>, String>>,
}

impl SourceDocument {
    /// Wrap a document; pages are indexed in page-tree order.
    pub fn new(document: Document) -> Self {
        let page_ids = document.get_pages().into_values().collect();
        Self {
            document,
            page_ids,
            serialized: OnceLock::new(),
        }
    }

    /// The underlying document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Object id of the page at `index`.
    pub fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.page_ids
            .get(index)
            .copied()
            .ok_or(ExamSplitError::PageOutOfRange {
                index,
                total: self.page_ids.len(),
            })
    }

    /// Geometry of the page at `index`.
    pub fn geometry(&self, index: usize) -> Result<PageGeometry> {
        page_geometry(&self.document, self.page_id(index)?)
            .ok_or_else(|| ExamSplitError::other(format!("Page {} has no MediaBox", index + 1)))
    }

    /// Render the page at `zoom` device pixels per PDF unit, in grayscale.
    pub fn render_gray(&self, index: usize, zoom: f32) -> Result<image::GrayImage> {
        self.page_id(index)?;
        let data = self
            .serialized
            .get_or_init(|| {
                let mut document = self.document.clone();
                let mut bytes = Vec::new();
                document
                    .save_to(&mut bytes)
                    .map(|_| Arc::new(bytes))
                    .map_err(|e| e.to_string())
            })
            .clone()
            .map_err(|reason| ExamSplitError::render_failed(index, reason))?;

        PageRenderer::new(data)?.render(index, zoom)
    }
}

/// Follow a reference chain to the referenced object.
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    let mut current = obj;
    for _ in 0..MAX_DEPTH {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

/// Look up `key` on the page or the nearest ancestor that defines it.
pub fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }

    None
}

/// Resolve the visible box and rotation of a page.
pub fn page_geometry(doc: &Document, page_id: ObjectId) -> Option<PageGeometry> {
    let media_box = Rect::from_object(doc, inherited_attribute(doc, page_id, b"MediaBox")?)?;

    let page_box = inherited_attribute(doc, page_id, b"CropBox")
        .and_then(|obj| Rect::from_object(doc, obj))
        .and_then(|crop| crop.intersect(&media_box))
        .unwrap_or(media_box);

    let rotate = inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_i64().ok())
        .unwrap_or(0)
        .rem_euclid(360);
    let rotate = rotate - rotate % 90;

    Some(PageGeometry { page_box, rotate })
}
