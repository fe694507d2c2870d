//! Composition of output PDFs with `lopdf`.
//!
//! Output pages are new page objects cloned from the source pages. Inherited
//! attributes are materialized on the clone, and everything the page refers
//! to is copied under its source object id. Objects created here get ids
//! above the source's `max_id`, so both sets never collide.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use super::{OutputDocument, PageContent};
use crate::error::{ExamSplitError, Result};
use crate::source::{HalfSide, INHERITABLE_KEYS, SourceDocument, inherited_attribute};
use crate::utils::copy_references;

/// Width of generated text pages (A4).
pub const TEXT_PAGE_WIDTH: f32 = 595.0;
/// Height of generated text pages (A4).
pub const TEXT_PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 72.0;

/// One line on a generated text page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// The text.
    pub text: String,
    /// Font size in points.
    pub size: f32,
    /// Bold face.
    pub bold: bool,
}

impl TextLine {
    /// Regular 11pt line.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size: 11.0,
            bold: false,
        }
    }

    /// Bold heading line.
    pub fn heading(text: impl Into<String>, size: f32) -> Self {
        Self {
            text: text.into(),
            size,
            bold: true,
        }
    }

    /// Empty spacer line.
    pub fn blank() -> Self {
        Self::plain("")
    }

    fn leading(&self) -> f32 {
        self.size * 1.5
    }
}

/// Incrementally builds a document from source pages and text pages.
#[derive(Debug)]
pub struct PageAssembler<'a> {
    source: &'a SourceDocument,
    document: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    fonts_id: Option<ObjectId>,
}

impl<'a> PageAssembler<'a> {
    /// Start an empty document that can take pages from `source`.
    pub fn new(source: &'a SourceDocument) -> Self {
        let mut document = Document::with_version("1.5");
        document.max_id = source.document().max_id;
        let pages_id = document.new_object_id();

        Self {
            source,
            document,
            pages_id,
            kids: Vec::new(),
            fonts_id: None,
        }
    }

    /// Number of pages added so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append a source page, whole or one half of it.
    pub fn add_source_page(&mut self, index: usize, half: Option<HalfSide>) -> Result<ObjectId> {
        let source = self.source;
        let source_doc = source.document();
        let page_id = source.page_id(index)?;
        let mut page = source_doc.get_dictionary(page_id)?.clone();

        for key in INHERITABLE_KEYS {
            if !page.has(key)
                && let Some(value) = inherited_attribute(source_doc, page_id, key)
            {
                page.set(key, value.clone());
            }
        }

        page.remove(b"Parent");
        page.remove(b"Annots");
        page.remove(b"StructParents");

        if let Some(side) = half {
            let rect = source.geometry(index)?.half_box(side).to_object();
            page.set("MediaBox", rect.clone());
            page.set("CropBox", rect);
        }

        let page = Object::Dictionary(page);
        copy_references(&mut self.document, source_doc, &page);

        Ok(self.push_page(page))
    }

    /// Append the lines as text, starting a new page whenever one is full.
    pub fn add_text_pages(&mut self, lines: &[TextLine]) -> Result<()> {
        let mut operations = Vec::new();
        let mut y = TEXT_PAGE_HEIGHT - MARGIN;

        for line in lines {
            if y - line.leading() < MARGIN && !operations.is_empty() {
                self.add_text_page(std::mem::take(&mut operations))?;
                y = TEXT_PAGE_HEIGHT - MARGIN;
            }
            y -= line.leading();

            if !line.text.is_empty() {
                let font = if line.bold { "F2" } else { "F1" };
                operations.extend([
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec![font.into(), Object::Real(line.size)]),
                    Operation::new("Td", vec![Object::Real(MARGIN), Object::Real(y)]),
                    Operation::new("Tj", vec![Object::string_literal(win_ansi(&line.text))]),
                    Operation::new("ET", vec![]),
                ]);
            }
        }

        self.add_text_page(operations)
    }

    fn add_text_page(&mut self, operations: Vec<Operation>) -> Result<()> {
        let content = Content { operations }.encode()?;
        let content_id = self
            .document
            .add_object(Stream::new(dictionary! {}, content));
        let fonts_id = self.fonts();

        let page = dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(TEXT_PAGE_WIDTH), Object::Real(TEXT_PAGE_HEIGHT)],
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => fonts_id },
        };
        self.push_page(Object::Dictionary(page));
        Ok(())
    }

    fn fonts(&mut self) -> ObjectId {
        if let Some(id) = self.fonts_id {
            return id;
        }

        let font = |base: &str| {
            dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => base,
                "Encoding" => "WinAnsiEncoding",
            }
        };
        let regular = self.document.add_object(font("Helvetica"));
        let bold = self.document.add_object(font("Helvetica-Bold"));
        let id = self.document.add_object(dictionary! {
            "F1" => regular,
            "F2" => bold,
        });
        self.fonts_id = Some(id);
        id
    }

    fn push_page(&mut self, mut page: Object) -> ObjectId {
        if let Object::Dictionary(dict) = &mut page {
            dict.set("Parent", self.pages_id);
        }
        let id = self.document.add_object(page);
        self.kids.push(id);
        id
    }

    /// Close the page tree and return the document.
    pub fn finish(mut self) -> Document {
        let kids: Vec<Object> = self.kids.iter().map(|id| (*id).into()).collect();
        let count = kids.len() as i64;

        self.document.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.document.trailer.set("Root", catalog_id);
        self.document
    }
}

/// Encode text for a `WinAnsiEncoding` font; characters outside Latin-1 become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Composes output plans into documents.
#[derive(Debug, Clone, Copy)]
pub struct DocumentComposer<'a> {
    source: &'a SourceDocument,
}

impl<'a> DocumentComposer<'a> {
    /// Composer reading pages from `source`.
    pub fn new(source: &'a SourceDocument) -> Self {
        Self { source }
    }

    /// Append the plan's pages to an assembler.
    pub fn append(&self, assembler: &mut PageAssembler<'_>, plan: &OutputDocument) -> Result<()> {
        for content in &plan.pages {
            let result = match *content {
                PageContent::Copy { source_index } => assembler.add_source_page(source_index, None),
                PageContent::Half { source_index, side } => {
                    assembler.add_source_page(source_index, Some(side))
                }
            };
            result.map_err(|e| ExamSplitError::reconstruction_failed(&plan.routing_key, e.to_string()))?;
        }
        Ok(())
    }

    /// Compose the plan into a standalone document.
    ///
    /// # Errors
    ///
    /// [`ExamSplitError::ReconstructionFailed`] if a source page cannot be copied.
    pub fn compose(&self, plan: &OutputDocument) -> Result<Document> {
        let mut assembler = PageAssembler::new(self.source);
        self.append(&mut assembler, plan)?;
        Ok(assembler.finish())
    }
}

/// The `/MediaBox` of a composed page, for inspection.
pub fn media_box(document: &Document, page_id: ObjectId) -> Option<[f32; 4]> {
    let dict: &Dictionary = document.get_dictionary(page_id).ok()?;
    let array = dict.get(b"MediaBox").ok()?.as_array().ok()?;
    let mut values = [0.0; 4];
    for (slot, value) in values.iter_mut().zip(array) {
        *slot = value.as_float().ok()?;
    }
    Some(values)
}
