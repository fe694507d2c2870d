//! Helpers for the integration tests.
//!
//! Scan fixtures are generated on the fly: every page is a single grayscale
//! image XObject, optionally carrying a real QR code rendered with `qrcode`.

#![allow(dead_code)]

use examsplit::config::{Config, OverwriteMode};
use examsplit::output::{Logger, MessageLevel, RunObserver};
use image::{GrayImage, Luma};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Zoom used by every test run; fixture images are drawn at this scale.
pub const ZOOM: f32 = 0.5;

/// Pixels per QR module.
const MODULE: u32 = 4;

/// Distance of a code from the page edges, in pixels.
const MARGIN: u32 = 12;

/// Which half of the page a code is printed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// One page of a synthetic scan.
#[derive(Debug, Clone)]
pub struct ScanPage {
    pub width: f32,
    pub height: f32,
    pub code: Option<(String, Side)>,
}

/// A4 portrait page with a code in the top left corner.
pub fn a4(payload: &str) -> ScanPage {
    ScanPage {
        width: 595.0,
        height: 842.0,
        code: Some((payload.to_string(), Side::Left)),
    }
}

/// A4 portrait page without a code.
pub fn a4_blank() -> ScanPage {
    ScanPage {
        width: 595.0,
        height: 842.0,
        code: None,
    }
}

/// A3 landscape page with a code on the given half.
pub fn a3(payload: &str, side: Side) -> ScanPage {
    ScanPage {
        width: 1191.0,
        height: 842.0,
        code: Some((payload.to_string(), side)),
    }
}

/// A3 landscape page without a code.
pub fn a3_blank() -> ScanPage {
    ScanPage {
        width: 1191.0,
        height: 842.0,
        code: None,
    }
}

/// Render the raster of one page at [`ZOOM`].
pub fn render(page: &ScanPage) -> GrayImage {
    let width = (page.width * ZOOM).round() as u32;
    let height = (page.height * ZOOM).round() as u32;
    let mut image = GrayImage::from_pixel(width, height, Luma([255]));

    if let Some((payload, side)) = &page.code {
        let code = qrcode::QrCode::new(payload.as_bytes()).unwrap();
        let modules = code.width() as u32;
        let colors = code.to_colors();
        let size = (modules + 8) * MODULE;

        let x = match side {
            Side::Left => MARGIN,
            Side::Right => width - size - MARGIN,
        };
        let origin = (x + 4 * MODULE, MARGIN + 4 * MODULE);

        for my in 0..modules {
            for mx in 0..modules {
                if colors[(my * modules + mx) as usize] != qrcode::Color::Dark {
                    continue;
                }
                for py in 0..MODULE {
                    for px in 0..MODULE {
                        image.put_pixel(
                            origin.0 + mx * MODULE + px,
                            origin.1 + my * MODULE + py,
                            Luma([0]),
                        );
                    }
                }
            }
        }
    }

    image
}

/// Build a scan document with one image per page.
pub fn scan_document(pages: &[ScanPage]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());

    for page in pages {
        let raster = render(page);
        let (w, h) = raster.dimensions();

        let mut image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => w as i64,
                "Height" => h as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            raster.into_raw(),
        );
        image.compress().unwrap();
        let image_id = doc.add_object(image);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(page.width),
                        0.into(),
                        0.into(),
                        Object::Real(page.height),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(page.width), Object::Real(page.height)],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// How a code is put on a page by [`code_only_document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drawing {
    /// A small image holding just the code, placed with `cm`.
    PlacedImage,
    /// One filled rectangle per dark module.
    Vector,
}

/// Size of one QR module in PDF units; [`MODULE`] pixels at [`ZOOM`].
const MODULE_PT: f32 = MODULE as f32 / ZOOM;

/// One white page of `width` x `height` with a code whose lower-left corner
/// (quiet zone included) sits at `(x, y)`.
pub fn code_only_document(payload: &str, width: f32, height: f32, x: f32, y: f32, drawing: Drawing) -> Document {
    let code = qrcode::QrCode::new(payload.as_bytes()).unwrap();
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let size = modules + 8;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut resources = dictionary! {};

    let operations = match drawing {
        Drawing::PlacedImage => {
            let mut image = GrayImage::from_pixel(size, size, Luma([255]));
            for my in 0..modules {
                for mx in 0..modules {
                    if colors[(my * modules + mx) as usize] == qrcode::Color::Dark {
                        image.put_pixel(mx + 4, my + 4, Luma([0]));
                    }
                }
            }
            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => size as i64,
                    "Height" => size as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                    "Interpolate" => false,
                },
                image.into_raw(),
            ));
            resources.set("XObject", dictionary! { "Qr" => image_id });

            let extent = size as f32 * MODULE_PT;
            vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(extent),
                        0.into(),
                        0.into(),
                        Object::Real(extent),
                        Object::Real(x),
                        Object::Real(y),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Qr".to_vec())]),
                Operation::new("Q", vec![]),
            ]
        }
        Drawing::Vector => {
            let mut operations = vec![Operation::new("g", vec![0.into()])];
            let top = y + size as f32 * MODULE_PT;
            for my in 0..modules {
                for mx in 0..modules {
                    if colors[(my * modules + mx) as usize] != qrcode::Color::Dark {
                        continue;
                    }
                    let left = x + (mx + 4) as f32 * MODULE_PT;
                    let bottom = top - (my + 5) as f32 * MODULE_PT;
                    operations.push(Operation::new(
                        "re",
                        vec![
                            Object::Real(left),
                            Object::Real(bottom),
                            Object::Real(MODULE_PT),
                            Object::Real(MODULE_PT),
                        ],
                    ));
                }
            }
            operations.push(Operation::new("f", vec![]));
            operations
        }
    };

    let content_id = doc.add_object(Stream::new(dictionary! {}, Content { operations }.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), Object::Real(width), Object::Real(height)],
        "Resources" => resources,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => 1,
            "Kids" => vec![Object::Reference(page_id)],
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Write a scan to `dir/name`.
pub fn write_scan(dir: &Path, name: &str, pages: &[ScanPage]) -> PathBuf {
    let path = dir.join(name);
    scan_document(pages).save(&path).unwrap();
    path
}

/// Configuration for a quiet, non-interactive run at [`ZOOM`].
pub fn test_config(inputs: Vec<PathBuf>, output: PathBuf) -> Config {
    let mut config = Config::new(inputs, output);
    config.overwrite_mode = OverwriteMode::Force;
    config.quiet = true;
    config.jobs = Some(2);
    config.zoom = ZOOM;
    config
}

/// Logger that keeps every message.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    messages: Mutex<Vec<(MessageLevel, String)>>,
}

impl RecordingLogger {
    pub fn messages(&self) -> Vec<(MessageLevel, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn contains(&self, level: MessageLevel, text: &str) -> bool {
        self.messages()
            .iter()
            .any(|(l, message)| *l == level && message == text)
    }
}

impl Logger for RecordingLogger {
    fn emit(&self, message: &str, level: MessageLevel) {
        self.messages.lock().unwrap().push((level, message.to_string()));
    }
}

/// Observer that records messages into the returned logger.
pub fn recording_observer() -> (RunObserver, Arc<RecordingLogger>) {
    let logger = Arc::new(RecordingLogger::default());
    let observer = RunObserver::silent().with_logger(logger.clone());
    (observer, logger)
}

/// Page count of a written PDF.
pub fn page_count(path: &Path) -> usize {
    Document::load(path).unwrap().get_pages().len()
}
