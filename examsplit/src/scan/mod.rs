//! Page classification and assignment.
//!
//! Scanning runs in two stages:
//! 1. [`PageScanner::scan`] rasterizes and decodes every page in parallel
//!    and returns the per-page results in source order.
//! 2. [`assign`] walks those results sequentially and attributes each page
//!    to a student.
//!
//! [`group`] then collects the assigned pages per student.

pub mod assign;
pub mod classify;
pub mod decode;
pub mod group;

pub use assign::{Assignment, PageRecord, PageStatus, RunState, assign};
pub use classify::{SizeClass, classify};
pub use decode::{AngleSequence, DecodeOutcome, Detection, Placement, QrDecoder, QrDetector, RqrrDetector};
pub use group::{StudentGroup, group};

use futures::stream::{self, StreamExt};
use image::GrayImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task;
use tracing::{instrument, warn};

use crate::config::{DEFAULT_ZOOM, ScanOptions};
use crate::error::{ExamSplitError, Result};
use crate::output::RunObserver;
use crate::source::SourceDocument;

/// Read-only access to the pages of a scan.
pub trait PageSource: Send + Sync + 'static {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Size class of the page at `index`.
    fn size_class(&self, index: usize) -> Result<SizeClass>;

    /// Grayscale raster of the page at `index`.
    fn page_image(&self, index: usize, zoom: f32) -> Result<GrayImage>;
}

impl PageSource for SourceDocument {
    fn page_count(&self) -> usize {
        SourceDocument::page_count(self)
    }

    fn size_class(&self, index: usize) -> Result<SizeClass> {
        Ok(self.geometry(index)?.size_class())
    }

    fn page_image(&self, index: usize, zoom: f32) -> Result<GrayImage> {
        self.render_gray(index, zoom)
    }
}

/// Shared cancellation flag, checked between units of work.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag that is not set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ExamSplitError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Decode result and size class of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageScan {
    /// Zero-based page index.
    pub page_index: usize,
    /// Physical size class.
    pub size_class: SizeClass,
    /// Decode outcome; not found if the page could not be rasterized.
    pub outcome: DecodeOutcome,
    /// Why the page could not be rasterized, if it could not.
    pub raster_error: Option<String>,
}

/// Parallel page decoder.
#[derive(Debug, Clone)]
pub struct PageScanner {
    decoder: QrDecoder,
    zoom: f32,
    jobs: usize,
}

impl PageScanner {
    /// Scanner with the `rqrr` detector and the angle sequence for `options`.
    pub fn new(options: &ScanOptions, zoom: f32, jobs: usize) -> Self {
        let angles = AngleSequence::for_fast_mode(options.fast_decode_only);
        Self::with_decoder(QrDecoder::new(angles), zoom, jobs)
    }

    /// Scanner with a custom decoder.
    pub fn with_decoder(decoder: QrDecoder, zoom: f32, jobs: usize) -> Self {
        Self {
            decoder,
            zoom,
            jobs: jobs.max(1),
        }
    }

    /// Decode every page, at most `jobs` at a time.
    ///
    /// Progress is reported as `done / (pages + 1)` while pages complete;
    /// the final step belongs to the caller. The result is in page order.
    ///
    /// # Errors
    ///
    /// [`ExamSplitError::Cancelled`] if `cancel` is set before all pages
    /// were scheduled.
    pub async fn scan<S: PageSource>(
        &self,
        source: Arc<S>,
        observer: &RunObserver,
        cancel: &CancelFlag,
    ) -> Result<Vec<PageScan>> {
        let total = source.page_count();

        let tasks = (0..total).map(|index| {
            let source = Arc::clone(&source);
            let decoder = self.decoder.clone();
            let zoom = self.zoom;
            let cancel = cancel.clone();

            async move {
                cancel.check()?;
                task::spawn_blocking(move || scan_page(source.as_ref(), &decoder, index, zoom))
                    .await
                    .map_err(|e| ExamSplitError::other(format!("Decode task failed: {e}")))
            }
        });

        let mut pending = stream::iter(tasks).buffer_unordered(self.jobs);
        let mut scans = Vec::with_capacity(total);

        while let Some(scan) = pending.next().await {
            scans.push(scan?);
            observer.progress(scans.len() as f64 / (total + 1) as f64);
        }

        scans.sort_by_key(|scan| scan.page_index);
        Ok(scans)
    }

    /// Scan and assign in one step.
    pub async fn scan_and_assign<S: PageSource>(
        &self,
        source: Arc<S>,
        options: &ScanOptions,
        observer: &RunObserver,
        cancel: &CancelFlag,
    ) -> Result<Assignment> {
        let scans = self.scan(source, observer, cancel).await?;
        Ok(assign(&scans, options, observer))
    }
}

impl Default for PageScanner {
    fn default() -> Self {
        Self::new(&ScanOptions::default(), DEFAULT_ZOOM, 1)
    }
}

#[instrument(level = "debug", skip(source, decoder), fields(page = index + 1))]
fn scan_page<S: PageSource + ?Sized>(
    source: &S,
    decoder: &QrDecoder,
    index: usize,
    zoom: f32,
) -> PageScan {
    let size_class = source.size_class(index).unwrap_or(SizeClass::Other);

    match source.page_image(index, zoom) {
        Ok(image) => PageScan {
            page_index: index,
            size_class,
            outcome: decoder.decode(&image),
            raster_error: None,
        },
        Err(e) => {
            warn!(error = %e, "page not rasterized");
            PageScan {
                page_index: index,
                size_class,
                outcome: DecodeOutcome::not_found(),
                raster_error: Some(e.to_string()),
            }
        }
    }
}
