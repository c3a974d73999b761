//! Per-book progress for the batch pipelines.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Covers,
    Catalog,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Covers => "covers",
            Stage::Catalog => "catalog",
        }
    }
}

/// `done` books of `total` finished; `book` is the file about to be
/// processed, `None` once the run is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub done: u64,
    pub total: u64,
    pub book: Option<String>,
}

impl ProgressEvent {
    pub fn is_finished(&self) -> bool {
        self.done >= self.total
    }
}

/// Receives progress updates. The CLI drives a progress bar from this.
pub trait ProgressHandler {
    fn on_progress(&self, event: ProgressEvent);
}

/// Report `done` of `total`, naming the book that comes next.
pub(crate) fn book_progress(
    handler: Option<&dyn ProgressHandler>,
    stage: Stage,
    done: usize,
    total: usize,
    next: Option<&std::path::Path>,
) {
    let Some(h) = handler else {
        return;
    };
    h.on_progress(ProgressEvent {
        stage,
        done: done as u64,
        total: total as u64,
        book: next
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned()),
    });
}
