//! Terminal progress for paginated fetches.

use indicatif::{ProgressBar, ProgressStyle};
use wws_ingest::FetchObserver;

const TEMPLATE: &str = "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} pages {msg}";

/// Shows a progress bar once the page count is known.
pub struct PageProgress {
    bar: ProgressBar,
}

impl PageProgress {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    /// Progress that draws nothing.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        Self { bar }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}

impl Default for PageProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchObserver for PageProgress {
    fn on_total(&mut self, pages: usize) {
        self.bar.set_length(pages as u64);
    }

    fn on_page(&mut self, page: usize) {
        self.bar.inc(1);
        self.bar.set_message(format!("(last: {page})"));
    }
}
