//! Progress reporting and the end-of-run summary

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Final counts of one conversion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Entries in the export
    pub read: usize,
    /// Entries rejected during validation
    pub skipped_invalid: usize,
    /// Posts rendered and written (or planned, in dry-run)
    pub converted: usize,
    /// Posts that could not be rendered or written
    pub failed: usize,
    pub images_downloaded: usize,
    pub images_failed: usize,
    /// Unique tag identifiers named by the lookup service
    pub tags_resolved_via_api: usize,
    /// Unique tag identifiers given a fallback name
    pub tags_fallback: usize,
}

impl RunSummary {
    /// Whether any post failed irrecoverably
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Print summary to console
    pub fn print(&self) {
        println!("\nConversion Summary");
        println!("==================");
        println!("Entries read:          {}", self.read);
        println!("Skipped (invalid):     {}", self.skipped_invalid);
        println!("Posts converted:       {}", self.converted);
        println!("Posts failed:          {}", self.failed);
        println!("Images downloaded:     {}", self.images_downloaded);
        println!("Images failed:         {}", self.images_failed);
        println!("Tags resolved via API: {}", self.tags_resolved_via_api);
        println!("Tags with fallback:    {}", self.tags_fallback);
    }
}

/// Live progress of a run
pub struct RunProgress {
    /// Progress bar (None if running in quiet mode)
    progress_bar: Option<ProgressBar>,
    start_time: Instant,
    converted: AtomicUsize,
    failed: AtomicUsize,
}

impl RunProgress {
    pub fn new(total_expected: u64, quiet: bool) -> Self {
        let progress_bar = if !quiet {
            let pb = ProgressBar::new(total_expected);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        Self {
            progress_bar,
            start_time: Instant::now(),
            converted: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    pub fn post_converted(&self, title: &str) {
        self.converted.fetch_add(1, Ordering::Relaxed);
        self.advance(title);
    }

    pub fn post_failed(&self, title: &str) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.advance(title);
    }

    fn advance(&self, title: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
            pb.set_message(crate::util::truncate_str(title, 40));
        }
    }

    pub fn converted(&self) -> usize {
        self.converted.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// Finish the progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_with_message(format!(
                "Done! {} converted, {} failed in {:.1}s",
                self.converted(),
                self.failed(),
                self.elapsed_seconds()
            ));
        }
    }
}
