// file: src/download/progress.rs
// description: progress bars and counters for concurrent station downloads
// reference: uses indicatif for progress bars

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadStats {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration_secs: u64,
}

impl DownloadStats {
    pub fn attempted(&self) -> usize {
        self.written + self.failed
    }

    pub fn success_rate(&self) -> f64 {
        if self.attempted() == 0 {
            return 0.0;
        }
        (self.written as f64 / self.attempted() as f64) * 100.0
    }

    pub fn items_per_second(&self) -> f64 {
        if self.duration_secs == 0 {
            return (self.written + self.skipped + self.failed) as f64;
        }
        (self.written + self.skipped + self.failed) as f64 / self.duration_secs as f64
    }
}

pub struct DownloadProgress {
    main_bar: ProgressBar,
    detail_bar: ProgressBar,
    written: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    start_time: Instant,
}

impl DownloadProgress {
    pub fn new(total: usize, visible: bool, colored: bool) -> Self {
        let multi_progress = MultiProgress::new();
        if !visible {
            multi_progress.set_draw_target(ProgressDrawTarget::hidden());
        }

        let main_bar = create_progress_bar(&multi_progress, total as u64, colored);
        let detail_bar = create_detail_bar(&multi_progress);

        Self {
            main_bar,
            detail_bar,
            written: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn inc_written(&self) {
        self.written.fetch_add(1, Ordering::SeqCst);
        self.advance();
    }

    pub fn inc_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        self.advance();
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        self.advance();
    }

    pub fn set_message(&self, message: String) {
        self.main_bar.set_message(message);
    }

    pub fn finish(&self) {
        self.main_bar.finish_with_message("Downloads complete");
        self.detail_bar.finish_and_clear();
    }

    pub fn get_stats(&self) -> DownloadStats {
        DownloadStats {
            written: self.written.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            duration_secs: self.start_time.elapsed().as_secs(),
        }
    }

    fn advance(&self) {
        self.main_bar.inc(1);
        let stats = self.get_stats();
        self.detail_bar.set_message(format!(
            "Written: {} | Skipped: {} | Failed: {}",
            stats.written, stats.skipped, stats.failed
        ));
    }
}

fn create_progress_bar(multi_progress: &MultiProgress, total: u64, colored: bool) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(total));
    let (template, chars) = if colored {
        (
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            "█▓▒░",
        )
    } else {
        (
            "{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({eta}) {msg}",
            "=>-",
        )
    };
    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        bar.set_style(style.progress_chars(chars));
    }
    bar
}

fn create_detail_bar(multi_progress: &MultiProgress) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(0));
    if let Ok(style) = ProgressStyle::default_bar().template("{msg}") {
        bar.set_style(style);
    }
    bar
}
