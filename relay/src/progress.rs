//! Progress reporting for the participant that consumes results.

use indicatif::{ProgressBar, ProgressStyle};

/// Receives progress reports from a distributed map.
///
/// Reports have no effect on the map itself.
pub trait Progress {
    /// Announces the number of elements in the sequence.
    fn set_total(&mut self, total: u64);
    /// Announces one more dispatched element.
    fn increment(&mut self);
    /// Replaces the text shown beside the progress.
    fn set_label(&mut self, label: String);
    /// Announces that the map has completed.
    fn finish(&mut self) { }
}

/// Discards all reports.
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl Progress for Silent {
    fn set_total(&mut self, _total: u64) { }
    fn increment(&mut self) { }
    fn set_label(&mut self, _label: String) { }
}

impl Progress for ProgressBar {
    fn set_total(&mut self, total: u64) {
        self.set_length(total);
    }
    fn increment(&mut self) {
        self.inc(1);
    }
    fn set_label(&mut self, label: String) {
        self.set_message(label);
    }
    fn finish(&mut self) {
        ProgressBar::finish(self);
    }
}

impl<P: Progress + ?Sized> Progress for Box<P> {
    fn set_total(&mut self, total: u64) { (**self).set_total(total) }
    fn increment(&mut self) { (**self).increment() }
    fn set_label(&mut self, label: String) { (**self).set_label(label) }
    fn finish(&mut self) { (**self).finish() }
}

/// A terminal progress bar, without a length until one is set.
pub fn bar() -> ProgressBar {
    let progress = ProgressBar::no_length();
    match ProgressStyle::with_template("[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}") {
        Ok(style) => progress.set_style(style.progress_chars("#>-")),
        Err(error) => eprintln!("progress bar template rejected: {}", error),
    }
    progress
}

/// Wraps a participant's progress collaborator, forwarding increments only while the total
/// is unknown or not yet reached, and completion only once.
pub(crate) struct Tracker {
    inner: Box<dyn Progress>,
    total: Option<u64>,
    count: u64,
    finished: bool,
}

impl Tracker {
    pub(crate) fn new(inner: Box<dyn Progress>) -> Self {
        Tracker { inner, total: None, count: 0, finished: false }
    }

    pub(crate) fn set_total(&mut self, total: usize) {
        let total = total as u64;
        self.total = Some(total);
        self.inner.set_total(total);
    }

    pub(crate) fn increment(&mut self) {
        if self.total.is_none_or(|total| self.count < total) {
            self.count += 1;
            self.inner.increment();
        }
    }

    pub(crate) fn busy(&mut self, live_workers: usize) {
        self.inner.set_label(format!("busy: {}", live_workers));
    }

    pub(crate) fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            self.inner.finish();
        }
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{Progress, Tracker};

    #[derive(Default)]
    struct Record {
        total: Option<u64>,
        increments: u64,
        labels: Vec<String>,
        finishes: u64,
    }

    struct Recorder(Rc<RefCell<Record>>);

    impl Progress for Recorder {
        fn set_total(&mut self, total: u64) { self.0.borrow_mut().total = Some(total); }
        fn increment(&mut self) { self.0.borrow_mut().increments += 1; }
        fn set_label(&mut self, label: String) { self.0.borrow_mut().labels.push(label); }
        fn finish(&mut self) { self.0.borrow_mut().finishes += 1; }
    }

    #[test]
    fn increments_stop_at_total() {
        let record = Rc::new(RefCell::new(Record::default()));
        let mut tracker = Tracker::new(Box::new(Recorder(Rc::clone(&record))));
        tracker.set_total(3);
        tracker.busy(2);
        for _ in 0 .. 5 { tracker.increment(); }
        tracker.busy(1);
        tracker.finish();
        tracker.finish();

        let record = record.borrow();
        assert_eq!(record.total, Some(3));
        assert_eq!(record.increments, 3);
        assert_eq!(record.labels, vec!["busy: 2", "busy: 1"]);
        assert_eq!(record.finishes, 1);
    }

    #[test]
    fn unknown_totals_count_everything() {
        let record = Rc::new(RefCell::new(Record::default()));
        let mut tracker = Tracker::new(Box::new(Recorder(Rc::clone(&record))));
        for _ in 0 .. 5 { tracker.increment(); }
        assert_eq!(record.borrow().total, None);
        assert_eq!(record.borrow().increments, 5);
    }

    #[test]
    fn progress_bars_track_position() {
        let mut bar = indicatif::ProgressBar::hidden();
        bar.set_total(4);
        bar.increment();
        bar.increment();
        bar.set_label("busy: 3".to_string());
        assert_eq!(bar.position(), 2);
        assert_eq!(bar.length(), Some(4));
        assert!(!bar.is_finished());
        Progress::finish(&mut bar);
        assert!(bar.is_finished());
    }
}
