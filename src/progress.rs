use std::cell::RefCell;

/// Transition points of a run. `Finished` carries an empty message on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    LocatingExecutable,
    ExternalRunStarted,
    PostProcessingStarted,
    Finished(String),
}

/// Receiver for [`Progress`] notifications. Notifications never steer the run.
pub trait ProgressListener {
    fn notify(&self, event: Progress);
}

/// Listener that ignores everything.
pub struct Silent;

impl ProgressListener for Silent {
    fn notify(&self, _event: Progress) {}
}

impl<F: Fn(Progress)> ProgressListener for F {
    fn notify(&self, event: Progress) {
        self(event)
    }
}

/// Listener that keeps every notification, mainly for tests.
#[derive(Default)]
pub struct Recorder {
    events: RefCell<Vec<Progress>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Progress> {
        self.events.borrow().clone()
    }
}

impl ProgressListener for Recorder {
    fn notify(&self, event: Progress) {
        self.events.borrow_mut().push(event);
    }
}
