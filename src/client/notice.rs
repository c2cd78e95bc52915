//! User-visible notifications (the toast queue), mirrored into `log`.

use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

/// Shared notification queue; clones push into the same queue.
#[derive(Debug, Clone, Default)]
pub struct Notices {
    queue: Rc<RefCell<Vec<Notice>>>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{}", message);
        self.push(Level::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{}", message);
        self.push(Level::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        log::error!("{}", message);
        self.push(Level::Error, message);
    }

    pub fn last(&self) -> Option<Notice> {
        self.queue.borrow().last().cloned()
    }

    pub fn all(&self) -> Vec<Notice> {
        self.queue.borrow().clone()
    }

    /// Takes every queued notice, leaving the queue empty.
    pub fn drain(&self) -> Vec<Notice> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn contains(&self, level: Level, message: &str) -> bool {
        self.queue
            .borrow()
            .iter()
            .any(|n| n.level == level && n.message == message)
    }

    fn push(&self, level: Level, message: String) {
        self.queue.borrow_mut().push(Notice { level, message });
    }
}
