//! `dev6!` developer lines: one JSON object per line, routed to the [`DEV_TARGET`] log
//! target (persisted to `dev6.log` when enabled) and optionally captured per thread.

use std::cell::RefCell;
use std::marker::PhantomData;

/// Log target of [`dev6!`](crate::dev6) lines.
pub const DEV_TARGET: &str = "pagewise::dev6";

thread_local! {
    static CAPTURED: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Records `dev6!` lines emitted on the current thread until dropped.
///
/// Starting a capture while one is active discards the lines gathered so far.
#[must_use = "capture ends when the guard is dropped"]
pub struct Capture {
    _thread_bound: PhantomData<*const ()>,
}

impl Capture {
    pub fn start() -> Self {
        CAPTURED.with(|c| *c.borrow_mut() = Some(Vec::new()));
        Self { _thread_bound: PhantomData }
    }

    /// Lines captured so far, left in place.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        CAPTURED.with(|c| c.borrow().clone().unwrap_or_default())
    }

    /// Lines captured so far; the buffer starts empty again.
    pub fn take(&self) -> Vec<String> {
        CAPTURED.with(|c| c.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        CAPTURED.with(|c| *c.borrow_mut() = None);
    }
}

#[doc(hidden)]
pub fn emit(line: String) {
    log::trace!(target: DEV_TARGET, "{line}");
    CAPTURED.with(|c| {
        if let Some(buf) = c.borrow_mut().as_mut() {
            buf.push(line);
        }
    });
}

/// Emits a developer line with `format!` syntax.
#[macro_export]
macro_rules! dev6 {
    ($($arg:tt)*) => {
        $crate::utils::devlog::emit(format!($($arg)*))
    };
}
