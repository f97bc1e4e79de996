use std::sync::atomic::{AtomicBool, Ordering};

/// Flag that lets only one pass run at a time.
#[derive(Default)]
pub struct ReentrancyGuard(AtomicBool);

impl ReentrancyGuard {
    /// Enter the guarded section, [`None`] if it is already occupied.
    ///
    /// The section is left when the returned token is dropped.
    pub fn try_enter(&self) -> Option<PassToken<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
            .then_some(PassToken(&self.0))
    }
}

#[must_use]
pub struct PassToken<'a>(&'a AtomicBool);

impl Drop for PassToken<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
