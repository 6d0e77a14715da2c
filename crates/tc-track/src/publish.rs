//! `Published<T>` — the latest value of something, swapped in whole.
//!
//! Writers build a complete value and [`store`](Published::store) it; readers
//! [`load`](Published::load) an `Arc` to whichever complete value was current.
//! Reads never block and never observe a half-built value.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

pub struct Published<T> {
    slot: ArcSwap<T>,
}

impl<T> Published<T> {
    pub fn new(value: T) -> Self {
        Self { slot: ArcSwap::from_pointee(value) }
    }

    /// The current value.  Cheap; the caller may hold it as long as it likes.
    #[inline]
    pub fn load(&self) -> Arc<T> {
        self.slot.load_full()
    }

    /// Replace the current value.
    pub fn store(&self, value: T) {
        self.slot.store(Arc::new(value));
    }

    pub fn store_arc(&self, value: Arc<T>) {
        self.slot.store(value);
    }
}

impl<T: Default> Default for Published<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Published<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Published").field(&self.load()).finish()
    }
}
