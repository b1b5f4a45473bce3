//! Publish-once cell
//!
//! Compiled plans and singleton instances live in a [`SetOnce`]: the first
//! published value wins, later publishes are dropped, and readers only ever
//! see "empty" or the one published value.

use once_cell::sync::OnceCell;

/// Single-assignment slot with first-wins publication.
///
/// Unlike `OnceCell::get_or_init`, the value is produced *outside* the cell,
/// so racing producers never block on each other and a producer that
/// re-enters the same cell cannot deadlock. Racers may do redundant work;
/// only one result is ever stored.
pub struct SetOnce<T> {
    cell: OnceCell<T>,
}

impl<T> SetOnce<T> {
    /// Create an empty slot.
    #[inline]
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// The published value, if any.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Publish `value` unless another value was published first.
    ///
    /// Returns the value that ended up stored, which is `value` only if this
    /// call won the race.
    #[inline]
    pub fn publish(&self, value: T) -> &T {
        self.cell.get_or_init(move || value)
    }

    /// Whether a value has been published.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Default for SetOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SetOnce<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SetOnce").field(&self.cell.get()).finish()
    }
}
