//! Fixed-capacity record buffers used as the write / flush pair

/// Ordered records with a hard length limit.
///
/// The backing storage is reserved once for `capacity` records and is never
/// reallocated: a swap exchanges the two allocations instead of copying records.
#[derive(Debug)]
pub(crate) struct Buffer<T> {
    records: Vec<T>,
    capacity: usize,
}

impl<T> Buffer<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Caller must check `is_full` first.
    pub(crate) fn append(&mut self, record: T) {
        debug_assert!(self.records.len() < self.capacity, "append on a full buffer");
        self.records.push(record);
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub(crate) fn as_slice(&self) -> &[T] {
        &self.records
    }

    /// Drop held records, keeping the allocation.
    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }

    /// Move the contents of `write` into `self` and hand `self`'s storage
    /// back to `write` empty. Returns the number of records now held here.
    pub(crate) fn swap_with(&mut self, write: &mut Buffer<T>) -> usize {
        // Records left over from the previous batch when clearing is off.
        self.records.clear();
        std::mem::swap(&mut self.records, &mut write.records);
        self.records.len()
    }
}
