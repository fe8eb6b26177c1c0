//! Slices a top-level sibling run into an initial batch and ordered overflow batches.
//! Only the top level is counted; children travel with their parent.

#[derive(Debug, Clone, PartialEq)]
pub struct Batches<T> {
    pub first: Vec<T>,
    /// Appended strictly after `first`, in order.
    pub overflow: Vec<Vec<T>>,
}

impl<T> Batches<T> {
    pub fn overflow_len(&self) -> usize {
        self.overflow.iter().map(Vec::len).sum()
    }

    /// Every batch in write order, `first` included.
    pub fn into_batches(self) -> Vec<Vec<T>> {
        let mut batches = Vec::with_capacity(self.overflow.len() + 1);
        batches.push(self.first);
        batches.extend(self.overflow);
        batches
    }
}

pub fn paginate<T>(items: Vec<T>, max_per_batch: usize) -> Batches<T> {
    let size = max_per_batch.max(1);
    let mut rest = items.into_iter();
    let first: Vec<T> = rest.by_ref().take(size).collect();
    let mut overflow = Vec::new();
    loop {
        let batch: Vec<T> = rest.by_ref().take(size).collect();
        if batch.is_empty() {
            break;
        }
        overflow.push(batch);
    }
    Batches { first, overflow }
}
