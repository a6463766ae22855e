use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
};

/// What a drain hands back: the buffered items in push order, plus how many
/// were shed since the previous drain.
#[derive(Debug)]
pub struct Drained<T> {
    pub items: Vec<T>,
    pub dropped: u64,
}

/// Bounded FIFO that never rejects a push. Once `capacity` is reached the
/// oldest entries are discarded until only the newest `capacity / 2` remain.
pub struct ShedHalfQueue<T> {
    inner: Mutex<ShedHalfInner<T>>,
    capacity: usize,
}

struct ShedHalfInner<T> {
    buf: VecDeque<T>,
    dropped: u64,
}

impl<T> ShedHalfQueue<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2);

        Self {
            inner: Mutex::new(ShedHalfInner {
                buf: VecDeque::with_capacity(capacity),
                dropped: 0,
            }),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ShedHalfInner<T>> {
        // A panic elsewhere must not take tracking down with it.
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Appends `value`, shedding first if the queue is full. Returns the new
    /// length and how many entries this push discarded.
    pub fn push_shedding(&self, value: T) -> (usize, usize) {
        let mut inner = self.lock();
        let mut shed = 0;
        if inner.buf.len() >= self.capacity {
            let keep = self.capacity / 2;
            shed = inner.buf.len() - keep;
            inner.buf.drain(..shed);
            inner.dropped += shed as u64;
        }
        inner.buf.push_back(value);
        (inner.buf.len(), shed)
    }

    /// Swaps the buffer out for an empty one.
    pub fn drain(&self) -> Drained<T> {
        let mut inner = self.lock();
        let items = std::mem::take(&mut inner.buf);
        let dropped = std::mem::take(&mut inner.dropped);
        Drained {
            items: items.into(),
            dropped,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
