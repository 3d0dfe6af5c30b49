//! Rolling telemetry for the error chart
//!
//! [`CircularBuffer`] is a fixed-capacity ring; [`ErrorTrace`] wraps it as
//! the charted error signal, starting as a flat line of zeros and shifting
//! one sample per tick.

/// A fixed-capacity circular buffer
///
/// Once full, every push overwrites the oldest element.
#[derive(Debug, Clone)]
pub struct CircularBuffer<T> {
    /// Ring buffer storage
    data: Vec<T>,
    /// Maximum capacity
    capacity: usize,
    /// Index of the oldest element once the buffer has wrapped
    head: usize,
}

impl<T> CircularBuffer<T> {
    /// Create a new circular buffer with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        }
    }

    /// Push a new element into the buffer
    ///
    /// If the buffer is full, the oldest element is overwritten.
    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }

        if self.data.len() < self.capacity {
            self.data.push(item);
        } else {
            self.data[self.head] = item;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clear all elements from the buffer
    pub fn clear(&mut self) {
        self.data.clear();
        self.head = 0;
    }

    /// Get element at logical index (0 = oldest, len-1 = newest)
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.data.len() {
            return None;
        }
        self.data.get((self.head + index) % self.data.len())
    }

    pub fn oldest(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn newest(&self) -> Option<&T> {
        self.data.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Iterate over elements from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let (wrapped, fresh) = self.data.split_at(self.head);
        fresh.iter().chain(wrapped.iter())
    }
}

/// The charted error signal
#[derive(Debug, Clone)]
pub struct ErrorTrace {
    samples: CircularBuffer<f64>,
}

impl ErrorTrace {
    /// Samples shown on the chart
    pub const DEFAULT_CAPACITY: usize = 200;

    /// Fixed y-axis range of the chart, in radians
    pub const Y_RANGE: [f64; 2] = [-0.3, 0.3];

    /// Create a trace pre-filled with zeros
    pub fn new(capacity: usize) -> Self {
        let mut samples = CircularBuffer::new(capacity);
        for _ in 0..capacity {
            samples.push(0.0);
        }
        Self { samples }
    }

    /// Append the newest error, dropping the oldest
    pub fn record(&mut self, error: f64) {
        self.samples.push(error);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.samples.capacity()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.newest().copied()
    }

    /// Samples from oldest to newest
    pub fn samples(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    /// `(index, error)` pairs for a line chart, oldest at index 0
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.samples
            .iter()
            .enumerate()
            .map(|(i, e)| (i as f64, *e))
            .collect()
    }
}

impl Default for ErrorTrace {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
