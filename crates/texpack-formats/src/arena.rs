//! Reusable scratch buffers
//!
//! A merge touches thousands of records, each needing a payload buffer, a
//! compression scratch buffer and an encode buffer. The arena hands out one
//! buffer per purpose and takes it back afterwards, so capacity grows to the
//! largest record seen and allocation churn stops after the first few records.

/// What a scratch buffer is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferPurpose {
    /// Payload of the record currently being read
    InputRecord,
    /// Encoded bytes of the record about to be written
    OutputRecord,
    /// Destination of inflate/deflate
    Compression,
}

impl BufferPurpose {
    const COUNT: usize = 3;

    const fn slot(self) -> usize {
        match self {
            Self::InputRecord => 0,
            Self::OutputRecord => 1,
            Self::Compression => 2,
        }
    }
}

/// Pool of scratch buffers indexed by [`BufferPurpose`]
///
/// Buffers never shrink while the arena lives; everything is released when
/// the arena is dropped.
#[derive(Debug, Default)]
pub struct BufferArena {
    slots: [Vec<u8>; BufferPurpose::COUNT],
}

impl BufferArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the buffer for `purpose`, emptied but with its capacity kept
    pub fn take(&mut self, purpose: BufferPurpose) -> Vec<u8> {
        let mut buffer = std::mem::take(&mut self.slots[purpose.slot()]);
        buffer.clear();
        buffer
    }

    /// Return a buffer; the larger of it and whatever the slot holds is kept
    pub fn give_back(&mut self, purpose: BufferPurpose, buffer: Vec<u8>) {
        let slot = &mut self.slots[purpose.slot()];
        if buffer.capacity() > slot.capacity() {
            *slot = buffer;
        }
    }

    /// Capacity currently held for `purpose`
    pub fn capacity(&self, purpose: BufferPurpose) -> usize {
        self.slots[purpose.slot()].capacity()
    }

    /// Total bytes held across all slots
    pub fn total_capacity(&self) -> usize {
        self.slots.iter().map(Vec::capacity).sum()
    }
}
