use crate::errors::{TextBufferError, TextBufferResult};

/// Read access shared by both backing buffers.
pub trait BackingBuffer {
    /// Every byte the buffer holds.
    fn bytes(&self) -> &[u8];

    /// Ascending buffer offsets of every `\n` in [`BackingBuffer::bytes`].
    fn newlines(&self) -> &[u64];
}

/// Buffer offsets of every `\n` in `bytes`, shifted by `base`.
pub(crate) fn scan_newlines(bytes: &[u8], base: u64) -> TextBufferResult<Vec<u64>> {
    let count = memchr::memchr_iter(b'\n', bytes).count();
    let mut newlines = Vec::new();

    newlines.try_reserve_exact(count)?;

    for idx in memchr::memchr_iter(b'\n', bytes) {
        newlines.push(
            base.checked_add(u64::try_from(idx)?)
                .ok_or(TextBufferError::Overflow)?,
        );
    }

    Ok(newlines)
}

#[derive(Debug)]
pub enum OriginalStorage {
    Heap(Box<[u8]>),
    Mapped(io::mmap::MmapFile),
}

/// The file's content at open time. Never mutated.
#[derive(Debug)]
pub struct OriginalBuffer {
    storage: OriginalStorage,
    newlines: Vec<u64>,
}

impl OriginalBuffer {
    pub fn from_bytes(bytes: impl Into<Box<[u8]>>) -> TextBufferResult<Self> {
        let bytes = bytes.into();
        let newlines = scan_newlines(&bytes, 0)?;

        Ok(Self {
            storage: OriginalStorage::Heap(bytes),
            newlines,
        })
    }

    pub fn from_mmap(mmap: io::mmap::MmapFile) -> TextBufferResult<Self> {
        let newlines = scan_newlines(mmap.as_slice(), 0)?;

        Ok(Self {
            storage: OriginalStorage::Mapped(mmap),
            newlines,
        })
    }

    /// Trusts `newlines` to be exactly the `\n` offsets of `bytes`.
    pub(crate) fn from_parts(bytes: Box<[u8]>, newlines: Vec<u64>) -> Self {
        debug_assert_eq!(
            newlines.len(),
            memchr::memchr_iter(b'\n', &bytes).count()
        );

        Self {
            storage: OriginalStorage::Heap(bytes),
            newlines,
        }
    }

    #[inline]
    pub fn is_mapped(&self) -> bool {
        matches!(self.storage, OriginalStorage::Mapped(_))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BackingBuffer for OriginalBuffer {
    #[inline]
    fn bytes(&self) -> &[u8] {
        match &self.storage {
            OriginalStorage::Heap(bytes) => bytes,
            OriginalStorage::Mapped(mmap) => mmap.as_slice(),
        }
    }

    #[inline]
    fn newlines(&self) -> &[u64] {
        &self.newlines
    }
}

/// What [`AddBuffer::append`] wrote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Appended {
    /// Buffer range now holding the text.
    pub range: std::ops::Range<u64>,
    /// Window of the buffer's newline table covering `range`.
    pub newlines: std::ops::Range<usize>,
    /// Newline offsets relative to the start of the appended text.
    pub relative_newlines: Vec<u64>,
}

/// Every byte inserted during the session. Append-only.
#[derive(Debug, Default)]
pub struct AddBuffer {
    bytes: Vec<u8>,
    newlines: Vec<u64>,
}

impl AddBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            newlines: Vec::new(),
        }
    }

    /// Appends `text`, reserving all memory before writing anything so a
    /// failed allocation leaves the buffer untouched.
    pub fn append(&mut self, text: &[u8]) -> TextBufferResult<Appended> {
        let start = u64::try_from(self.bytes.len())?;
        let end = start
            .checked_add(u64::try_from(text.len())?)
            .ok_or(TextBufferError::Overflow)?;
        let relative_newlines = scan_newlines(text, 0)?;

        self.bytes.try_reserve(text.len())?;
        self.newlines.try_reserve(relative_newlines.len())?;

        let first_newline = self.newlines.len();

        self.bytes.extend_from_slice(text);
        self.newlines
            .extend(relative_newlines.iter().map(|&nl| start + nl));

        Ok(Appended {
            range: start..end,
            newlines: first_newline..self.newlines.len(),
            relative_newlines,
        })
    }

    /// Drops every byte, keeping at most `capacity` allocated.
    pub fn reset(&mut self, capacity: usize) {
        self.bytes.clear();
        self.newlines.clear();

        if self.bytes.capacity() > capacity {
            self.bytes.shrink_to(capacity);
        }

        self.newlines.shrink_to_fit();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }
}

impl BackingBuffer for AddBuffer {
    #[inline]
    fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    fn newlines(&self) -> &[u64] {
        &self.newlines
    }
}
