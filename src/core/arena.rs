//! Byte arena with independent read and write cursors

/// Initial arena size (2 MiB)
pub const DEFAULT_ARENA_CAPACITY: usize = 2 * 1024 * 1024;

/// Below this size a growable arena doubles; above it, it grows linearly
pub const GROWTH_THRESHOLD: usize = 8 * 1024 * 1024;

/// Linear growth step once past [`GROWTH_THRESHOLD`]
pub const GROWTH_INCREMENT: usize = 1024 * 1024;

/// Whether an arena may reallocate to fit a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaMode {
    /// Grows on demand; `push` always succeeds
    Growable,
    /// Never grows; callers check [`ByteArena::writable_size`] first
    Fixed,
}

/// A contiguous byte region with `read <= write <= capacity`.
///
/// Cursors only move forward until [`reset`](ByteArena::reset), which rewinds
/// both and keeps the storage.
#[derive(Debug)]
pub struct ByteArena {
    storage: Vec<u8>,
    write: usize,
    read: usize,
    mode: ArenaMode,
}

impl ByteArena {
    pub fn new(capacity: usize, mode: ArenaMode) -> Self {
        Self {
            storage: vec![0; capacity],
            write: 0,
            read: 0,
            mode,
        }
    }

    pub fn growable(capacity: usize) -> Self {
        Self::new(capacity, ArenaMode::Growable)
    }

    pub fn fixed(capacity: usize) -> Self {
        Self::new(capacity, ArenaMode::Fixed)
    }

    pub fn mode(&self) -> ArenaMode {
        self.mode
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Copy `bytes` in at the write cursor.
    ///
    /// # Panics
    ///
    /// Panics on a fixed arena without room for `bytes`.
    pub fn push(&mut self, bytes: &[u8]) {
        self.ensure_writable(bytes.len());
        let end = self.write + bytes.len();
        self.storage[self.write..end].copy_from_slice(bytes);
        self.write = end;
    }

    pub fn readable_size(&self) -> usize {
        self.write - self.read
    }

    /// Room left before the arena must grow
    pub fn writable_size(&self) -> usize {
        self.storage.len() - self.write
    }

    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }

    /// Unread bytes
    pub fn view_from_read(&self) -> &[u8] {
        &self.storage[self.read..self.write]
    }

    /// # Panics
    ///
    /// Panics if `n` exceeds the readable size.
    pub fn advance_read(&mut self, n: usize) {
        assert!(
            n <= self.readable_size(),
            "advance_read({}) past readable size {}",
            n,
            self.readable_size()
        );
        self.read += n;
    }

    pub fn reset(&mut self) {
        self.read = 0;
        self.write = 0;
    }

    /// Exchange contents with `other` without copying bytes.
    pub fn swap_with(&mut self, other: &mut ByteArena) {
        std::mem::swap(self, other);
    }

    fn ensure_writable(&mut self, len: usize) {
        if len <= self.writable_size() {
            return;
        }
        assert!(
            self.mode == ArenaMode::Growable,
            "push of {} bytes into fixed arena with {} writable",
            len,
            self.writable_size()
        );
        let current = self.storage.len();
        let new_size = if current < GROWTH_THRESHOLD {
            current * 2 + len
        } else {
            current + GROWTH_INCREMENT + len
        };
        self.storage.resize(new_size, 0);
    }
}

impl Default for ByteArena {
    fn default() -> Self {
        Self::growable(DEFAULT_ARENA_CAPACITY)
    }
}
