use crate::config::Config;
use crate::edit_result::EditResult;
use crate::errors::{TextBufferError, TextBufferResult};
use crate::line_ending::{self, LineEnding};
use crate::line_index::LineSpan;
use crate::line_index::btree::BTreeLineIndex;
use crate::line_index::line_iter::LineRangeIter;
use crate::piece_table::buffer::{BackingBuffer, OriginalBuffer};
use crate::piece_table::table::PieceTable;

/// One open document.
///
/// - Ownership of State: the `TextBuffer` owns the piece table and the line
///   index so they never drift out of sync. Every edit is validated, applied
///   to the piece table, and its [`EditResult`] applied to the line index
///   before the call returns.
/// - Immutability for Reads: queries take `&self`.
#[derive(Debug)]
pub struct TextBuffer {
    piece_table: PieceTable,
    line_index: BTreeLineIndex,

    /// Detected once on open. Edits do not re-detect it.
    line_ending: LineEnding,

    /// Tracks if the buffer has unsaved changes.
    is_dirty: bool,

    /// The file path, if this buffer is tied to a file on disk.
    filepath: Option<std::path::PathBuf>,
}

/*

==================================
===== CREATION, OPEN, & SAVE =====
==================================

*/

impl TextBuffer {
    /// Creates a buffer over a heap copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> TextBufferResult<Self> {
        Self::from_bytes_with(bytes, Config::default())
    }

    pub fn from_bytes_with(bytes: &[u8], config: Config) -> TextBufferResult<Self> {
        Self::from_original(OriginalBuffer::from_bytes(bytes)?, config, None)
    }

    /// Opens a file, maps it into memory, and builds the initial indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, lacks read permissions,
    /// or if the memory mapping operation fails.
    pub fn open_path<P: AsRef<std::path::Path>>(path: P) -> TextBufferResult<Self> {
        Self::open_path_with(path, Config::default())
    }

    pub fn open_path_with<P: AsRef<std::path::Path>>(
        path: P,
        config: Config,
    ) -> TextBufferResult<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let mmap_file = io::mmap::MmapFile::open(&path_buf)?;
        let original = OriginalBuffer::from_mmap(mmap_file)?;

        Self::from_original(original, config, Some(path_buf))
    }

    fn from_original(
        original: OriginalBuffer,
        config: Config,
        filepath: Option<std::path::PathBuf>,
    ) -> TextBufferResult<Self> {
        // The slice borrow ends before the original moves into the table.
        let line_index = BTreeLineIndex::build(original.bytes())?;
        let line_ending = LineEnding::detect(original.bytes());
        let piece_table = PieceTable::with_config(original, config)?;

        tracing::debug!(
            path = ?filepath,
            bytes = piece_table.len(),
            lines = line_index.line_count(),
            ?line_ending,
            "opened document"
        );

        Ok(Self {
            piece_table,
            line_index,
            line_ending,
            is_dirty: false,
            filepath,
        })
    }

    /// Writes the current content to `writer`, returning the byte count.
    pub fn write_to<W: std::io::Write>(&self, mut writer: W) -> TextBufferResult<u64> {
        for chunk in self.piece_table.iter_bytes() {
            writer.write_all(chunk)?;
        }

        writer.flush()?;

        Ok(self.piece_table.len())
    }

    /// Atomically saves the content to `path` and ties the buffer to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary save file cannot be written or if
    /// the atomic rename fails; the buffer stays dirty in that case.
    pub fn save_to<P: AsRef<std::path::Path>>(&mut self, path: P) -> TextBufferResult<u64> {
        let path = path.as_ref();
        let written = io::save::write_atomic(path, self.piece_table.iter_bytes())?;

        self.filepath = Some(path.to_path_buf());
        self.is_dirty = false;

        Ok(written)
    }

    /// Saves to the path the buffer was opened from or last saved to.
    pub fn save(&mut self) -> TextBufferResult<u64> {
        let filepath = self
            .filepath
            .clone()
            .ok_or(TextBufferError::InvalidInput(
                "no file path associated with this buffer",
            ))?;

        self.save_to(filepath)
    }
}

/*

==========================
===== INLINE METHODS =====
==========================

*/

impl TextBuffer {
    /// Returns the total number of lines in the buffer.
    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_index.line_count()
    }

    /// Returns the total byte size of the document.
    #[inline]
    pub fn document_length(&self) -> u64 {
        self.piece_table.len()
    }

    #[inline]
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    #[inline]
    pub fn path(&self) -> Option<&std::path::Path> {
        self.filepath.as_deref()
    }

    #[inline]
    pub fn piece_count(&self) -> usize {
        self.piece_table.piece_count()
    }

    #[inline]
    pub fn piece_table(&self) -> &PieceTable {
        &self.piece_table
    }

    #[inline]
    pub fn line_index(&self) -> &BTreeLineIndex {
        &self.line_index
    }
}

/*

===========================
========= GETTERS =========
===========================

*/

impl TextBuffer {
    pub fn read(&self, offset: u64, length: u64) -> TextBufferResult<Vec<u8>> {
        self.piece_table.get_bytes_at(offset, length)
    }

    /// Like [`TextBuffer::read`], replacing invalid UTF-8 with U+FFFD.
    pub fn read_string(&self, offset: u64, length: u64) -> TextBufferResult<String> {
        self.piece_table.get_string(offset, length)
    }

    pub fn line_at(&self, line_idx: usize) -> TextBufferResult<LineSpan> {
        self.line_index.line_at(line_idx)
    }

    pub fn line_number_at(&self, offset: u64) -> TextBufferResult<usize> {
        self.line_index.line_number_at(offset)
    }

    /// Bytes of line `line_idx`, without its `\n`.
    pub fn line_text(&self, line_idx: usize) -> TextBufferResult<Vec<u8>> {
        let span = self.line_index.line_at(line_idx)?;

        self.piece_table.get_bytes_at(span.start_offset, span.length)
    }

    /// Like [`TextBuffer::line_text`], minus the `\r` of a `\r\n` break.
    pub fn line_text_stripped(&self, line_idx: usize) -> TextBufferResult<Vec<u8>> {
        let mut line = self.line_text(line_idx)?;
        let stripped = line_ending::strip_cr(&line).len();

        line.truncate(stripped);

        Ok(line)
    }

    /// The hot path for rendering the visible viewport.
    pub fn lines(&self, range: std::ops::Range<usize>) -> LineRangeIter<'_> {
        self.line_index.lines(range)
    }

    pub fn iter(&self) -> LineRangeIter<'_> {
        self.line_index.iter()
    }

    pub fn serialize(&self) -> TextBufferResult<Vec<u8>> {
        self.piece_table.serialize()
    }
}

/*

========================================
========= INSERTION & DELETION =========
========================================

*/

impl TextBuffer {
    pub fn insert(&mut self, offset: u64, text: &[u8]) -> TextBufferResult<EditResult> {
        self.line_index
            .reserve_lines(memchr::memchr_iter(b'\n', text).count())?;

        let edit = self.piece_table.insert(offset, text)?;

        self.sync(&edit)?;

        Ok(edit)
    }

    pub fn delete(&mut self, offset: u64, length: u64) -> TextBufferResult<EditResult> {
        let edit = self.piece_table.delete(offset, length)?;

        self.sync(&edit)?;

        Ok(edit)
    }

    /// Replaces `length` bytes at `offset` with `text`: one delta, one undo
    /// step.
    pub fn replace(
        &mut self,
        offset: u64,
        length: u64,
        text: &[u8],
    ) -> TextBufferResult<EditResult> {
        self.line_index
            .reserve_lines(memchr::memchr_iter(b'\n', text).count())?;

        let edit = self.piece_table.replace(offset, length, text)?;

        self.sync(&edit)?;

        Ok(edit)
    }

    fn sync(&mut self, edit: &EditResult) -> TextBufferResult<()> {
        if edit.is_noop() {
            return Ok(());
        }

        self.line_index.apply_edit(edit)?;
        self.is_dirty = true;

        Ok(())
    }
}

/*

===============================
========= UNDO & REDO =========
===============================

*/

impl TextBuffer {
    /// Reverts the last edit in both structures. `Ok(None)` when the history
    /// is empty.
    pub fn undo(&mut self) -> TextBufferResult<Option<EditResult>> {
        self.line_index
            .reserve_lines(self.piece_table.undo_newlines())?;

        let Some(edit) = self.piece_table.undo()? else {
            return Ok(None);
        };

        self.sync(&edit)?;

        Ok(Some(edit))
    }

    pub fn redo(&mut self) -> TextBufferResult<Option<EditResult>> {
        self.line_index
            .reserve_lines(self.piece_table.redo_newlines())?;

        let Some(edit) = self.piece_table.redo()? else {
            return Ok(None);
        };

        self.sync(&edit)?;

        Ok(Some(edit))
    }

    /// Flattens the piece table into a fresh original buffer. Content, line
    /// structure and the dirty flag are unchanged; history is cleared.
    pub fn compact(&mut self) -> TextBufferResult<()> {
        self.piece_table.compact()?;

        tracing::debug!(
            path = ?self.filepath,
            lines = self.line_index.line_count(),
            "compacted document"
        );

        Ok(())
    }
}

impl std::fmt::Display for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes = self.piece_table.serialize().map_err(|_| std::fmt::Error)?;

        f.write_str(&String::from_utf8_lossy(&bytes))
    }
}
