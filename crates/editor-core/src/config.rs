/// Tunables for a document session.
///
/// Every field has a sensible default; construct with [`Config::default`]
/// and override with the `with_*` builders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Capacity reserved for the add buffer up front, and the capacity it
    /// is shrunk back to by [`PieceTable::compact`](crate::piece_table::table::PieceTable::compact).
    pub add_buffer_capacity: usize,
    /// Extend the previous add piece instead of creating a new one when an
    /// insert continues it (sequential typing).
    pub coalesce_inserts: bool,
    /// Record piece-level undo/redo history.
    pub history: bool,
    /// Fold runs of typing, backspacing or forward-deleting within a line
    /// into a single undo step. A `\n` on either side ends the run.
    pub group_edits: bool,
}

pub const DEFAULT_ADD_BUFFER_CAPACITY: usize = 64 * 1024;

impl Default for Config {
    fn default() -> Self {
        Self {
            add_buffer_capacity: DEFAULT_ADD_BUFFER_CAPACITY,
            coalesce_inserts: true,
            history: true,
            group_edits: true,
        }
    }
}

impl Config {
    #[must_use]
    pub fn with_add_buffer_capacity(mut self, capacity: usize) -> Self {
        self.add_buffer_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_coalesce_inserts(mut self, coalesce: bool) -> Self {
        self.coalesce_inserts = coalesce;
        self
    }

    #[must_use]
    pub fn with_history(mut self, history: bool) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub fn with_group_edits(mut self, group: bool) -> Self {
        self.group_edits = group;
        self
    }
}
