//! Editable text storage: a piece table over an immutable original buffer
//! and an append-only add buffer, kept in step with a B-tree line index.

pub mod config;
pub mod edit_result;
pub mod enums;
pub mod errors;
pub mod line_ending;
pub mod line_index;
pub mod piece_table;
pub mod text;

pub use config::Config;
pub use edit_result::EditResult;
pub use errors::{TextBufferError, TextBufferResult};
pub use line_ending::LineEnding;
pub use line_index::LineSpan;
pub use line_index::btree::BTreeLineIndex;
pub use piece_table::table::PieceTable;
pub use text::TextBuffer;
