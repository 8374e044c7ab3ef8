/// # Piece Table Module.
///
/// The document is an ordered list of [`piece::Piece`]s, each a window into
/// one of two backing buffers ([`buffer::OriginalBuffer`] and the
/// append-only [`buffer::AddBuffer`]). Edits rewrite pieces, never bytes.
pub mod buffer;
pub mod piece;
pub mod table;
