//! File plumbing for the editor core: read-only memory maps for the
//! original buffer and atomic writes for the save path.
pub mod mmap;
pub mod save;
