/// Aggregate of a subtree.
///
/// `byte_len` counts every line as its length plus one, as if each line
/// (including the last) were terminated, so the offset of line `n` is the
/// sum of `byte_len` over everything to its left.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineSummary {
    pub line_count: usize,
    pub byte_len: u64,
}

impl LineSummary {
    /// Summary of a run of line lengths.
    pub fn of_lines(line_lengths: &[u64]) -> Self {
        Self {
            line_count: line_lengths.len(),
            byte_len: line_lengths.iter().map(|len| len + 1).sum(),
        }
    }

    pub fn add(&mut self, other: &LineSummary) {
        self.line_count += other.line_count;
        self.byte_len += other.byte_len;
    }

    pub fn sub(&mut self, other: &LineSummary) {
        self.line_count -= other.line_count;
        self.byte_len -= other.byte_len;
    }
}
