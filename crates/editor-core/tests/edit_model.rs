//! Random edit sequences checked against a plain `Vec<u8>` model.

use editor_core::{Config, TextBuffer};
use proptest::prelude::*;
use proptest::sample::Index;

fn init_tracing() {
    // Filtered by RUST_LOG; silent otherwise.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn text_byte() -> impl Strategy<Value = u8> {
    prop_oneof![3 => Just(b'\n'), 10 => b'a'..=b'e']
}

fn text(max: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(text_byte(), 0..max)
}

#[derive(Clone, Debug)]
enum Op {
    Insert(Index, Vec<u8>),
    Delete(Index, Index),
    Replace(Index, Index, Vec<u8>),
    Undo,
    Redo,
    Compact,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (any::<Index>(), text(40)).prop_map(|(at, t)| Op::Insert(at, t)),
        4 => (any::<Index>(), any::<Index>()).prop_map(|(at, len)| Op::Delete(at, len)),
        2 => (any::<Index>(), any::<Index>(), text(20))
            .prop_map(|(at, len, t)| Op::Replace(at, len, t)),
        2 => Just(Op::Undo),
        1 => Just(Op::Redo),
        1 => Just(Op::Compact),
    ]
}

/// One history entry per edit, so the snapshot model below lines up.
fn open_ungrouped(bytes: &[u8]) -> TextBuffer {
    TextBuffer::from_bytes_with(bytes, Config::default().with_group_edits(false)).unwrap()
}

/// The document plus snapshots mirroring the piece-level history.
struct Model {
    bytes: Vec<u8>,
    undo: Vec<Vec<u8>>,
    redo: Vec<Vec<u8>>,
}

impl Model {
    fn record(&mut self) {
        self.undo.push(self.bytes.clone());
        self.redo.clear();
    }

    /// Picks an offset in `0..=len` and a length that fits after it.
    fn range(&self, at: &Index, len: &Index) -> (usize, usize) {
        let pos = at.index(self.bytes.len() + 1);

        (pos, len.index(self.bytes.len() - pos + 1))
    }
}

fn apply(buffer: &mut TextBuffer, model: &mut Model, op: &Op) -> Result<(), TestCaseError> {
    match op {
        Op::Insert(at, t) => {
            let pos = at.index(model.bytes.len() + 1);
            let edit = buffer.insert(pos as u64, t).unwrap();

            prop_assert_eq!(edit.inserted_len, t.len() as u64);

            if !t.is_empty() {
                model.record();
            }

            model.bytes.splice(pos..pos, t.iter().copied());
        }
        Op::Delete(at, len) => {
            let (pos, len) = model.range(at, len);
            let removed_newlines = model.bytes[pos..pos + len]
                .iter()
                .filter(|&&b| b == b'\n')
                .count();
            let edit = buffer.delete(pos as u64, len as u64).unwrap();

            prop_assert_eq!(edit.removed_newlines, removed_newlines);

            if len > 0 {
                model.record();
            }

            model.bytes.drain(pos..pos + len);
        }
        Op::Replace(at, len, t) => {
            let (pos, len) = model.range(at, len);

            buffer.replace(pos as u64, len as u64, t).unwrap();

            if len > 0 || !t.is_empty() {
                model.record();
            }

            model.bytes.splice(pos..pos + len, t.iter().copied());
        }
        Op::Undo => {
            let undone = buffer.undo().unwrap();

            prop_assert_eq!(undone.is_some(), !model.undo.is_empty());

            if let Some(previous) = model.undo.pop() {
                model.redo.push(std::mem::replace(&mut model.bytes, previous));
            }
        }
        Op::Redo => {
            let redone = buffer.redo().unwrap();

            prop_assert_eq!(redone.is_some(), !model.redo.is_empty());

            if let Some(next) = model.redo.pop() {
                model.undo.push(std::mem::replace(&mut model.bytes, next));
            }
        }
        Op::Compact => {
            buffer.compact().unwrap();
            prop_assert_eq!(buffer.piece_count(), usize::from(!model.bytes.is_empty()));

            model.undo.clear();
            model.redo.clear();
        }
    }

    Ok(())
}

fn assert_consistent(buffer: &TextBuffer, model: &[u8]) -> Result<(), TestCaseError> {
    prop_assert_eq!(buffer.serialize().unwrap(), model);
    prop_assert_eq!(buffer.document_length(), model.len() as u64);

    let newlines = model.iter().filter(|&&b| b == b'\n').count();

    prop_assert_eq!(buffer.line_count(), newlines + 1);

    for (line_idx, line) in model.split(|&b| b == b'\n').enumerate() {
        prop_assert_eq!(buffer.line_text(line_idx).unwrap(), line);
    }

    for offset in 0..=model.len() as u64 {
        let line_idx = buffer.line_number_at(offset).unwrap();
        let span = buffer.line_at(line_idx).unwrap();

        prop_assert!(span.start_offset <= offset && offset <= span.end_offset());
    }

    for line_idx in 0..buffer.line_count() {
        let start = buffer.line_at(line_idx).unwrap().start_offset;

        prop_assert_eq!(buffer.line_number_at(start).unwrap(), line_idx);
    }

    let index = buffer.line_index();

    prop_assert_eq!(index.document_length(), model.len() as u64);
    prop_assert_eq!(index.check_invariants(), Ok(()));

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_edits_match_the_model(
        initial in text(2_000),
        ops in prop::collection::vec(op(), 1..40),
    ) {
        init_tracing();

        let mut buffer = open_ungrouped(&initial);
        let mut model = Model { bytes: initial, undo: Vec::new(), redo: Vec::new() };

        assert_consistent(&buffer, &model.bytes)?;

        for op in &ops {
            apply(&mut buffer, &mut model, op)?;
            assert_consistent(&buffer, &model.bytes)?;
        }
    }

    #[test]
    fn open_then_serialize_round_trips(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let buffer = TextBuffer::from_bytes(&bytes).unwrap();

        prop_assert_eq!(buffer.serialize().unwrap(), bytes.clone());
        prop_assert_eq!(
            buffer.line_count(),
            bytes.iter().filter(|&&b| b == b'\n').count() + 1
        );
    }

    #[test]
    fn inserted_text_reads_back(initial in text(200), at in any::<Index>(), t in text(60)) {
        let mut buffer = TextBuffer::from_bytes(&initial).unwrap();
        let pos = at.index(initial.len() + 1) as u64;

        buffer.insert(pos, &t).unwrap();

        prop_assert_eq!(buffer.read(pos, t.len() as u64).unwrap(), t.clone());
        prop_assert_eq!(buffer.document_length(), (initial.len() + t.len()) as u64);
    }

    #[test]
    fn delete_shrinks_by_its_length(initial in text(200), at in any::<Index>(), len in any::<Index>()) {
        let mut buffer = TextBuffer::from_bytes(&initial).unwrap();
        let pos = at.index(initial.len() + 1);
        let len = len.index(initial.len() - pos + 1);

        buffer.delete(pos as u64, len as u64).unwrap();

        prop_assert_eq!(buffer.document_length(), (initial.len() - len) as u64);
    }

    #[test]
    fn empty_insert_changes_nothing(initial in text(200), at in any::<Index>()) {
        let mut buffer = TextBuffer::from_bytes(&initial).unwrap();
        let lines = buffer.line_count();

        buffer.insert(at.index(initial.len() + 1) as u64, b"").unwrap();

        prop_assert_eq!(buffer.serialize().unwrap(), initial);
        prop_assert_eq!(buffer.line_count(), lines);
        prop_assert!(!buffer.is_dirty());
    }

    #[test]
    fn undoing_everything_restores_the_original(
        initial in text(300),
        ops in prop::collection::vec(op(), 1..25),
    ) {
        let mut buffer = open_ungrouped(&initial);
        let mut model = Model { bytes: initial.clone(), undo: Vec::new(), redo: Vec::new() };
        let edits: Vec<Op> = ops.into_iter().filter(|op| !matches!(op, Op::Compact)).collect();

        for op in &edits {
            apply(&mut buffer, &mut model, op)?;
        }

        while buffer.undo().unwrap().is_some() {}

        prop_assert_eq!(buffer.serialize().unwrap(), initial.clone());
        assert_consistent(&buffer, &initial)?;
    }

    #[test]
    fn typing_a_word_undoes_in_one_step(
        initial in text(200),
        at in any::<Index>(),
        word in prop::collection::vec(b'a'..=b'e', 1..20),
    ) {
        let mut buffer = TextBuffer::from_bytes(&initial).unwrap();
        let pos = at.index(initial.len() + 1) as u64;

        for (i, byte) in word.iter().enumerate() {
            buffer.insert(pos + i as u64, std::slice::from_ref(byte)).unwrap();
        }

        prop_assert!(buffer.undo().unwrap().is_some());
        prop_assert!(buffer.undo().unwrap().is_none());
        assert_consistent(&buffer, &initial)?;
    }
}

#[test]
fn out_of_range_edits_leave_both_structures_untouched() {
    init_tracing();

    let mut buffer = TextBuffer::from_bytes(b"ab\ncd\n").unwrap();

    assert!(buffer.insert(7, b"x").is_err());
    assert!(buffer.delete(5, 2).is_err());
    assert!(buffer.replace(6, 1, b"y").is_err());
    assert!(buffer.read(0, 7).is_err());

    assert_eq!(buffer.serialize().unwrap(), b"ab\ncd\n");
    assert_eq!(buffer.line_count(), 3);
    assert_eq!(buffer.line_at(1).unwrap().start_offset, 3);
    assert_eq!(buffer.line_number_at(6).unwrap(), 2);
    assert!(!buffer.is_dirty());
}

#[test]
fn typing_a_long_document_stays_balanced() {
    let mut buffer = TextBuffer::from_bytes(b"").unwrap();

    for n in 0..3_000u64 {
        let line = format!("line {n}\n");

        buffer.insert(buffer.document_length(), line.as_bytes()).unwrap();
    }

    assert_eq!(buffer.line_count(), 3_001);
    assert_eq!(buffer.piece_count(), 1);
    assert_eq!(buffer.line_text(1_234).unwrap(), b"line 1234");
    assert_eq!(buffer.line_index().check_invariants(), Ok(()));
    assert!(buffer.line_index().depth() <= 5);

    // Carve out the middle third and check the seams.
    let start = buffer.line_at(1_000).unwrap().start_offset;
    let end = buffer.line_at(2_000).unwrap().start_offset;

    buffer.delete(start, end - start).unwrap();

    assert_eq!(buffer.line_count(), 2_001);
    assert_eq!(buffer.line_text(999).unwrap(), b"line 999");
    assert_eq!(buffer.line_text(1_000).unwrap(), b"line 2000");
    assert_eq!(buffer.line_index().check_invariants(), Ok(()));
}
