use std::io::Write;

/// Writes `chunks` to `path` atomically.
///
/// The bytes go to a temporary file in the *same directory* as `path` (a
/// rename across filesystems is not atomic), are flushed to disk, and the
/// temporary file is then persisted over the target.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be created or written, or
/// if the final rename fails.
pub fn write_atomic<'a, P, I>(path: P, chunks: I) -> std::io::Result<u64>
where
    P: AsRef<std::path::Path>,
    I: IntoIterator<Item = &'a [u8]>,
{
    let path = path.as_ref();
    let parent_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => std::path::Path::new("."),
    };
    let mut temp_save_file = tempfile::Builder::new()
        .prefix(".save_tmp_")
        .tempfile_in(parent_dir)?;
    let mut written = 0u64;

    for chunk in chunks {
        temp_save_file.write_all(chunk)?;
        written += chunk.len() as u64;
    }

    temp_save_file.as_file().sync_all()?;
    temp_save_file.persist(path).map_err(|e| e.error)?;

    tracing::debug!(path = %path.display(), bytes = written, "saved file");

    Ok(written)
}

#[cfg(test)]
mod tests {
    #[test]
    fn writes_all_chunks_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("note.txt");
        let chunks: [&[u8]; 3] = [b"hello", b" ", b"world\n"];

        let written = super::write_atomic(&target, chunks).unwrap();

        assert_eq!(written, 12);
        assert_eq!(std::fs::read(&target).unwrap(), b"hello world\n");
    }

    #[test]
    fn replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("note.txt");

        std::fs::write(&target, b"old content that is longer").unwrap();
        super::write_atomic(&target, [&b"new"[..]]).unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }

    #[test]
    fn leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("note.txt");

        super::write_atomic(&target, [&b"x"[..]]).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
