use std::io::{self, Write};
use std::path::Path;

/// Write a file by streaming into a temporary file next to `path` and renaming it into place.
///
/// Parent directories are created as needed. Readers of `path` either see the previous content
/// or the complete new content, never a partially written file. If `write` returns an error then
/// the temporary file is removed and whatever was at `path` is left as it was.
pub fn write_atomic<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut file = tempfile::NamedTempFile::new_in(parent)?;
    {
        let mut writer = io::BufWriter::new(file.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    file.as_file().sync_all()?;

    log::trace!(
        "Renaming {} into place at {}",
        file.path().display(),
        path.display()
    );
    file.persist(path).map_err(|e| e.error)?;

    Ok(())
}
