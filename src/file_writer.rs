use crate::*;
use std::sync::{Arc, Mutex};

/// Append-only trace file shared between the rounds of one attempt.
/// The file is truncated when the writer is created.
#[derive(Clone)]
pub struct FileWriter {
    file: Arc<Mutex<fs::File>>,
    path: PathBuf,
}

impl FileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SynthError::io(parent, e))?;
        }
        let file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| SynthError::io(&path, e))?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            path,
        })
    }

    fn with_file(&self, f: impl FnOnce(&mut fs::File) -> std::io::Result<()>) -> Result<()> {
        let mut guard = self.file.lock().map_err(|e| {
            SynthError::io(
                &self.path,
                std::io::Error::other(format!("poisoned file lock: {}", e)),
            )
        })?;
        f(&mut guard).map_err(|e| SynthError::io(&self.path, e))
    }

    pub fn write(&self, data: &str) -> Result<()> {
        self.with_file(|file| file.write_all(data.as_bytes()))
    }
    pub fn write_line(&self, line: &str) -> Result<()> {
        self.with_file(|file| {
            file.write_all(line.as_bytes())?;
            file.write_all(b"\n")
        })
    }
    pub fn flush(&self) -> Result<()> {
        self.with_file(|file| file.flush())
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncates_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/rounds.log");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "stale\n").unwrap();
        let writer = FileWriter::new(&path).unwrap();
        let clone = writer.clone();
        writer.write("round 0").unwrap();
        clone.write_line(" done").unwrap();
        writer.flush().unwrap();
        assert_eq!(fs::read_to_string(writer.path()).unwrap(), "round 0 done\n");
    }
}
