pub use serde::*;
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// A folder that snapshots serde values as pretty JSON or bincode blobs.
#[derive(Debug, Clone)]
pub struct FileStore {
    folder: PathBuf,
}

impl FileStore {
    pub fn new(folder: impl AsRef<Path>) -> Self {
        Self {
            folder: folder.as_ref().to_path_buf(),
        }
    }
    pub fn folder(&self) -> &Path {
        &self.folder
    }
    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.folder.join(filename)
    }
    fn create_folder(&self) -> Result<(), Box<dyn Error>> {
        if !self.folder.exists() {
            std::fs::create_dir_all(&self.folder)?;
        }
        Ok(())
    }
    pub fn save_json<T: serde::Serialize>(
        &self,
        data: &T,
        filename: &str,
    ) -> Result<PathBuf, Box<dyn Error>> {
        self.create_folder()?;
        let path = self.path_of(filename);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, data)?;
        Ok(path)
    }
    pub fn load_json<T: for<'de> serde::Deserialize<'de>>(
        &self,
        filename: &str,
    ) -> Result<T, Box<dyn Error>> {
        load_json_from(self.path_of(filename))
    }
    pub fn save_binary<T: serde::Serialize>(
        &self,
        data: &T,
        filename: &str,
    ) -> Result<PathBuf, Box<dyn Error>> {
        self.create_folder()?;
        let path = self.path_of(filename);
        let writer = BufWriter::new(File::create(&path)?);
        bincode::serialize_into(writer, data)?;
        Ok(path)
    }
    pub fn load_binary<T: for<'de> serde::Deserialize<'de>>(
        &self,
        filename: &str,
    ) -> Result<T, Box<dyn Error>> {
        let reader = BufReader::new(File::open(self.path_of(filename))?);
        Ok(bincode::deserialize_from(reader)?)
    }
    pub fn exists(&self, filename: &str) -> bool {
        self.path_of(filename).exists()
    }
}

/// Loads a JSON document from an arbitrary path.
pub fn load_json_from<T: for<'de> serde::Deserialize<'de>>(
    path: impl AsRef<Path>,
) -> Result<T, Box<dyn Error>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_and_binary_snapshots() {
        let dir = std::env::temp_dir().join(format!("file_save_{}", std::process::id()));
        let store = FileStore::new(&dir);
        let data = vec![(1_i32, "a".to_string()), (2, "b".to_string())];
        store.save_json(&data, "data.json").unwrap();
        store.save_binary(&data, "data.bin").unwrap();
        let from_json: Vec<(i32, String)> = store.load_json("data.json").unwrap();
        let from_bin: Vec<(i32, String)> = store.load_binary("data.bin").unwrap();
        assert_eq!(from_json, data);
        assert_eq!(from_bin, data);
        assert!(store.exists("data.json"));
        std::fs::remove_dir_all(dir).unwrap();
    }
}
