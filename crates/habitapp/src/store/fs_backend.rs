use super::backend::StorageBackend;
use super::StoreKey;
use crate::error::{HabitError, Result};
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

/// File-per-key backend: `<root>/habits.json` and `<root>/completions.json`.
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn path_for(&self, key: StoreKey) -> PathBuf {
        self.root.join(format!("{}.json", key.as_str()))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(HabitError::Io)?;
        }
        Ok(())
    }
}

impl StorageBackend for FsBackend {
    fn load(&self, key: StoreKey) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(HabitError::Io)?;
        Ok(Some(content))
    }

    fn save(&self, key: StoreKey, payload: &str) -> Result<()> {
        self.ensure_dir()?;

        let target = self.path_for(key);
        let tmp = self
            .root
            .join(format!(".{}-{}.tmp", key.as_str(), Uuid::new_v4()));
        fs::write(&tmp, payload).map_err(HabitError::Io)?;
        if let Err(err) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(HabitError::Io(err));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_as_absent() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new(dir.path().to_path_buf());
        assert_eq!(backend.load(StoreKey::Habits).unwrap(), None);
    }

    #[test]
    fn save_creates_directory_and_replaces_content() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new(dir.path().join("nested").join("data"));

        backend.save(StoreKey::Completions, "[1]").unwrap();
        backend.save(StoreKey::Completions, "[2]").unwrap();

        assert_eq!(
            backend.load(StoreKey::Completions).unwrap().as_deref(),
            Some("[2]")
        );
        assert!(backend.path_for(StoreKey::Completions).ends_with("completions.json"));
        assert_eq!(backend.load(StoreKey::Habits).unwrap(), None);
    }

    #[test]
    fn save_leaves_no_temp_files_behind() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new(dir.path().to_path_buf());
        backend.save(StoreKey::Habits, "[]").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["habits.json".to_string()]);
    }

    #[test]
    fn unreadable_path_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new(dir.path().to_path_buf());
        // A directory where the file should be cannot be read as a string.
        fs::create_dir_all(backend.path_for(StoreKey::Habits)).unwrap();
        assert!(matches!(
            backend.load(StoreKey::Habits),
            Err(HabitError::Io(_))
        ));
    }
}
