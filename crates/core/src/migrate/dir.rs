use std::fs;
use std::path::{Path, PathBuf};

use crate::{Result, UserError};

use super::hash::HASH_FILE_NAME;

const LOCK_FILE_NAME: &str = ".atlas.lock";

/// One migration file of a directory, split into its version token and
/// optional description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub name: String,
    pub version: String,
    pub description: String,
}

/// Split `<version>[_<name>].sql` into its parts. The version token is
/// everything up to the first underscore.
pub fn split_file_name(name: &str) -> Result<(String, String)> {
    let Some(stem) = name.strip_suffix(".sql") else {
        return Err(UserError::FileName {
            name: name.to_string(),
            reason: "migration files use the .sql suffix".to_string(),
        }
        .into());
    };
    let (version, description) = match stem.split_once('_') {
        Some((v, d)) => (v, d),
        None => (stem, ""),
    };
    if version.is_empty() {
        return Err(UserError::FileName {
            name: name.to_string(),
            reason: "file name must begin with a version token".to_string(),
        }
        .into());
    }
    Ok((version.to_string(), description.to_string()))
}

/// An ordered, content-addressed store of migration files on the local
/// filesystem. Versions sort lexicographically, which is correct for the
/// fixed-width numeric and timestamp tokens the `new` command generates.
#[derive(Debug, Clone)]
pub struct LocalDir {
    path: PathBuf,
    /// Truncate the directory view at this version (`?version=` in the
    /// directory URL).
    version_limit: Option<String>,
}

impl LocalDir {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_dir() {
            return Err(UserError::DirtyDirectory {
                path: path.display().to_string(),
                reason: "not a directory".to_string(),
            }
            .into());
        }
        Ok(Self {
            path,
            version_limit: None,
        })
    }

    /// Create the directory when missing, then open it.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        fs::create_dir_all(&path)?;
        Self::open(path)
    }

    pub fn with_version_limit(mut self, version: impl Into<String>) -> Self {
        self.version_limit = Some(version.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    /// Migration files sorted by version. Non-migration files (the sum
    /// file, editor droppings) are skipped.
    pub fn files(&self) -> Result<Vec<MigrationFile>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".sql") {
                continue;
            }
            let (version, description) = split_file_name(&name)?;
            if let Some(limit) = &self.version_limit
                && version.as_str() > limit.as_str()
            {
                continue;
            }
            files.push(MigrationFile {
                name,
                version,
                description,
            });
        }
        files.sort_by(|a, b| a.version.cmp(&b.version).then(a.name.cmp(&b.name)));
        Ok(files)
    }

    pub fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.path.join(name))?)
    }

    pub fn read_file_utf8(&self, name: &str) -> Result<String> {
        let bytes = self.read_file(name)?;
        String::from_utf8(bytes).map_err(|_| {
            UserError::FileName {
                name: name.to_string(),
                reason: "migration files must be valid UTF-8".to_string(),
            }
            .into()
        })
    }

    pub fn write_file(&self, name: &str, content: &[u8]) -> Result<()> {
        fs::write(self.path.join(name), content)?;
        Ok(())
    }

    pub(crate) fn read_sum_file(&self) -> Result<Option<String>> {
        match fs::read_to_string(self.path.join(HASH_FILE_NAME)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomic write: the sum file never holds a half-written state.
    pub(crate) fn write_sum_file(&self, content: &str) -> Result<()> {
        let tmp = self.path.join(format!("{HASH_FILE_NAME}.tmp"));
        fs::write(&tmp, content)?;
        fs::rename(&tmp, self.path.join(HASH_FILE_NAME))?;
        Ok(())
    }

    /// Cross-process lock for directory mutations, keyed by the directory
    /// itself: the filesystem analogue of the target driver's advisory
    /// lock.
    pub fn lock(&self) -> Result<DirLock> {
        let path = self.path.join(LOCK_FILE_NAME);
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(_) => Ok(DirLock { path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(crate::Error::LockTimeout {
                    name: self.display_path(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Held while a process mutates the directory. Removing the marker on drop
/// releases the lock even on early error returns.
#[derive(Debug)]
pub struct DirLock {
    path: PathBuf,
}

impl Drop for DirLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
