use base64::{Engine as _, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{Result, StateError};

use super::dir::LocalDir;

/// Name of the integrity file kept next to the migration files.
pub const HASH_FILE_NAME: &str = "atlas.sum";

const HASH_PREFIX: &str = "h1:";

/// The parsed integrity file: one digest per migration file plus a
/// cumulative head hash over all entries. Any byte change in any file
/// changes the head.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HashFile {
    entries: Vec<(String, String)>,
}

impl HashFile {
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn file_hash(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, h)| h.as_str())
    }

    /// Cumulative head hash: each entry is folded into the digest of
    /// everything before it.
    pub fn sum(&self) -> String {
        let mut head = Vec::new();
        for (name, hash) in &self.entries {
            let mut hasher = Sha256::new();
            hasher.update(&head);
            hasher.update(name.as_bytes());
            hasher.update(hash.as_bytes());
            head = hasher.finalize().to_vec();
        }
        format!("{HASH_PREFIX}{}", STANDARD.encode(head))
    }

    /// Serialize in the on-disk format: `h1:<head>` then one
    /// `<filename> h1:<digest>` line per file.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.sum());
        out.push('\n');
        for (name, hash) in &self.entries {
            out.push_str(&format!("{name} {hash}\n"));
        }
        out
    }

    /// Parse the on-disk format and verify the recorded head against the
    /// entries it covers.
    pub fn parse(path: &str, content: &str) -> Result<Self> {
        let mut lines = content.lines();
        let head = lines
            .next()
            .ok_or_else(|| StateError::ChecksumMismatch {
                path: path.to_string(),
            })?
            .trim()
            .to_string();

        let mut entries = Vec::new();
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((name, hash)) = line.rsplit_once(' ') else {
                return Err(StateError::ChecksumMismatch {
                    path: path.to_string(),
                }
                .into());
            };
            entries.push((name.trim().to_string(), hash.trim().to_string()));
        }

        let parsed = Self { entries };
        if parsed.sum() != head {
            return Err(StateError::ChecksumMismatch {
                path: path.to_string(),
            }
            .into());
        }
        Ok(parsed)
    }
}

/// Digest of one migration file's content.
pub fn hash_content(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    format!("{HASH_PREFIX}{}", STANDARD.encode(digest))
}

/// Compute the integrity file for the directory's current contents.
pub fn hash_dir(dir: &LocalDir) -> Result<HashFile> {
    let mut entries = Vec::new();
    for file in dir.files()? {
        let content = dir.read_file(&file.name)?;
        entries.push((file.name, hash_content(&content)));
    }
    Ok(HashFile { entries })
}

/// Verify the stored sum file against the directory contents. Operations
/// that read the directory call this first unless the caller is explicitly
/// re-generating hashes.
pub fn validate_dir(dir: &LocalDir) -> Result<HashFile> {
    let path = dir.display_path();
    let stored = dir.read_sum_file()?.ok_or_else(|| {
        StateError::ChecksumMismatch { path: path.clone() }
    })?;
    let stored = HashFile::parse(&path, &stored)?;
    let computed = hash_dir(dir)?;
    if stored != computed {
        return Err(StateError::ChecksumMismatch { path }.into());
    }
    debug!(dir = %path, files = computed.entries.len(), "directory checksum verified");
    Ok(computed)
}

/// Re-generate and atomically write the sum file.
pub fn write_sum(dir: &LocalDir) -> Result<HashFile> {
    let hashes = hash_dir(dir)?;
    dir.write_sum_file(&hashes.encode())?;
    Ok(hashes)
}
