use offload_protocol::{canonical_params, TaskParams};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Deterministic identifier for one unit of analysis work.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive a key from the task name, parameters, and file set.
    ///
    /// Volatile parameter fields are dropped and the file list is sorted
    /// lexicographically before hashing, so equivalent but
    /// differently-ordered inputs produce the same key.
    pub fn generate(task_name: &str, params: &TaskParams, files: &[impl AsRef<Path>]) -> Self {
        let canonical = canonical_params(params);
        // BTreeMap ordering makes this serialization stable.
        let params_json =
            serde_json::to_string(&canonical).unwrap_or_else(|_| "{}".to_string());

        let mut sorted_files: Vec<String> = files
            .iter()
            .map(|f| f.as_ref().to_string_lossy().into_owned())
            .collect();
        sorted_files.sort();

        let mut hasher = Sha256::new();
        hasher.update(task_name.as_bytes());
        hasher.update(b"|");
        hasher.update(params_json.as_bytes());
        for file in &sorted_files {
            hasher.update(b"|");
            hasher.update(file.as_bytes());
        }

        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
