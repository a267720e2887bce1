use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::IndexError;

/// Read a JSON state file, or the default value if it does not exist.
pub(crate) fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, IndexError> {
    match fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(IndexError::io(path, e)),
    }
}

/// Write a JSON state file through a temporary sibling and a rename.
pub(crate) fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), IndexError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| IndexError::io(parent, e))?;
    }
    let tmp = path.with_extension("tmp");
    let bytes = serde_json::to_vec_pretty(value)?;
    fs::write(&tmp, bytes).map_err(|e| IndexError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| IndexError::io(path, e))
}
