//! Installation of a pre-shipped index archive.

use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use docsearch_core::Locale;

use crate::error::IndexError;

pub const PREBUILT_ARCHIVE: &str = "doc_index.zip";

/// Look for `<dir>/<ll_CC>/doc_index.zip`, then `<dir>/<ll>/doc_index.zip`,
/// then `<dir>/doc_index.zip`.
pub fn find_archive(prebuilt_dir: &Path, locale: &Locale) -> Option<PathBuf> {
	let mut candidates = Vec::with_capacity(3);
	if locale.country().is_some() {
		candidates.push(prebuilt_dir.join(locale.to_string()).join(PREBUILT_ARCHIVE));
	}
	candidates.push(prebuilt_dir.join(locale.language()).join(PREBUILT_ARCHIVE));
	candidates.push(prebuilt_dir.join(PREBUILT_ARCHIVE));
	candidates.into_iter().find(|p| p.is_file())
}

/// Replace the contents of `dest` with the archive's entries. Entries that
/// would land outside `dest` are skipped. Returns the number of files written.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<usize, IndexError> {
	let file = fs::File::open(archive).map_err(|e| IndexError::io(archive, e))?;
	let mut zip = zip::ZipArchive::new(BufReader::new(file))?;

	if dest.exists() {
		fs::remove_dir_all(dest).map_err(|e| IndexError::io(dest, e))?;
	}
	fs::create_dir_all(dest).map_err(|e| IndexError::io(dest, e))?;

	let mut count = 0;
	for i in 0..zip.len() {
		let mut entry = zip.by_index(i)?;
		let Some(rel) = entry.enclosed_name() else {
			tracing::warn!(entry = %entry.name(), "skipping archive entry outside the index directory");
			continue;
		};
		let target = dest.join(rel);
		if !target.starts_with(dest) { continue; }

		if entry.is_dir() {
			fs::create_dir_all(&target).map_err(|e| IndexError::io(&target, e))?;
		} else {
			if let Some(parent) = target.parent() {
				fs::create_dir_all(parent).map_err(|e| IndexError::io(parent, e))?;
			}
			let out = fs::File::create(&target).map_err(|e| IndexError::io(&target, e))?;
			let mut writer = BufWriter::new(out);
			std::io::copy(&mut entry, &mut writer).map_err(|e| IndexError::io(&target, e))?;
			count += 1;
		}
	}
	Ok(count)
}
