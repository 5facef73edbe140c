//! Simple file-backed [`CredentialStore`] so command-line tools keep a session across runs.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	credential::{CredentialStore, SessionCookie, StoreError, cookie::CookieJar},
};

/// Persists the cookie jar to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileCredentialStore {
	path: PathBuf,
	inner: Arc<RwLock<CookieJar>>,
}
impl FileCredentialStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing cookies.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let jar = CookieJar::from_cookies(Self::load_snapshot(&path)?);

		Ok(Self { path, inner: Arc::new(RwLock::new(jar)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Vec<SessionCookie>, StoreError> {
		if !path.exists() {
			return Ok(Vec::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(Vec::new());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create credential directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, jar: &CookieJar) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(&jar.cookies()).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize cookie jar: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl CredentialStore for FileCredentialStore {
	fn cookie_header(&self, url: &Url, now: OffsetDateTime) -> Option<String> {
		self.inner.read().cookie_header(url, now)
	}

	fn absorb(
		&self,
		url: &Url,
		set_cookies: &[String],
		now: OffsetDateTime,
	) -> Result<(), StoreError> {
		let mut guard = self.inner.write();

		if guard.absorb(url, set_cookies, now) {
			self.persist_locked(&guard)?;
		}

		Ok(())
	}

	fn clear(&self) -> Result<(), StoreError> {
		let mut guard = self.inner.write();

		if guard.clear() {
			self.persist_locked(&guard)?;
		}

		Ok(())
	}

	fn snapshot(&self) -> Vec<SessionCookie> {
		self.inner.read().cookies()
	}
}
