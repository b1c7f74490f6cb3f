use crate::error::{Error, ErrorKind, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use exn::ResultExt;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const ROOT: &str = "root";

/// Opaque, deterministic identifier of a node in the virtual folder tree.
///
/// Keys are the URL-safe (unpadded) base64 encoding of the raw bytes of the
/// folder's absolute path, so they are safe to use in file names and URLs, and
/// decode back into the exact path they were created from. The synthetic root
/// uses the literal key `root`: it never decodes into an absolute path, so it
/// cannot collide with the key of a real folder.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FolderKey(String);

impl FolderKey {
    /// Key of the synthetic root that every configured root hangs off.
    pub fn root() -> Self {
        Self(ROOT.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT
    }

    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self(URL_SAFE_NO_PAD.encode(path.as_ref().as_os_str().as_encoded_bytes()))
    }

    /// Decode the key back into the absolute path it was derived from.
    ///
    /// Fails for the root key, and for anything that was not produced by
    /// [`from_path`](Self::from_path) on an absolute path.
    pub fn to_path(&self) -> Result<PathBuf> {
        if self.is_root() {
            exn::bail!(ErrorKind::InvalidKey(self.0.clone()));
        }
        let bytes = URL_SAFE_NO_PAD.decode(&self.0).or_raise(|| ErrorKind::InvalidKey(self.0.clone()))?;
        let path = bytes_to_path(bytes).or_raise(|| ErrorKind::InvalidKey(self.0.clone()))?;
        if !path.is_absolute() {
            exn::bail!(ErrorKind::InvalidKey(self.0.clone()));
        }
        Ok(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(unix)]
fn bytes_to_path(bytes: Vec<u8>) -> std::result::Result<PathBuf, std::convert::Infallible> {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;
    Ok(PathBuf::from(OsString::from_vec(bytes)))
}

#[cfg(not(unix))]
fn bytes_to_path(bytes: Vec<u8>) -> std::result::Result<PathBuf, std::string::FromUtf8Error> {
    String::from_utf8(bytes).map(PathBuf::from)
}

impl Display for FolderKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FolderKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Parsing validates the key: the root key, or a key that decodes to an
/// absolute path.
impl FromStr for FolderKey {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key = Self(s.to_string());
        if !key.is_root() {
            key.to_path()?;
        }
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/srv/output")]
    #[case("/srv/output/nested dir/with spaces")]
    #[case("/srv/ümlaut/日本")]
    fn test_round_trip(#[case] path: &str) {
        let key = FolderKey::from_path(path);
        assert_eq!(key.to_path().unwrap(), Path::new(path));
    }

    #[test]
    fn test_key_is_filesystem_safe() {
        let key = FolderKey::from_path("/a/b/c?d*e");
        assert!(key.as_str().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_distinct_paths_have_distinct_keys() {
        assert_ne!(FolderKey::from_path("/a/b"), FolderKey::from_path("/a/b/"));
        assert_ne!(FolderKey::from_path("/a/bc"), FolderKey::from_path("/a/b"));
        assert_eq!(FolderKey::from_path("/a/b"), FolderKey::from_path("/a/b"));
    }

    #[test]
    fn test_root_key() {
        let root = FolderKey::root();
        assert!(root.is_root());
        assert!(root.to_path().is_err());
        assert_eq!("root".parse::<FolderKey>().unwrap(), root);
        assert!(!FolderKey::from_path("/root").is_root());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("not base64!".parse::<FolderKey>().is_err());
        // Valid base64, but of a relative path.
        let relative = FolderKey::from_path("relative/path");
        assert!(relative.as_str().parse::<FolderKey>().is_err());
    }
}
