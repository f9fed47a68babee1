//! Credential store backed by an htpasswd-style file.
//!
//! The file holds one `username:hash` entry per line. Lines starting with `#`
//! are comments, blank lines are ignored and leading whitespace around each
//! field is trimmed. A single malformed line fails the whole load.
//!
//! ```text
//! # wiki users
//! alice:$2b$11$KjK1iG...
//! bob: $2y$11$3nQ0c...
//! ```
//!
//! The store is read once at startup and never modified while serving.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use tracing::debug;

use crate::error::CredentialError;

/// Field separator between username and hash.
const SEPARATOR: char = ':';

/// Prefix marking a comment line.
const COMMENT: char = '#';

/// Default bcrypt cost for newly added entries.
pub const DEFAULT_BCRYPT_COST: u32 = 11;

/// Immutable mapping from username to password hash.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    entries: HashMap<String, String>,
}

impl CredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse the credentials file at `path`.
    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        let contents = fs::read_to_string(path).map_err(|source| CredentialError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::parse(&contents)?;
        debug!(path = %path.display(), entries = store.len(), "Loaded credentials");
        Ok(store)
    }

    /// Like [`load`](Self::load), but a missing file yields `Ok(None)`.
    pub fn load_if_present(path: &Path) -> Result<Option<Self>, CredentialError> {
        match Self::load(path) {
            Ok(store) => Ok(Some(store)),
            Err(CredentialError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Parse credentials from a string.
    ///
    /// For duplicate usernames the last entry wins. Every username must pass
    /// [`validate_username`], since it becomes a directory below the serving
    /// root.
    pub fn parse(contents: &str) -> Result<Self, CredentialError> {
        let mut entries = HashMap::new();

        for (index, raw) in contents.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with(COMMENT) {
                continue;
            }

            let (username, hash) = parse_line(line)
                .and_then(|(username, hash)| {
                    validate_username(username)
                        .map(|()| (username, hash))
                        .map_err(|e| e.to_string())
                })
                .map_err(|message| CredentialError::Parse {
                    line: index + 1,
                    message,
                })?;
            entries.insert(username.to_string(), hash.to_string());
        }

        Ok(Self { entries })
    }

    /// Stored hash for `username`, if any.
    pub fn hash_for(&self, username: &str) -> Option<&str> {
        self.entries.get(username).map(String::as_str)
    }

    /// All known usernames, in no particular order.
    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for CredentialStore {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn parse_line(line: &str) -> Result<(&str, &str), String> {
    let fields: Vec<&str> = line.split(SEPARATOR).map(str::trim_start).collect();

    match fields[..] {
        [username, hash] => {
            let username = username.trim_end();
            let hash = hash.trim_end();
            if username.is_empty() {
                return Err("empty username".to_string());
            }
            if hash.is_empty() {
                return Err(format!("empty password hash for {:?}", username));
            }
            Ok((username, hash))
        }
        [_] => Err(format!("missing '{}' separator", SEPARATOR)),
        _ => Err(format!(
            "expected 2 fields, found {} (is there a stray '{}'?)",
            fields.len(),
            SEPARATOR
        )),
    }
}

/// Check that `username` can be stored in the credentials file and used as
/// a directory name under the serving root.
pub fn validate_username(username: &str) -> Result<(), CredentialError> {
    let invalid = username.is_empty()
        || username.starts_with(COMMENT)
        || username.starts_with('.')
        || username
            .chars()
            .any(|c| c == SEPARATOR || c == '/' || c == '\\' || c.is_whitespace());

    if invalid {
        Err(CredentialError::InvalidUsername(username.to_string()))
    } else {
        Ok(())
    }
}

/// Hash `password` with bcrypt and append `username:hash` to the file at
/// `path`, creating it with owner-only permissions if needed.
pub fn append_entry(
    path: &Path,
    username: &str,
    password: &str,
    cost: u32,
) -> Result<(), CredentialError> {
    validate_username(username)?;

    let hash = bcrypt::hash(password, cost).map_err(|e| CredentialError::Hash(e.to_string()))?;

    let io_err = |source| CredentialError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut options = OpenOptions::new();
    options.append(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(io_err)?;
    writeln!(file, "{}{}{}", username, SEPARATOR, hash).map_err(io_err)?;

    Ok(())
}
