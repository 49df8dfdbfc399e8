use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Plain-text token file. No expiry is tracked locally.
#[derive(Clone, Debug)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `None` when the file is missing or holds no token.
    pub fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(token.to_string()))
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)?;
        log::info!("Saved auth token to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        dir.push(format!("tasklens-token-{}-{}", std::process::id(), stamp));
        dir
    }

    #[test]
    fn missing_file_means_no_token() {
        let store = TokenStore::new(temp_dir().join("token"));
        assert_eq!(store.load().expect("load"), None);
    }

    #[test]
    fn save_creates_parent_dirs_and_round_trips() {
        let path = temp_dir().join("a").join("b").join("token");
        let store = TokenStore::new(&path);

        store.save("410c57262293e9d937ee5be75eb7b0128fd61b61").expect("save");

        assert!(path.exists());
        assert_eq!(
            store.load().expect("load").as_deref(),
            Some("410c57262293e9d937ee5be75eb7b0128fd61b61")
        );
    }

    #[test]
    fn save_overwrites_previous_token() {
        let store = TokenStore::new(temp_dir().join("token"));
        store.save("first").expect("save first");
        store.save("second").expect("save second");
        assert_eq!(store.load().expect("load").as_deref(), Some("second"));
    }

    #[test]
    fn blank_file_means_no_token() {
        let path = temp_dir().join("token");
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "\n").expect("write");
        assert_eq!(TokenStore::new(&path).load().expect("load"), None);
    }
}
