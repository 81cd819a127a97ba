//! Log resources read straight from a local datasites mirror.
//!
//! `/datasites/ds1/fedreduce/...` resolves to `{root}/ds1/fedreduce/...`.

use std::future::Future;
use std::path::{Component, Path, PathBuf};

use fedtail_engine::{FetchError, LogSource};

#[derive(Debug, Clone)]
pub struct DirLogSource {
    root: PathBuf,
}

impl DirLogSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a resource path onto the root. Rejects anything that would escape it.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = path.trim_start_matches('/');
        let relative = relative.strip_prefix("datasites/").unwrap_or(relative);
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl LogSource for DirLogSource {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<String, FetchError>> + Send {
        let resolved = self.resolve(path);
        async move {
            let Some(file) = resolved else {
                return Err(FetchError::Status(400));
            };
            match tokio::fs::read_to_string(&file).await {
                Ok(body) => Ok(body),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::Status(404)),
                Err(e) => Err(FetchError::Transport(format!("{}: {e}", file.display()))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn reads_log_under_root() {
        let root = tempfile::tempdir().expect("test");
        let log_dir = root.path().join("ds1/fedreduce/running/carol");
        fs::create_dir_all(&log_dir).expect("test");
        fs::write(log_dir.join("alpha.yaml.log"), "line\n").expect("test");

        let source = DirLogSource::new(root.path());
        let body = source
            .fetch("/datasites/ds1/fedreduce/running/carol/alpha.yaml.log")
            .await
            .expect("body");
        assert_eq!(body, "line\n");
    }

    #[tokio::test]
    async fn missing_file_is_404() {
        let root = tempfile::tempdir().expect("test");
        let source = DirLogSource::new(root.path());
        assert_eq!(
            source.fetch("/datasites/ds9/fedreduce/running/x/y.yaml.log").await,
            Err(FetchError::Status(404))
        );
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let root = tempfile::tempdir().expect("test");
        let source = DirLogSource::new(root.path());
        assert_eq!(
            source.fetch("/datasites/../../etc/passwd").await,
            Err(FetchError::Status(400))
        );
    }
}
