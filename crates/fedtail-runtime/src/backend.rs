//! Runtime choice between HTTP and local-directory log resources.

use std::future::Future;
use std::path::PathBuf;

use fedtail_engine::{FetchError, LogSource};

use crate::dir_source::DirLogSource;
use crate::http::HttpLogSource;

#[derive(Debug, Clone)]
pub enum LogBackend {
    Http(HttpLogSource),
    Dir(DirLogSource),
}

impl LogBackend {
    /// A datasites root wins over the HTTP base URL.
    pub fn select(client: reqwest::Client, base_url: &str, datasites_root: Option<PathBuf>) -> Self {
        match datasites_root {
            Some(root) => {
                tracing::info!(root = %root.display(), "reading logs from local datasites");
                Self::Dir(DirLogSource::new(root))
            }
            None => Self::Http(HttpLogSource::new(client, base_url)),
        }
    }
}

impl LogSource for LogBackend {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<String, FetchError>> + Send {
        async move {
            match self {
                Self::Http(source) => source.fetch(path).await,
                Self::Dir(source) => source.fetch(path).await,
            }
        }
    }
}
