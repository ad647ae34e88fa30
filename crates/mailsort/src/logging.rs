//! Tracing setup: console plus a dated log file.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "mailsort=info,mailsort_core=info,mailsort_imap=warn";
const VERBOSE_FILTER: &str = "mailsort=debug,mailsort_core=debug,mailsort_imap=debug";

/// Returns `<dir>/mailsort_<YYYY-MM-DD>.log` for today.
pub fn log_file_path(dir: &Path) -> PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d");
    dir.join(format!("mailsort_{date}.log"))
}

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `verbose`. Without a `log_dir`, or when
/// the file cannot be opened, only the console layer is installed.
pub fn init(verbose: bool, log_dir: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER }.into());

    let (file, file_error) = match log_dir.map(open_log_file) {
        Some(Ok(file)) => (Some(file), None),
        Some(Err(err)) => (None, Some(err)),
        None => (None, None),
    };
    let file_layer = file.map(|file| fmt::layer().with_ansi(false).with_writer(Arc::new(file)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    if let Some(err) = file_error {
        warn!(error = %err, "could not open log file; logging to console only");
    }
}

fn open_log_file(dir: &Path) -> std::io::Result<fs::File> {
    fs::create_dir_all(dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path(dir))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_dated() {
        let path = log_file_path(Path::new("logs"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("mailsort_"));
        assert!(name.ends_with(".log"));
        // mailsort_YYYY-MM-DD.log
        assert_eq!(name.len(), "mailsort_".len() + 10 + ".log".len());
        assert_eq!(path.parent(), Some(Path::new("logs")));
    }
}
