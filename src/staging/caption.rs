//! Caption lookup in a working directory

use crate::utils::first_file_with_extension;
use std::path::Path;
use tracing::warn;

/// Caption reported when the fetcher saved no caption file
pub const DEFAULT_CAPTION: &str = "No caption available.";

/// Read the caption the fetcher saved next to the video
///
/// Takes the first `.txt` file, trims it and folds line breaks into spaces.
/// A missing or unreadable caption yields [`DEFAULT_CAPTION`]; invalid UTF-8 is
/// replaced rather than rejected.
pub async fn read_caption(working_dir: &Path) -> String {
    let path = match first_file_with_extension(working_dir, &["txt"]).await {
        Ok(Some(path)) => path,
        Ok(None) => return DEFAULT_CAPTION.to_string(),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(?working_dir, error = %e, "failed to list working directory for caption");
            }
            return DEFAULT_CAPTION.to_string();
        }
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes)
            .trim()
            .replace("\r\n", " ")
            .replace('\n', " "),
        Err(e) => {
            warn!(?path, error = %e, "failed to read caption");
            DEFAULT_CAPTION.to_string()
        }
    }
}
