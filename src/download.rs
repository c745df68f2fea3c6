//! File downloads from the test server

use std::io::Write;
use std::path::Path;

use futures_util::StreamExt;

use crate::common::{Error, Result};

/// Download the file at `url` into `dest`, streaming to disk
pub async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> Result<()> {
    tracing::debug!("Downloading '{}' to '{}'", url, dest.display());

    let response = client
        .get(url)
        .header("User-Agent", "fbtest-runner")
        .send()
        .await
        .map_err(|e| Error::download(url, e))?;

    if !response.status().is_success() {
        return Err(Error::download(
            url,
            format!("server returned status {}", response.status()),
        ));
    }

    if let Some(dir) = dest.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let mut file = std::fs::File::create(dest)?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::download(url, e))?;
        file.write_all(&chunk)?;
    }

    Ok(())
}

/// Fetch the test-bot config into the working directory and return its text
pub async fn fetch_config(client: &reqwest::Client, serverpath: &str) -> Result<String> {
    let url = format!(
        "{}{}",
        crate::config::normalize_serverpath(serverpath),
        crate::config::CONFIG_URL_PATH
    );
    download_file(client, &url, Path::new(crate::config::CONFIG_FILE)).await?;
    Ok(std::fs::read_to_string(crate::config::CONFIG_FILE)?)
}
