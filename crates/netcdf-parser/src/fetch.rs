//! Download of remote NetCDF inputs.

use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::{NetCdfError, NetCdfResult};

/// File name used for a downloaded URL, unique within `index`.
fn local_name(url: &str, index: usize) -> String {
    let tail = url
        .split(['?', '#'])
        .next()
        .and_then(|u| u.rsplit('/').next())
        .filter(|s| !s.is_empty())
        .unwrap_or("remote.nc");
    format!("{:03}_{}", index, tail)
}

/// Download `url` into `dir`, returning the local path.
///
/// HTTP 404 is reported as `NotFound`; other failures as `Remote`.
pub async fn fetch_remote(
    client: &reqwest::Client,
    url: &str,
    dir: &Path,
    index: usize,
) -> NetCdfResult<PathBuf> {
    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| NetCdfError::Remote(format!("{}: {}", url, e)))?;

    match response.status() {
        StatusCode::NOT_FOUND => {
            return Err(NetCdfError::NotFound(format!("remote input {} (HTTP 404)", url)));
        }
        status if !status.is_success() => {
            return Err(NetCdfError::Remote(format!("{}: HTTP {}", url, status)));
        }
        _ => {}
    }

    let path = dir.join(local_name(url, index));
    let mut file = tokio::fs::File::create(&path).await?;
    let mut bytes = 0usize;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| NetCdfError::Remote(format!("{}: {}", url, e)))?
    {
        bytes += chunk.len();
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    info!(url = %url, path = %path.display(), bytes = bytes, "Downloaded remote input");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name() {
        assert_eq!(
            local_name("https://example.org/data/air.2m.gauss.1948.nc?x=1", 2),
            "002_air.2m.gauss.1948.nc"
        );
        assert_eq!(local_name("https://example.org/", 0), "000_remote.nc");
    }
}
