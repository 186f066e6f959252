use std::path::{Path, PathBuf};
use futures::StreamExt;
use reqwest::{Client, Response};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::info;
use eco_core::{GeneratedMedia, DOWNLOAD_FILE_NAME};
use crate::error::AppError;

/// Saves the generated video as `dir/output_final.mp4`.
///
/// The body is streamed into a `.part` file that only replaces the target once
/// the transfer is complete.
pub async fn download_video(
    client: &Client,
    base_url: &str,
    media: &GeneratedMedia,
    dir: &Path,
) -> Result<PathBuf, AppError> {
    let url = media.video.resolve(base_url);
    let target = dir.join(DOWNLOAD_FILE_NAME);
    let partial = dir.join(format!("{DOWNLOAD_FILE_NAME}.part"));

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| AppError::Download(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Download(format!("{url}: HTTP {status}")));
    }

    fs::create_dir_all(dir).await?;
    let written = match write_partial(response, &partial, &target).await {
        Ok(written) => written,
        Err(e) => {
            let _ = fs::remove_file(&partial).await;
            return Err(e);
        }
    };

    info!(bytes = written, path = %target.display(), "video saved");
    Ok(target)
}

/// Streams the body into `partial`, then moves it over `target`.
async fn write_partial(response: Response, partial: &Path, target: &Path) -> Result<usize, AppError> {
    let mut file = File::create(partial).await?;
    let mut body = response.bytes_stream();
    let mut written = 0usize;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| AppError::Download(e.to_string()))?;
        file.write_all(&chunk).await?;
        written += chunk.len();
    }

    file.flush().await?;
    drop(file);
    fs::rename(partial, target).await?;
    Ok(written)
}
