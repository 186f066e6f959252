use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::Context;
use eco_core::{Stage, WorkflowController, WorkflowPolicy};
use crate::backend::{download_video, BackendConfig, HttpBackend};
use crate::capture::FileCapture;

/// Runs the full-auto workflow on an image file without a window, printing
/// each stage, and saves the video. Returns where the video was written.
pub async fn run(config: BackendConfig, image: &Path) -> anyhow::Result<PathBuf> {
    let backend = Arc::new(HttpBackend::new(config));
    let capture = Arc::new(FileCapture::default());
    capture.select(image.to_path_buf());

    let controller = WorkflowController::new(backend.clone(), capture, WorkflowPolicy::full_auto());

    let mut updates = controller.subscribe();
    let progress = tokio::spawn(async move {
        let mut last = Stage::Idle;
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            if let Some(message) = snapshot.busy_message() {
                println!("… {message}");
            }
            if snapshot.stage == last {
                continue;
            }
            last = snapshot.stage;
            println!("{} {}", last.icon(), last.label());

            if let (Stage::Detected, Some(detection)) = (last, &snapshot.detection) {
                println!("   {} ({})", detection.display_label(), detection.confidence_percent());
            }
        }
    });

    let outcome = controller.capture_and_advance().await;
    let snapshot = controller.snapshot();
    // Dropping the controller closes the update channel and ends the printer.
    drop(controller);
    let _ = progress.await;

    outcome.with_context(|| format!("could not turn {} into a video", image.display()))?;
    let media = snapshot.media.context("workflow finished without a video")?;

    for (index, step) in media.steps.iter().enumerate() {
        println!("   {}. {step}", index + 1);
    }

    let config = backend.config();
    let path = download_video(backend.client(), &config.base_url, &media, &config.download_dir).await?;
    println!("💾 Saved {}", path.display());

    Ok(path)
}
