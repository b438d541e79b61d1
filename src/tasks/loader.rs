use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use image::RgbaImage;
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio::task::{Id, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::FrameLoadError;
use crate::events::FrameLoaded;
use crate::frames::FrameSource;

/// Decodes a frame file to RGBA8, sniffing the format from its content.
pub fn decode_frame(path: &Path) -> Result<RgbaImage, FrameLoadError> {
    let io_err = |source| FrameLoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let image = image::ImageReader::open(path)
        .map_err(io_err)?
        .with_guessed_format()
        .map_err(io_err)?
        .decode()
        .map_err(|source| FrameLoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(image.to_rgba8())
}

type Decoded = (usize, PathBuf, Result<RgbaImage, FrameLoadError>);

/// Turns one joined decode into the event for its frame. Tasks that panicked
/// or were aborted are reported as failed through `in_flight`.
fn report(
    joined: Result<(Id, Decoded), JoinError>,
    in_flight: &mut HashMap<Id, usize>,
) -> Option<FrameLoaded> {
    match joined {
        Ok((id, (index, path, Ok(image)))) => {
            in_flight.remove(&id);
            debug!(
                index,
                path = %path.display(),
                width = image.width(),
                height = image.height(),
                "frame decoded"
            );
            Some(FrameLoaded::decoded(index, image))
        }
        Ok((id, (index, path, Err(err)))) => {
            in_flight.remove(&id);
            warn!(
                index,
                path = %path.display(),
                error = ?anyhow::Error::from(err),
                "frame failed to load; leaving a gap"
            );
            Some(FrameLoaded::failed(index))
        }
        Err(err) => {
            let Some(index) = in_flight.remove(&err.id()) else {
                error!(error = %err, "unknown frame loader task failed");
                return None;
            };
            warn!(index, error = %err, "frame loader task did not complete; leaving a gap");
            Some(FrameLoaded::failed(index))
        }
    }
}

/// Decodes every source with at most `max_in_flight` decodes running, and
/// reports exactly one `FrameLoaded` per frame. Failures are not retried.
pub async fn run(
    sources: Vec<FrameSource>,
    to_viewer: Sender<FrameLoaded>,
    cancel: CancellationToken,
    max_in_flight: usize,
) -> Result<()> {
    let total = sources.len();
    let max_in_flight = max_in_flight.max(1);
    let mut queue = sources.into_iter();
    let mut tasks: JoinSet<Decoded> = JoinSet::new();
    let mut in_flight: HashMap<Id, usize> = HashMap::new();
    let mut reported = 0usize;
    let mut failed = 0usize;

    info!(total, max_in_flight, "frame loader started");
    loop {
        while tasks.len() < max_in_flight {
            let Some(FrameSource { index, path }) = queue.next() else {
                break;
            };
            let handle = tasks.spawn(async move {
                let p = path.clone();
                let res = match tokio::task::spawn_blocking(move || decode_frame(&p)).await {
                    Ok(res) => res,
                    Err(source) => Err(FrameLoadError::Join { index, source }),
                };
                (index, path, res)
            });
            in_flight.insert(handle.id(), index);
        }
        if tasks.is_empty() {
            break;
        }

        select! {
            _ = cancel.cancelled() => {
                debug!(reported, total, "frame loader cancelled");
                tasks.abort_all();
                break;
            }

            Some(joined) = tasks.join_next_with_id() => {
                let Some(event) = report(joined, &mut in_flight) else {
                    continue;
                };
                if !event.is_decoded() {
                    failed += 1;
                }
                reported += 1;
                if to_viewer.send(event).await.is_err() {
                    debug!("viewer channel closed; stopping frame loader");
                    tasks.abort_all();
                    break;
                }
            }
        }
    }

    info!(reported, failed, total, "frame loader finished");
    Ok(())
}
