//! Frame assets — where each frame lives, and fetching it off the UI thread.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{Context, Result};
use image::RgbaImage;

/// Maps a frame index to the location of its asset.
pub trait FrameResolver {
    fn resolve(&self, base_asset_path: &str, frame_index: usize) -> String;
}

/// `{base}/snap_001.png` for frame 0, `{base}/snap_072.png` for frame 71.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotResolver;

impl FrameResolver for SnapshotResolver {
    fn resolve(&self, base_asset_path: &str, frame_index: usize) -> String {
        let base = base_asset_path.trim_end_matches('/');
        format!("{base}/snap_{:03}.png", frame_index + 1)
    }
}

pub struct FetchResult {
    pub index: usize,
    pub image: Result<RgbaImage>,
}

const WORKERS: usize = 4;

/// A small pool of threads that read and decode frames. Completions are
/// collected with [`FrameFetcher::drain`]; in-flight fetches that finish
/// after the fetcher is dropped are discarded.
pub struct FrameFetcher {
    jobs: Sender<(usize, String)>,
    results: Receiver<FetchResult>,
    base_path: String,
    resolver: Box<dyn FrameResolver>,
}

impl FrameFetcher {
    pub fn new(base_path: impl Into<String>, resolver: Box<dyn FrameResolver>) -> Self {
        let (jobs, job_rx) = mpsc::channel::<(usize, String)>();
        let (result_tx, results) = mpsc::channel();
        let job_rx = Arc::new(Mutex::new(job_rx));

        for _ in 0..WORKERS {
            let job_rx = Arc::clone(&job_rx);
            let result_tx = result_tx.clone();
            thread::spawn(move || {
                loop {
                    let job = match job_rx.lock() {
                        Ok(rx) => rx.recv(),
                        Err(_) => break,
                    };
                    let Ok((index, location)) = job else { break };
                    let image = load_frame(&location);
                    if result_tx.send(FetchResult { index, image }).is_err() {
                        break;
                    }
                }
            });
        }

        FrameFetcher {
            jobs,
            results,
            base_path: base_path.into(),
            resolver,
        }
    }

    pub fn location(&self, index: usize) -> String {
        self.resolver.resolve(&self.base_path, index)
    }

    pub fn request(&self, index: usize) {
        let location = self.location(index);
        log::debug!("fetching frame {index} from {location}");
        // Workers only stop once `jobs` is dropped, so this cannot fail while
        // the fetcher is alive.
        let _ = self.jobs.send((index, location));
    }

    /// All completions that have arrived since the last call.
    pub fn drain(&self) -> Vec<FetchResult> {
        self.results.try_iter().collect()
    }
}

pub fn load_frame(location: &str) -> Result<RgbaImage> {
    let image = image::open(location).with_context(|| format!("Failed to load {location}"))?;
    Ok(image.to_rgba8())
}
