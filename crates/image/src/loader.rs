//! Asynchronous texture loading.
//!
//! Loaders take requests tagged with a generation number and hand back
//! completions whenever the generator polls. The generator drops any
//! completion whose generation is no longer current.

use backdrop_core::{RenderError, Texture};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

/// One finished load.
#[derive(Debug)]
pub struct LoadedTexture {
    pub generation: u64,
    pub source: String,
    pub result: Result<Texture, RenderError>,
}

pub trait TextureLoader {
    /// Starts loading `source`. Completion arrives through [`poll`](Self::poll).
    fn request(&mut self, generation: u64, source: &str);

    /// Returns every load finished since the last call, without blocking.
    fn poll(&mut self) -> Vec<LoadedTexture>;
}

struct LoadRequest {
    generation: u64,
    source: String,
}

/// Decodes PNG and JPEG files with the `image` crate on a worker thread.
///
/// The worker is spawned by the first request and exits once the loader is
/// dropped.
#[derive(Default)]
pub struct FileLoader {
    worker: Option<Worker>,
    spawn_failed: bool,
    /// Completions that never reached a worker.
    failed: Vec<LoadedTexture>,
}

struct Worker {
    requests: Sender<LoadRequest>,
    results: Receiver<LoadedTexture>,
}

impl Worker {
    fn spawn() -> std::io::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<LoadRequest>();
        let (result_tx, result_rx) = mpsc::channel();
        thread::Builder::new()
            .name("texture_loader".to_string())
            .spawn(move || run_worker(request_rx, result_tx))?;
        Ok(Self {
            requests: request_tx,
            results: result_rx,
        })
    }
}

impl FileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a worker thread has been started.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    fn worker(&mut self) -> Option<&Worker> {
        if self.worker.is_none() && !self.spawn_failed {
            match Worker::spawn() {
                Ok(worker) => self.worker = Some(worker),
                Err(e) => {
                    tracing::error!(error = %e, "failed to spawn texture loader thread");
                    self.spawn_failed = true;
                }
            }
        }
        self.worker.as_ref()
    }
}

fn run_worker(requests: Receiver<LoadRequest>, results: Sender<LoadedTexture>) {
    for request in requests {
        let result = decode_file(&request.source);
        let loaded = LoadedTexture {
            generation: request.generation,
            source: request.source,
            result,
        };
        if results.send(loaded).is_err() {
            break;
        }
    }
}

/// Reads and decodes one image file into an RGBA8 texture.
pub fn decode_file(source: &str) -> Result<Texture, RenderError> {
    let failed = |reason: String| RenderError::TextureLoadFailed {
        source_name: source.to_string(),
        reason,
    };
    let img = image::open(Path::new(source)).map_err(|e| failed(e.to_string()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Texture::from_rgba8(width, height, rgba.into_raw()).map_err(|e| failed(e.to_string()))
}

impl TextureLoader for FileLoader {
    fn request(&mut self, generation: u64, source: &str) {
        let request = LoadRequest {
            generation,
            source: source.to_string(),
        };
        let sent = match self.worker() {
            Some(worker) => worker.requests.send(request).is_ok(),
            None => false,
        };
        if !sent {
            self.failed.push(LoadedTexture {
                generation,
                source: source.to_string(),
                result: Err(RenderError::TextureLoadFailed {
                    source_name: source.to_string(),
                    reason: "texture loader is not running".to_string(),
                }),
            });
        }
    }

    fn poll(&mut self) -> Vec<LoadedTexture> {
        let mut out = std::mem::take(&mut self.failed);
        let Some(worker) = &self.worker else {
            return out;
        };
        loop {
            match worker.results.try_recv() {
                Ok(loaded) => out.push(loaded),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }
}

#[derive(Debug, Default)]
struct ManualLoaderState {
    requests: Vec<(u64, String)>,
    ready: Vec<LoadedTexture>,
}

/// Loader whose completions are supplied by hand.
///
/// Clones share state, so a test keeps one clone to complete requests while
/// the generator owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualLoader {
    state: Rc<RefCell<ManualLoaderState>>,
}

impl ManualLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<(u64, String)> {
        self.state.borrow().requests.clone()
    }

    /// Queues a completion for the next poll.
    pub fn complete(&self, generation: u64, source: &str, result: Result<Texture, RenderError>) {
        self.state.borrow_mut().ready.push(LoadedTexture {
            generation,
            source: source.to_string(),
            result,
        });
    }
}

impl TextureLoader for ManualLoader {
    fn request(&mut self, generation: u64, source: &str) {
        self.state
            .borrow_mut()
            .requests
            .push((generation, source.to_string()));
    }

    fn poll(&mut self) -> Vec<LoadedTexture> {
        std::mem::take(&mut self.state.borrow_mut().ready)
    }
}
