use std::{sync::Arc, thread::JoinHandle};

use crossbeam::channel::{Receiver, Sender};
use log::{debug, error, warn};
use parking_lot::Mutex;

use crate::error::{RenderError, Result};

use super::{CancelToken, Frame, ParallelRenderer, Scene};

/// Messages to the render thread
///
/// Messages queue up, the thread only takes on the newest render request and
/// reports older ones as skipped.
pub enum RendererMessage {
    /// Render a frame of `generation`
    Render {
        scene: Box<Scene>,
        cancel: CancelToken,
        generation: u64,
    },
    /// Shut down, thread will get ready to be joined
    ShutDown,
}

/// Report of a finished render request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderDone {
    pub generation: u64,
    /// `false` if the request was canceled, skipped or failed
    pub completed: bool,
}

/// Newest completed frame with its generation
type FrameSlot = Arc<Mutex<Option<(u64, Arc<Frame>)>>>;

/// Communicating with the background render thread
///
/// Each [`RendererFront::submit`] gets a new generation and cancels the previous
/// request. A frame is handed out only if it belongs to the newest generation,
/// so results of stale requests never show up.
pub struct RendererFront {
    handle: Option<JoinHandle<()>>,
    sender: Sender<RendererMessage>,
    done: Receiver<RenderDone>,
    latest: FrameSlot,
    /// Generation of the newest request
    generation: u64,
    /// Newest generation reported done
    finished: u64,
    current: Option<CancelToken>,
}

impl RendererFront {
    /// Spawn the render thread, it waits for messages
    pub fn new() -> Result<RendererFront> {
        let (sender, receiver) = crossbeam::channel::unbounded(); // main -> renderer
        let (done_sender, done) = crossbeam::channel::unbounded(); // renderer -> main
        let latest: FrameSlot = Arc::new(Mutex::new(None));

        let slot = latest.clone();
        let handle = std::thread::Builder::new()
            .name("RenderFront".into())
            .spawn(move || render_loop(receiver, done_sender, slot))
            .map_err(|e| {
                error!("Cannot spawn render thread: {e}");
                RenderError::RendererUnavailable
            })?;

        Ok(RendererFront {
            handle: Some(handle),
            sender,
            done,
            latest,
            generation: 0,
            finished: 0,
            current: None,
        })
    }

    /// Queue `scene` for rendering, cancelling the previous request
    ///
    /// Returns generation of the new request.
    pub fn submit(&mut self, scene: Scene) -> Result<u64> {
        scene.validate()?;
        self.cancel();

        let generation = self.generation + 1;
        let cancel = CancelToken::new();
        let msg = RendererMessage::Render {
            scene: Box::new(scene),
            cancel: cancel.clone(),
            generation,
        };
        self.sender
            .send(msg)
            .map_err(|_| RenderError::RendererUnavailable)?;

        debug!("Submitted render {generation}");
        self.generation = generation;
        self.current = Some(cancel);
        Ok(generation)
    }

    /// Cancel the newest request, if any is running
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.current.take() {
            cancel.cancel();
        }
    }

    /// Generation of the newest request
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The newest request is not done yet
    pub fn is_busy(&mut self) -> bool {
        self.drain_done();
        self.finished < self.generation
    }

    /// Frame of the newest request, if it is done, does not block
    pub fn try_take(&mut self) -> Option<Arc<Frame>> {
        self.drain_done();
        if self.finished < self.generation {
            return None;
        }
        self.newest_frame()
    }

    /// Block until the newest request is done
    ///
    /// Returns `None` if it was canceled.
    pub fn wait(&mut self) -> Result<Option<Arc<Frame>>> {
        while self.finished < self.generation {
            let done = self
                .done
                .recv()
                .map_err(|_| RenderError::RendererUnavailable)?;
            self.record(done);
        }
        Ok(self.newest_frame())
    }

    fn drain_done(&mut self) {
        while let Ok(done) = self.done.try_recv() {
            self.record(done);
        }
    }

    fn record(&mut self, done: RenderDone) {
        debug!(
            "Render {} {}",
            done.generation,
            if done.completed { "done" } else { "dropped" }
        );
        self.finished = u64::max(self.finished, done.generation);
        if done.generation == self.generation {
            self.current = None;
        }
    }

    fn newest_frame(&self) -> Option<Arc<Frame>> {
        match &*self.latest.lock() {
            Some((generation, frame)) if *generation == self.generation => Some(frame.clone()),
            _ => None,
        }
    }
}

impl Drop for RendererFront {
    fn drop(&mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            // thread may be gone already
            let _ = self.sender.send(RendererMessage::ShutDown);
            if handle.join().is_err() {
                error!("Render thread panicked");
            }
        }
    }
}

fn render_loop(
    receiver: Receiver<RendererMessage>,
    done: Sender<RenderDone>,
    latest: FrameSlot,
) {
    let report = |generation, completed| {
        // front dropped, nobody listens
        let _ = done.send(RenderDone {
            generation,
            completed,
        });
    };

    while let Ok(mut msg) = receiver.recv() {
        // skip to the newest message
        while let Ok(next) = receiver.try_recv() {
            if let RendererMessage::Render { generation, .. } = msg {
                debug!("Render {generation} superseded");
                report(generation, false);
            }
            msg = next;
        }

        let (scene, cancel, generation) = match msg {
            RendererMessage::ShutDown => break,
            RendererMessage::Render {
                scene,
                cancel,
                generation,
            } => (scene, cancel, generation),
        };

        if cancel.is_canceled() {
            report(generation, false);
            continue;
        }

        let frame = match ParallelRenderer::new(&scene) {
            Ok(renderer) => renderer.render(&cancel),
            Err(e) => {
                warn!("Render {generation} failed: {e}");
                None
            }
        };

        let completed = frame.is_some();
        if let Some(frame) = frame {
            *latest.lock() = Some((generation, Arc::new(frame)));
        }
        report(generation, completed);
    }

    debug!("Render thread shutting down");
}
