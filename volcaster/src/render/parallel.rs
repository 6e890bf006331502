use std::{
    cmp::min,
    ops::Range,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use log::{debug, info, warn};

use crate::{color::RGBA, error::Result};

use super::{sampler::RaySampler, Frame, Scene};

/// Shared flag to stop a render in progress
///
/// Checked by workers between tiles. A canceled render never publishes a frame.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Rectangle of pixels, `x` and `y` ranges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBox {
    pub x: Range<usize>,
    pub y: Range<usize>,
}

impl PixelBox {
    pub fn new(x: Range<usize>, y: Range<usize>) -> PixelBox {
        PixelBox { x, y }
    }

    pub fn width(&self) -> usize {
        self.x.len()
    }

    pub fn height(&self) -> usize {
        self.y.len()
    }
}

/// Number of tiles in a row and in a column
fn slice_into_tiles(resolution: (usize, usize), tile_side: usize) -> (usize, usize) {
    let tiles_x = (resolution.0 + tile_side - 1) / tile_side; // ceil
    let tiles_y = (resolution.1 + tile_side - 1) / tile_side; // ceil
    (tiles_x, tiles_y)
}

/// Split frame into tiles in row order, border tiles may be smaller
pub fn tiles(resolution: (usize, usize), tile_side: usize) -> Vec<PixelBox> {
    let (tiles_x, tiles_y) = slice_into_tiles(resolution, tile_side);

    let mut tiles = Vec::with_capacity(tiles_x * tiles_y);
    for y in 0..tiles_y {
        let low_y = y * tile_side;
        let high_y = min(low_y + tile_side, resolution.1);
        for x in 0..tiles_x {
            let low_x = x * tile_side;
            let high_x = min(low_x + tile_side, resolution.0);
            tiles.push(PixelBox::new(low_x..high_x, low_y..high_y));
        }
    }
    tiles
}

/// Multi-threaded frame renderer
///
/// Tiles are handed out to `worker_count` scoped threads over a channel, rendered
/// colors come back to the calling thread, which assembles the frame.
/// Every pixel depends only on the scene, so the frame is the same for any
/// number of workers.
pub struct ParallelRenderer<'a> {
    scene: &'a Scene,
    sampler: RaySampler<'a>,
}

impl<'a> ParallelRenderer<'a> {
    /// Fails if the scene cannot be rendered (empty transfer function, bad options)
    pub fn new(scene: &'a Scene) -> Result<ParallelRenderer<'a>> {
        scene.validate()?;
        Ok(ParallelRenderer {
            scene,
            sampler: RaySampler::new(scene),
        })
    }

    /// Render whole frame, `None` if canceled
    pub fn render(&self, cancel: &CancelToken) -> Option<Frame> {
        let options = &self.scene.options;
        let (width, height) = options.resolution;
        let tiles = tiles(options.resolution, options.tile_side);
        let workers = min(options.worker_count, tiles.len());

        debug!(
            "Rendering {width}x{height} in {} tiles, {workers} workers",
            tiles.len()
        );
        let start = Instant::now();

        let mut frame = Frame::new(width, height, options.background);

        if workers <= 1 {
            for tile in tiles {
                if cancel.is_canceled() {
                    break;
                }
                let colors = self.render_tile(&tile);
                frame.write_tile(tile.x, tile.y, &colors);
            }
        } else {
            self.render_parallel(&mut frame, tiles, workers, cancel);
        }

        if cancel.is_canceled() {
            debug!("Render canceled after {:?}", start.elapsed());
            return None;
        }

        info!("Frame {width}x{height} rendered in {:?}", start.elapsed());
        Some(frame)
    }

    fn render_parallel(
        &self,
        frame: &mut Frame,
        tiles: Vec<PixelBox>,
        workers: usize,
        cancel: &CancelToken,
    ) {
        let (tile_sender, tile_receiver) = crossbeam::channel::unbounded();
        for tile in tiles {
            // receiver is alive, cannot fail
            let _ = tile_sender.send(tile);
        }
        drop(tile_sender);

        let (result_sender, result_receiver) = crossbeam::channel::unbounded::<(PixelBox, Vec<RGBA>)>();

        // Scope assures threads are joined before the frame is returned
        let scope_result = crossbeam::scope(|s| {
            for id in 0..workers {
                let tiles = tile_receiver.clone();
                let results = result_sender.clone();
                let spawned = s.builder().name(format!("Ren{id}")).spawn(move |_| {
                    for tile in tiles.iter() {
                        if cancel.is_canceled() {
                            break;
                        }
                        let colors = self.render_tile(&tile);
                        if results.send((tile, colors)).is_err() {
                            break;
                        }
                    }
                });
                if let Err(e) = spawned {
                    warn!("Cannot spawn render worker {id}: {e}");
                }
            }
            drop(result_sender);

            for (tile, colors) in result_receiver.iter() {
                frame.write_tile(tile.x, tile.y, &colors);
            }
        });

        if let Err(panic) = scope_result {
            std::panic::resume_unwind(panic);
        }

        // tiles nobody picked up, only when workers failed to start
        for tile in tile_receiver.try_iter() {
            if cancel.is_canceled() {
                break;
            }
            let colors = self.render_tile(&tile);
            frame.write_tile(tile.x, tile.y, &colors);
        }
    }

    fn render_tile(&self, tile: &PixelBox) -> Vec<RGBA> {
        let mut colors = Vec::with_capacity(tile.width() * tile.height());
        for y in tile.y.clone() {
            for x in tile.x.clone() {
                colors.push(self.sampler.render_pixel(x, y));
            }
        }
        colors
    }
}
