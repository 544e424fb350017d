use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use tessera_shared::chunk::ChunkBlockData;
use tessera_shared::coords::ChunkPos;
use tessera_shared::lighting::{compute_chunk_light, LightingConfig};
use tessera_shared::model::{build_chunk_model, ChunkModel};
use tessera_shared::neighborhood::ChunkNeighborhoodView;
use tessera_shared::registry::BlockRegistry;

use crate::chunk_map::{ChunkMap, NEIGHBOR_OFFSETS};

/// Read-only snapshot of a chunk and its surroundings.
pub struct ModelRequest {
    pub chunk_pos: ChunkPos,
    pub chunk: Arc<ChunkBlockData>,
    // Same order as `NEIGHBOR_OFFSETS`.
    pub neighbors: [Option<Arc<ChunkBlockData>>; 8],
    pub registry: Arc<BlockRegistry>,
    pub lighting: LightingConfig,
    pub version: u64,
}

impl ModelRequest {
    pub fn from_map(
        map: &ChunkMap,
        chunk_pos: ChunkPos,
        registry: Arc<BlockRegistry>,
        lighting: LightingConfig,
        version: u64,
    ) -> Option<Self> {
        let chunk = map.snapshot(chunk_pos)?;
        let neighbors = NEIGHBOR_OFFSETS.map(|offset| map.snapshot(chunk_pos + offset));
        Some(Self {
            chunk_pos,
            chunk,
            neighbors,
            registry,
            lighting,
            version,
        })
    }

    /// Lights and builds the model on the calling thread.
    pub fn build(&self) -> ChunkModel {
        let view = NEIGHBOR_OFFSETS.iter().zip(&self.neighbors).fold(
            ChunkNeighborhoodView::new(self.chunk_pos, &self.chunk),
            |view, (offset, neighbor)| match neighbor {
                Some(neighbor) => view.with_neighbor(*offset, neighbor),
                None => view,
            },
        );
        let light = compute_chunk_light(&view, self.chunk_pos, &self.registry, &self.lighting);
        build_chunk_model(&view, &self.registry, &light)
    }
}

pub struct CompletedModel {
    pub chunk_pos: ChunkPos,
    pub model: ChunkModel,
    pub version: u64,
}

pub struct ModelWorker {
    pool: ThreadPool,
    completed_rx: Receiver<CompletedModel>,
    completed_tx: Sender<CompletedModel>,
}

impl ModelWorker {
    pub fn new(num_threads: Option<usize>) -> Result<Self, ThreadPoolBuildError> {
        let worker_threads = num_threads.unwrap_or_else(|| {
            let available = std::thread::available_parallelism()
                .map(|parallelism| parallelism.get())
                .unwrap_or(4);
            available.saturating_sub(1).clamp(2, 8)
        });
        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|index| format!("model-worker-{index}"))
            .build()?;
        let (completed_tx, completed_rx) = mpsc::channel();
        debug!("model worker started with {} threads", worker_threads);

        Ok(Self {
            pool,
            completed_rx,
            completed_tx,
        })
    }

    pub fn submit(&self, request: ModelRequest) {
        let completed_tx = self.completed_tx.clone();
        self.pool.spawn(move || {
            let model = request.build();
            trace!(
                "model for chunk {} v{} ready ({} quads)",
                request.chunk_pos,
                request.version,
                model.quad_count()
            );
            let _ = completed_tx.send(CompletedModel {
                chunk_pos: request.chunk_pos,
                model,
                version: request.version,
            });
        });
    }

    pub fn poll(&self) -> Vec<CompletedModel> {
        let mut completed = Vec::new();
        while let Ok(result) = self.completed_rx.try_recv() {
            completed.push(result);
        }
        completed
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<CompletedModel> {
        match self.completed_rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// Latest requested model version per chunk, so results that were overtaken
/// by a newer request can be dropped.
#[derive(Default)]
pub struct ModelVersions {
    latest: FxHashMap<ChunkPos, u64>,
}

impl ModelVersions {
    pub fn bump(&mut self, pos: ChunkPos) -> u64 {
        let version = self.latest.entry(pos).or_insert(0);
        *version += 1;
        *version
    }

    pub fn is_current(&self, completed: &CompletedModel) -> bool {
        self.latest.get(&completed.chunk_pos) == Some(&completed.version)
    }

    pub fn forget(&mut self, pos: ChunkPos) {
        self.latest.remove(&pos);
    }
}
