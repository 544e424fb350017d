use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::debug;

use tessera_shared::chunk::ChunkBlockData;
use tessera_shared::coords::ChunkPos;
use tessera_shared::worldgen::{generate_chunk, LandGenerator};

/// Shared worker pool for chunk-sized batch work.
pub struct JobSystem {
    pool: ThreadPool,
}

impl JobSystem {
    pub fn new(num_threads: Option<usize>) -> Result<Self, ThreadPoolBuildError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|index| format!("job-{index}"));
        if let Some(count) = num_threads {
            builder = builder.num_threads(count);
        }

        let pool = builder.build()?;
        debug!("job system started with {} threads", pool.current_num_threads());
        Ok(Self { pool })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Generates every position in parallel, each into its own chunk. The
    /// result keeps the order of `positions`.
    pub fn generate_chunks(
        &self,
        generator: &dyn LandGenerator,
        positions: &[ChunkPos],
    ) -> Vec<(ChunkPos, ChunkBlockData)> {
        let chunks: Vec<(ChunkPos, ChunkBlockData)> = self.pool.install(|| {
            positions
                .par_iter()
                .map(|&pos| (pos, generate_chunk(generator, pos)))
                .collect()
        });
        debug!("generated {} chunks", chunks.len());
        chunks
    }
}

/// Positions of a square of chunks centred on `center`, row by row.
pub fn square_around(center: ChunkPos, radius: i32) -> Vec<ChunkPos> {
    let radius = radius.max(0);
    (-radius..=radius)
        .flat_map(|dz| (-radius..=radius).map(move |dx| center + ChunkPos::new(dx, dz)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{square_around, JobSystem};
    use tessera_shared::coords::ChunkPos;
    use tessera_shared::registry::register_builtin_blocks;
    use tessera_shared::worldgen::{generate_chunk, FlatLandGenerator};

    #[test]
    fn parallel_generation_matches_serial_generation() {
        let registry = register_builtin_blocks();
        let generator = FlatLandGenerator::new(
            5,
            registry.id_of("grass").expect("grass"),
            registry.id_of("dirt").expect("dirt"),
        );
        let jobs = JobSystem::new(Some(2)).expect("pool");
        let positions = square_around(ChunkPos::new(3, -1), 1);
        assert_eq!(positions.len(), 9);

        let chunks = jobs.generate_chunks(&generator, &positions);
        assert_eq!(chunks.len(), positions.len());
        for ((pos, chunk), expected) in chunks.iter().zip(&positions) {
            assert_eq!(pos, expected);
            assert!(chunk.same_blocks(&generate_chunk(&generator, *pos)));
        }
    }
}
