pub mod chunk_map;
pub mod jobs;
pub mod model_worker;
