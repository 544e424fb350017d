use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec3;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tessera_core::chunk_map::ChunkMap;
use tessera_core::jobs::{square_around, JobSystem};
use tessera_core::model_worker::{ModelRequest, ModelVersions, ModelWorker};
use tessera_shared::collision::Cylinder;
use tessera_shared::config::WorldConfig;
use tessera_shared::coords::{ChunkPos, CHUNK_SIZE_Y};
use tessera_shared::model::{ChunkModel, RenderEffect};
use tessera_shared::physics::{pick_block, resolve_movement, Ray};
use tessera_shared::registry::BlockRegistry;

const USAGE: &str = "Usage: chunk_inspector [--config <world.toml>] [--radius <n>] [--threads <n>] \
[--pick <x,y,z>] [--dir <dx,dy,dz>] [--drop <x,z>]";
const PICK_RANGE: f32 = 64.0;
const MODEL_TIMEOUT: Duration = Duration::from_secs(60);

struct Args {
    config: Option<PathBuf>,
    radius: i32,
    threads: Option<usize>,
    pick: Option<Vec3>,
    direction: Vec3,
    drop: Option<(f32, f32)>,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .try_init();

    let args = parse_args();
    if let Err(err) = run(&args) {
        error!("chunk_inspector: {err}");
        std::process::exit(1);
    }
}

fn parse_args() -> Args {
    let mut parsed = Args {
        config: None,
        radius: 1,
        threads: None,
        pick: None,
        direction: Vec3::NEG_Y,
        drop: None,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next().unwrap_or_else(|| {
                eprintln!("{name} expects an argument");
                std::process::exit(2);
            })
        };
        match arg.as_str() {
            "--config" => parsed.config = Some(PathBuf::from(value("--config"))),
            "--radius" => parsed.radius = parse_or_exit("--radius", &value("--radius")),
            "--threads" => parsed.threads = Some(parse_or_exit("--threads", &value("--threads"))),
            "--pick" => parsed.pick = Some(parse_vec3_or_exit("--pick", &value("--pick"))),
            "--dir" => parsed.direction = parse_vec3_or_exit("--dir", &value("--dir")),
            "--drop" => {
                let raw = value("--drop");
                let coords = parse_floats(&raw);
                match coords.as_deref() {
                    Some([x, z]) => parsed.drop = Some((*x, *z)),
                    _ => {
                        eprintln!("invalid --drop '{raw}': expected x,z");
                        std::process::exit(2);
                    }
                }
            }
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => {
                eprintln!("unknown argument: {other}");
                eprintln!("{USAGE}");
                std::process::exit(2);
            }
        }
    }

    parsed
}

fn parse_or_exit<T>(name: &str, value: &str) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value.parse::<T>() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("invalid {name} '{value}': {err}");
            std::process::exit(2);
        }
    }
}

fn parse_floats(value: &str) -> Option<Vec<f32>> {
    value
        .split(',')
        .map(|part| part.trim().parse::<f32>().ok())
        .collect()
}

fn parse_vec3_or_exit(name: &str, value: &str) -> Vec3 {
    match parse_floats(value).as_deref() {
        Some([x, y, z]) => Vec3::new(*x, *y, *z),
        _ => {
            eprintln!("invalid {name} '{value}': expected x,y,z");
            std::process::exit(2);
        }
    }
}

fn run(args: &Args) -> Result<(), String> {
    let config = match &args.config {
        Some(path) => {
            let source = fs::read_to_string(path)
                .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
            WorldConfig::from_toml_str(&source)
                .map_err(|err| format!("{}: {err}", path.display()))?
        }
        None => WorldConfig::default(),
    };

    let registry = Arc::new(config.build_registry().map_err(|err| err.to_string())?);
    let generator = config
        .build_generator(&registry)
        .map_err(|err| err.to_string())?;
    info!("{} blocks registered", registry.len());

    let jobs = JobSystem::new(args.threads).map_err(|err| err.to_string())?;
    let positions = square_around(ChunkPos::new(0, 0), args.radius);

    let started = Instant::now();
    let mut map = ChunkMap::new();
    for (pos, chunk) in jobs.generate_chunks(generator.as_ref(), &positions) {
        map.insert(pos, chunk);
    }
    info!(
        "generated {} chunks on {} threads in {:.1?}",
        map.len(),
        jobs.num_threads(),
        started.elapsed()
    );

    let started = Instant::now();
    let models = build_models(&map, &positions, &registry, &config, args.threads)?;
    info!("built {} models in {:.1?}", models.len(), started.elapsed());

    print_stats(&map, &models);

    if let Some(origin) = args.pick {
        let ray = Ray::new(origin, args.direction);
        match pick_block(&ray, PICK_RANGE, &map, &registry) {
            Some(pick) => println!(
                "pick: {} `{}` face {:?} at t={:.3}",
                pick.position,
                registry.description(pick.id).name(),
                pick.face,
                pick.t
            ),
            None => println!("pick: nothing within {PICK_RANGE} blocks"),
        }
    }

    if let Some((x, z)) = args.drop {
        let start = Vec3::new(x, CHUNK_SIZE_Y as f32, z);
        let actor = Cylinder::new(start, 0.3, 1.8);
        let fall = Vec3::new(0.0, -(CHUNK_SIZE_Y as f32), 0.0);
        let outcome = resolve_movement(&actor, fall, &map, &registry);
        if outcome.on_ground {
            println!("drop: landed at {}", outcome.cylinder.low_centre);
        } else {
            println!("drop: fell out of the world at {}", outcome.cylinder.low_centre);
        }
    }

    Ok(())
}

fn build_models(
    map: &ChunkMap,
    positions: &[ChunkPos],
    registry: &Arc<BlockRegistry>,
    config: &WorldConfig,
    threads: Option<usize>,
) -> Result<Vec<ChunkModel>, String> {
    let worker = ModelWorker::new(threads).map_err(|err| err.to_string())?;
    let mut versions = ModelVersions::default();

    let mut pending = 0usize;
    for &pos in positions {
        let version = versions.bump(pos);
        match ModelRequest::from_map(map, pos, Arc::clone(registry), config.lighting, version) {
            Some(request) => {
                worker.submit(request);
                pending += 1;
            }
            None => versions.forget(pos),
        }
    }

    let mut models = Vec::with_capacity(pending);
    while pending > 0 {
        let mut ready = worker.poll();
        if ready.is_empty() {
            let completed = worker
                .recv_timeout(MODEL_TIMEOUT)
                .ok_or_else(|| format!("timed out waiting for {pending} chunk models"))?;
            ready.push(completed);
        }
        for completed in ready {
            pending -= 1;
            if versions.is_current(&completed) {
                models.push(completed.model);
            } else {
                warn!("dropping stale model for chunk {}", completed.chunk_pos);
            }
        }
    }
    models.sort_by_key(|model| model.position);
    Ok(models)
}

fn print_stats(map: &ChunkMap, models: &[ChunkModel]) {
    let blocks: usize = map
        .positions()
        .filter_map(|pos| map.get(pos))
        .map(|chunk| chunk.count_non_void())
        .sum();
    println!("chunks: {}  non-void blocks: {}", map.len(), blocks);

    for effect in RenderEffect::ALL {
        let quads: usize = models.iter().map(|model| model.mesh(effect).quad_count()).sum();
        let bytes: usize = models
            .iter()
            .map(|model| model.vertex_bytes(effect).len() + model.index_bytes(effect).len())
            .sum();
        println!("  {:<12} {:>8} quads {:>10} bytes", format!("{effect:?}"), quads, bytes);
    }
}
