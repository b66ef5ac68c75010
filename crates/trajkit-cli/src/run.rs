use std::io::Write;

use trajkit_core::error::{TrajError, TrajResult};
use trajkit_core::range::frame_list;
use trajkit_core::system::AtomGroup;
use trajkit_engine::{
    cross_rmsd, cross_rmsd_parallel, estimate_cache_bytes, pair_count, pairwise_rmsd,
    pairwise_rmsd_parallel, physical_memory_bytes, read_coords, CoordinateMatrix, PercentTrigger,
    ProgressCounter, ProgressSink, RmsdMatrix, Superposer, SvdBackend, TrajectoryFrames,
};
use trajkit_io::{open_trajectory, read_model, Trajectory, TrajectoryFormat};

use crate::config::{RunConfig, SystemSpec};

/// Above this share of physical memory the coordinate cache is flagged.
pub const CACHE_MEMORY_FRACTION_WARNING: f64 = 0.66;

/// A model, its trajectory, the selected subset and the frames to visit.
pub struct LoadedSystem {
    pub traj: Trajectory,
    pub subset: AtomGroup,
    pub frames: Vec<usize>,
}

impl LoadedSystem {
    pub fn load(spec: &SystemSpec) -> TrajResult<Self> {
        let model = read_model(&spec.model)?;
        let traj = open_trajectory(&spec.traj, &model)?;
        let subset = model.select(&spec.selection)?;
        let frames = frame_list(traj.n_frames(), spec.skip, spec.range.as_deref())?;
        if frames.is_empty() {
            return Err(TrajError::Invalid(format!(
                "no frames selected from {}",
                spec.traj.display()
            )));
        }
        log::info!(
            "{}: {} atoms selected by '{}', {} frames",
            spec.traj.display(),
            subset.len(),
            spec.selection,
            frames.len()
        );
        Ok(Self {
            traj,
            subset,
            frames,
        })
    }

    fn cache(&mut self) -> TrajResult<CoordinateMatrix> {
        let mut cache = read_coords(&mut self.traj, &self.subset, &self.frames)?;
        cache.center_all();
        Ok(cache)
    }

    fn reread(&mut self) -> TrajectoryFrames<'_, Box<dyn TrajectoryFormat>> {
        TrajectoryFrames::new(&mut self.traj, &self.subset, self.frames.clone())
    }
}

/// Loads the inputs and computes the RMSD matrix the configuration asks for.
pub fn run(cfg: &RunConfig) -> TrajResult<RmsdMatrix> {
    cfg.validate()?;
    let superposer = Superposer::new(SvdBackend::parse(&cfg.svd)?.build())
        .with_proper_rotation(cfg.proper_rotation);
    let mut first = LoadedSystem::load(&cfg.first()?)?;
    let mut second = match cfg.second() {
        Some(spec) => {
            let system = LoadedSystem::load(&spec)?;
            if system.subset.len() != first.subset.len() {
                return Err(TrajError::Mismatch(format!(
                    "selections differ in size: {} atoms in the first system, {} in the second",
                    first.subset.len(),
                    system.subset.len()
                )));
            }
            Some(system)
        }
        None => None,
    };

    let total = match &second {
        Some(other) => first.frames.len() * other.frames.len(),
        None => pair_count(first.frames.len()),
    };
    let sink = if cfg.stream {
        ProgressSink::Ndjson
    } else {
        ProgressSink::Log
    };
    let mut progress = ProgressCounter::new("rmsds", total, PercentTrigger::default(), sink);
    log::info!(
        "{total} comparisons with the {} SVD backend",
        superposer.backend_name()
    );

    let matrix = if cfg.cache {
        let n_frames = first.frames.len() + second.as_ref().map_or(0, |s| s.frames.len());
        warn_if_cache_is_large(estimate_cache_bytes(n_frames, first.subset.len()));
        let cache1 = first.cache()?;
        let cache2 = match second.as_mut() {
            Some(system) => Some(system.cache()?),
            None => None,
        };
        progress.start();
        compare_cached(cfg.threads, cache1, cache2, &superposer, &progress)?
    } else {
        if cfg.threads != 1 {
            log::warn!("--threads needs the coordinate cache; comparing on one thread");
        }
        progress.start();
        let mut source1 = first.reread();
        match second.as_mut() {
            Some(system) => {
                let mut source2 = system.reread();
                cross_rmsd(&mut source1, &mut source2, &superposer, &progress)?
            }
            None => pairwise_rmsd(&mut source1, &superposer, &progress)?,
        }
    };
    progress.finish();
    Ok(matrix)
}

fn compare_cached(
    threads: usize,
    mut cache1: CoordinateMatrix,
    cache2: Option<CoordinateMatrix>,
    superposer: &Superposer,
    progress: &ProgressCounter,
) -> TrajResult<RmsdMatrix> {
    if threads == 1 {
        return match cache2 {
            Some(mut b) => cross_rmsd(&mut cache1, &mut b, superposer, progress),
            None => pairwise_rmsd(&mut cache1, superposer, progress),
        };
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| TrajError::Invalid(format!("cannot start thread pool: {e}")))?;
    log::info!("comparing on {} threads", pool.current_num_threads());
    pool.install(|| match &cache2 {
        Some(b) => cross_rmsd_parallel(&cache1, b, superposer, progress),
        None => pairwise_rmsd_parallel(&cache1, superposer, progress),
    })
}

fn warn_if_cache_is_large(bytes: usize) {
    let Some(physical) = physical_memory_bytes() else {
        log::debug!("physical memory unknown; coordinate cache needs {bytes} bytes");
        return;
    };
    let fraction = bytes as f64 / physical as f64;
    if fraction > CACHE_MEMORY_FRACTION_WARNING {
        log::warn!(
            "coordinate cache needs {:.1} GiB, {:.0}% of physical memory; consider --cache=0",
            bytes as f64 / (1u64 << 30) as f64,
            fraction * 100.0
        );
    } else {
        log::debug!("coordinate cache needs {bytes} bytes");
    }
}

/// Prints the matrix under a `# header` line, or only its summary in
/// `noout` mode.
pub fn write_report<W: Write>(
    out: &mut W,
    cfg: &RunConfig,
    header: &str,
    matrix: &RmsdMatrix,
) -> TrajResult<()> {
    if cfg.noout {
        match matrix.stats() {
            Ok(stats) => writeln!(
                out,
                "# {} x {}: n={} mean={:.4} std={:.4} min={:.4} max={:.4}",
                matrix.rows(),
                matrix.cols(),
                stats.count,
                stats.mean,
                stats.std_dev,
                stats.min,
                stats.max
            )?,
            Err(_) => writeln!(
                out,
                "# {} x {}: nothing to compare",
                matrix.rows(),
                matrix.cols()
            )?,
        }
        return Ok(());
    }
    writeln!(out, "# {header}")?;
    matrix.write(out, cfg.precision)?;
    Ok(())
}
