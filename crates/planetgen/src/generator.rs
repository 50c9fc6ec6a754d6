//! Resumable generation pipeline.
//!
//! A [`PipelineJob`] runs one phase per [`PipelineJob::step`] call so a host
//! can spread a regeneration over several frames. [`JobSlot`] keeps at most
//! one job alive and cancels it when a newer request comes in.

use crate::config::PlanetGenConfig;
use crate::erosion::erode;
use crate::grid::Grid;
use crate::hydrology;
use crate::mesh_data::MeshData;
use crate::planet::PlanetSurface;
use crate::smoothing::smooth;
use crate::tectonics::synthesize_plate_field;
use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Plates,
    Erosion,
    Smoothing,
    Hydrology,
    Meshing,
    Done,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Plates,
        Phase::Erosion,
        Phase::Smoothing,
        Phase::Hydrology,
        Phase::Meshing,
        Phase::Done,
    ];

    /// Fraction of the pipeline finished when this phase starts.
    pub fn progress(self) -> f32 {
        let position = Self::ALL.iter().position(|&p| p == self).unwrap_or(0);
        position as f32 / (Self::ALL.len() - 1) as f32
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Plates => "plates",
            Phase::Erosion => "erosion",
            Phase::Smoothing => "smoothing",
            Phase::Hydrology => "hydrology",
            Phase::Meshing => "meshing",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Shared flag that stops a job at its next phase boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Everything a finished run produces.
#[derive(Debug, Clone)]
pub struct Generation {
    pub surface: PlanetSurface,
    pub mesh: MeshData,
}

#[derive(Debug)]
pub enum StepOutcome {
    /// A phase completed; holds the phase that runs next.
    Advanced(Phase),
    Finished(Generation),
    /// The token was cancelled, or the job had already finished.
    Cancelled,
}

/// Intermediate state between phases. Each variant owns exactly the data
/// the next phase consumes.
enum Stage {
    Plates,
    Erosion(Grid),
    Smoothing(Grid),
    Hydrology(Grid),
    Meshing(PlanetSurface),
    Finished(Generation),
    Done,
}

impl Stage {
    fn phase(&self) -> Phase {
        match self {
            Stage::Plates => Phase::Plates,
            Stage::Erosion(_) => Phase::Erosion,
            Stage::Smoothing(_) => Phase::Smoothing,
            Stage::Hydrology(_) => Phase::Hydrology,
            Stage::Meshing(_) => Phase::Meshing,
            Stage::Finished(_) | Stage::Done => Phase::Done,
        }
    }
}

fn run_phase(stage: Stage, config: &PlanetGenConfig) -> Stage {
    let phase = stage.phase();
    let started = Instant::now();

    let next = match stage {
        Stage::Plates => {
            let mut height = synthesize_plate_field(config);
            repair(&mut height, phase);
            Stage::Erosion(height)
        }
        Stage::Erosion(mut height) => {
            let stats = erode(&mut height, &config.erosion, config.generation.seed);
            repair(&mut height, phase);
            info!(
                "Erosion moved {:.3} of material with {} droplets",
                stats.eroded, stats.droplets
            );
            Stage::Smoothing(height)
        }
        Stage::Smoothing(mut height) => {
            smooth(&mut height, config.generation.smooth_passes);
            let (lo, hi) = height.min_max();
            debug!("Smoothed height range {lo:.3}..{hi:.3}, normalizing");
            height.normalize();
            repair(&mut height, phase);
            Stage::Hydrology(height)
        }
        Stage::Hydrology(mut height) => {
            let layers = hydrology::resolve(&mut height, &config.hydrology);
            info!(
                "Hydrology found {} ocean, {} lake and {} river cells",
                layers.stats.ocean_cells, layers.stats.lake_cells, layers.stats.river_cells
            );
            Stage::Meshing(PlanetSurface::new(
                height,
                layers.intensity,
                layers.surface,
                config.clone(),
            ))
        }
        Stage::Meshing(surface) => {
            let mesh = MeshData::from_surface(&surface);
            info!(
                "Built planet mesh: {} vertices, {} triangles",
                mesh.vertex_count(),
                mesh.triangle_count()
            );
            Stage::Finished(Generation { surface, mesh })
        }
        finished @ (Stage::Finished(_) | Stage::Done) => finished,
    };

    let size = config.generation.resolution;
    info!("Phase {phase} finished on {size}x{size} grid in {:?}", started.elapsed());
    next
}

fn repair(height: &mut Grid, phase: Phase) {
    let fixed = height.sanitize(0.0, 1.0, 0.0);
    if fixed > 0 {
        warn!("Replaced {fixed} non-finite height cells after {phase}");
    }
}

/// One planet generation, advanced a phase at a time.
pub struct PipelineJob {
    config: PlanetGenConfig,
    stage: Stage,
    token: CancellationToken,
}

impl PipelineJob {
    pub fn new(config: &PlanetGenConfig) -> Self {
        let config = config.sanitized();
        info!(
            "Starting planet generation: seed {}, {}x{} grid, {} plates",
            config.generation.seed,
            config.generation.resolution,
            config.generation.resolution,
            config.plates.plate_count
        );
        Self {
            config,
            stage: Stage::Plates,
            token: CancellationToken::default(),
        }
    }

    /// The sanitized configuration this job runs with.
    pub fn config(&self) -> &PlanetGenConfig {
        &self.config
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The phase the next `step` will run.
    pub fn phase(&self) -> Phase {
        self.stage.phase()
    }

    pub fn step(&mut self) -> StepOutcome {
        if self.token.is_cancelled() {
            if !matches!(self.stage, Stage::Done) {
                info!("Planet generation cancelled before {}", self.stage.phase());
            }
            self.stage = Stage::Done;
            return StepOutcome::Cancelled;
        }

        let stage = std::mem::replace(&mut self.stage, Stage::Done);
        if matches!(stage, Stage::Done) {
            return StepOutcome::Cancelled;
        }

        match run_phase(stage, &self.config) {
            Stage::Finished(generation) => {
                info!("Planet generation finished (seed {})", self.config.generation.seed);
                StepOutcome::Finished(generation)
            }
            next => {
                let phase = next.phase();
                self.stage = next;
                StepOutcome::Advanced(phase)
            }
        }
    }
}

/// Holds at most one in-flight job.
#[derive(Default)]
pub struct JobSlot {
    job: Option<PipelineJob>,
}

impl JobSlot {
    /// Cancels whatever is running and starts a job for `config`.
    pub fn submit(&mut self, config: &PlanetGenConfig) -> CancellationToken {
        self.cancel();
        let job = PipelineJob::new(config);
        let token = job.token();
        self.job = Some(job);
        token
    }

    /// Runs one phase of the current job. Returns `None` when idle.
    pub fn poll(&mut self) -> Option<StepOutcome> {
        let job = self.job.as_mut()?;
        let outcome = job.step();
        if !matches!(outcome, StepOutcome::Advanced(_)) {
            self.job = None;
        }
        Some(outcome)
    }

    pub fn cancel(&mut self) {
        if let Some(job) = self.job.take() {
            job.cancel();
            info!(
                "Dropped in-flight generation for seed {} at {}",
                job.config.generation.seed,
                job.phase()
            );
        }
    }

    pub fn is_busy(&self) -> bool {
        self.job.is_some()
    }

    pub fn current_phase(&self) -> Option<Phase> {
        self.job.as_ref().map(PipelineJob::phase)
    }
}

/// Runs every phase for `config` on the calling thread.
pub fn generate(config: &PlanetGenConfig) -> Generation {
    let config = config.sanitized();
    let mut stage = Stage::Plates;
    loop {
        stage = match run_phase(stage, &config) {
            Stage::Finished(generation) => return generation,
            next => next,
        };
    }
}
