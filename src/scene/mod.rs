use std::sync::Arc;

use bon::bon;
use index_vec::IndexVec;
use rand::{SeedableRng, rngs::SmallRng};
use thiserror::Error;

use crate::{
    bvh::{Blas, Tlas, TreeStatistics},
    device::{DeviceMemory, FrameSync, Generation, ResourceError},
    geometry::{HitRecord, Ray},
    parallel::{WorkerCount, parallel_map},
    render_data::{MeshIdx, RenderData, RenderDataError},
    util::{Stats, mix_seed},
};

/// RNG stream of the top level tree, mesh ids use the streams below it.
const TLAS_STREAM: u64 = u64::MAX;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildSettings {
    /// Seed of all split axis choices; equal seeds and data give equal trees.
    pub seed: u64,
    /// Scan all triangles of an instance instead of walking its tree.
    pub reference_mode: bool,
    pub worker_count: WorkerCount,
}

#[bon]
impl BuildSettings {
    #[builder]
    pub fn new(
        #[builder(default)] seed: u64,
        #[builder(default)] reference_mode: bool,
        #[builder(default)] worker_count: WorkerCount,
    ) -> Self {
        BuildSettings {
            seed,
            reference_mode,
            worker_count,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RebuildError {
    #[error("Failed to upload the new generation")]
    Resource(#[from] ResourceError),

    #[error("Render data is inconsistent")]
    InvalidData(#[from] RenderDataError),
}

/// Summary of a successful rebuild.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RebuildReport {
    /// Id of the submitted generation, active from the next frame.
    pub generation: u64,
    pub rebuilt_meshes: usize,
    pub instance_count: usize,
}

/// Host side acceleration structures together with the device generations built from them.
#[derive(Debug)]
pub struct Scene {
    settings: BuildSettings,
    memory: Arc<DeviceMemory>,

    blases: IndexVec<MeshIdx, Arc<Blas>>,
    tlas: Tlas,

    frames: FrameSync,
    generation_count: u64,
}

struct Rebuilt {
    blases: IndexVec<MeshIdx, Arc<Blas>>,
    tlas: Tlas,
    generation: Generation,
    rebuilt_meshes: usize,
}

impl Scene {
    pub fn new(settings: BuildSettings, memory: Arc<DeviceMemory>) -> Scene {
        Scene {
            settings,
            memory,
            blases: IndexVec::new(),
            tlas: Tlas::default(),
            frames: FrameSync::new(),
            generation_count: 0,
        }
    }

    /// Rebuilds trees of dirty meshes and the top level tree, and submits
    /// a new generation for the next frame boundary.
    ///
    /// Returns `Ok(None)` when nothing changed since the last rebuild.
    /// On error nothing is submitted and the dirty state of `data` is kept,
    /// traversals continue using the current generation.
    pub fn rebuild<D: RenderData + Sync + ?Sized>(
        &mut self,
        data: &mut D,
    ) -> Result<Option<RebuildReport>, RebuildError> {
        if self.generation_count > 0 && !data.is_dirty() {
            return Ok(None);
        }

        let id = self.generation_count + 1;
        let rebuilt = self.build_generation(id, data).inspect_err(|error| {
            log::warn!("Rebuild of generation {id} aborted, keeping the previous one: {error}");
        })?;

        let report = RebuildReport {
            generation: id,
            rebuilt_meshes: rebuilt.rebuilt_meshes,
            instance_count: rebuilt.generation.instance_count(),
        };
        log::info!(
            "Generation {id}: rebuilt {} of {} meshes, {} instances, {} bytes",
            report.rebuilt_meshes,
            rebuilt.blases.len(),
            report.instance_count,
            rebuilt.generation.size()
        );

        self.blases = rebuilt.blases;
        self.tlas = rebuilt.tlas;
        self.frames.submit(rebuilt.generation);
        self.generation_count = id;
        data.clear_dirty();

        Ok(Some(report))
    }

    fn build_generation<D: RenderData + Sync + ?Sized>(
        &self,
        id: u64,
        data: &D,
    ) -> Result<Rebuilt, RebuildError> {
        data.validate_pools()?;
        for mesh in data.meshes().indices() {
            data.mesh_range(mesh)?;
        }

        let dirty: Vec<MeshIdx> = data
            .meshes()
            .iter_enumerated()
            .filter(|&(mesh, range)| match self.blases.get(mesh) {
                Some(blas) => data.is_mesh_dirty(mesh) || blas.range() != range,
                None => true,
            })
            .map(|(mesh, _)| mesh)
            .collect();

        let seed = self.settings.seed;
        let built = parallel_map(&dirty, self.settings.worker_count, |&mesh| {
            let mut rng = SmallRng::seed_from_u64(mix_seed(seed, u64::from(mesh.raw())));
            Blas::build(mesh, data, &mut rng)
        });

        let mut blases = self.blases.clone();
        blases.raw.truncate(data.meshes().len());
        for (mesh, blas) in dirty.iter().zip(built) {
            let blas = Arc::new(blas?);
            if mesh.index() < blases.len() {
                blases[*mesh] = blas;
            } else {
                blases.push(blas);
            }
        }

        let mut rng = SmallRng::seed_from_u64(mix_seed(seed, TLAS_STREAM));
        let tlas = Tlas::build(data.instances(), &blases, &mut rng)?;

        let generation = Generation::upload(
            id,
            &self.memory,
            &tlas,
            &blases,
            data,
            self.settings.reference_mode,
        )?;

        Ok(Rebuilt {
            blases,
            tlas,
            generation,
            rebuilt_meshes: dirty.len(),
        })
    }

    /// Frame boundary, see [`FrameSync::begin_frame`].
    pub fn begin_frame(&mut self) -> u64 {
        self.frames.begin_frame()
    }

    /// Generation visible to traversals in the current frame.
    /// Holding on to it keeps its buffers alive past the next swap.
    pub fn active_generation(&self) -> Option<Arc<Generation>> {
        self.frames.active().cloned()
    }

    pub fn frames(&self) -> &FrameSync {
        &self.frames
    }

    /// Nearest hit in the active generation.
    pub fn trace(&self, ray: &Ray) -> HitRecord {
        match self.frames.active() {
            Some(generation) => generation.trace(ray),
            None => HitRecord::miss(),
        }
    }

    /// Traces rays on worker threads, results are in the order of the rays.
    pub fn trace_batch(&self, rays: &[Ray]) -> Vec<HitRecord> {
        match self.frames.active() {
            Some(generation) => {
                parallel_map(rays, self.settings.worker_count, |ray| generation.trace(ray))
            }
            None => vec![HitRecord::miss(); rays.len()],
        }
    }

    /// Number of instances traversals of the current frame can hit.
    pub fn instance_count(&self) -> usize {
        self.frames.active().map_or(0, |generation| generation.instance_count())
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    pub fn memory(&self) -> &Arc<DeviceMemory> {
        &self.memory
    }

    /// Top level tree of the most recent successful rebuild.
    pub fn tlas(&self) -> &Tlas {
        &self.tlas
    }

    pub fn blas(&self, mesh: MeshIdx) -> Option<&Arc<Blas>> {
        self.blases.get(mesh)
    }

    pub fn log_statistics(&self) {
        TreeStatistics::new(self.tlas.tree()).log("TLAS");

        let mut leaf_depth = Stats::default();
        let mut leaf_fill = Stats::default();
        for blas in self.blases.iter() {
            let statistics = TreeStatistics::new(blas.tree());
            leaf_depth = leaf_depth.merge(&statistics.leaf_depth);
            leaf_fill = leaf_fill.merge(&statistics.leaf_fill);
        }
        log::info!(
            "{} BLASes: leaf depth {leaf_depth}; leaf fill {leaf_fill}",
            self.blases.len()
        );
    }
}
