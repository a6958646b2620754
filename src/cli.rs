use std::path::PathBuf;

use minibvh::{
    BuildSettings, Camera, Scene,
    device::DeviceMemory,
    geometry::{ScreenSize, WorldPoint, WorldVector},
    render_data::procedural,
};

use anyhow::Context as _;
use clap::Parser;
use image::{GrayImage, Luma};
use indicatif::ProgressBar;
use itertools::Itertools as _;
use rand::{SeedableRng, rngs::SmallRng};

/// Device memory available to generations, 256 MiB
const MEMORY_BUDGET: usize = 256 << 20;

#[derive(Debug, Parser)]
#[command(name = "minibvh-cli")]
#[command(about = "Traces a procedural scene and writes a depth image", long_about = None)]
struct Cli {
    /// Output PNG file
    #[arg(default_value = "depth.png")]
    output: PathBuf,

    /// Print the top level tree after building it
    #[arg(long)]
    print_tree: bool,

    /// Number of placed instances in the scene
    #[arg(short, long, default_value_t = 200)]
    instances: usize,

    /// Seed of the scene layout and of the tree builds
    #[arg(short, long, default_value_t = 0x5eed)]
    seed: u64,

    /// Scan all triangles of an instance instead of walking its tree
    #[arg(long)]
    reference_mode: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let camera = Camera::builder()
        .center(WorldPoint::new(0.0, 12.0, 30.0))
        .forward(WorldVector::new(0.0, -0.4, -1.0))
        .up(WorldVector::new(0.0, 1.0, 0.0))
        .resolution(ScreenSize::new(1024, 768))
        .film_width(36e-3)
        .focal_length(35e-3)
        .build()?;

    let mut rng = SmallRng::seed_from_u64(cli.seed);
    let mut data = procedural::demo_scene(&mut rng, cli.instances)?;
    let mut scene = Scene::new(
        BuildSettings::builder()
            .seed(cli.seed)
            .reference_mode(cli.reference_mode)
            .build(),
        DeviceMemory::new(MEMORY_BUDGET),
    );
    scene.rebuild(&mut data)?;
    scene.begin_frame();
    scene.log_statistics();

    if cli.print_tree {
        scene.tlas().tree().print_tree();
    }

    let resolution = camera.resolution();
    let bar = ProgressBar::new(resolution.y as u64);
    let depths = (0..resolution.y)
        .flat_map(|y| {
            let row = scene.trace_batch(&camera.row_rays(y));
            bar.inc(1);
            row.into_iter().map(|record| record.t)
        })
        .collect_vec();
    bar.finish();

    let far = depths
        .iter()
        .copied()
        .filter(|t| t.is_finite())
        .fold(0.0f32, f32::max);
    let hit_count = depths.iter().filter(|t| t.is_finite()).count();
    log::info!("{hit_count} of {} rays hit, farthest at {far}", depths.len());

    let image = GrayImage::from_fn(resolution.x, resolution.y, |x, y| {
        let t = depths[(y * resolution.x + x) as usize];
        if t.is_finite() {
            Luma([(255.0 * (1.0 - 0.9 * t / far)) as u8])
        } else {
            Luma([0])
        }
    });
    image
        .save(&cli.output)
        .with_context(|| format!("Writing depth image to {}", cli.output.display()))?;

    Ok(())
}
