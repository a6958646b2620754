pub mod bvh;
pub mod camera;
pub mod device;
pub mod geometry;
mod parallel;
pub mod render_data;
mod scene;
mod util;

pub use camera::Camera;
pub use parallel::WorkerCount;
pub use scene::{BuildSettings, RebuildError, RebuildReport, Scene};
pub use util::Stats;
