//! Reading and writing bands and scenes

mod native;
mod scene;

pub use native::{read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer};
pub use scene::{read_scene, write_scene, SceneManifest};
