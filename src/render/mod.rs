pub mod cache;
pub mod graphics;
pub mod groove;
pub mod pulse;
pub mod raster;
pub mod scene;
pub mod text;
