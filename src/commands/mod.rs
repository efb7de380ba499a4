pub mod extract;
pub mod predict;
pub mod shared;
pub mod train;
pub mod training;

pub use extract::extract;
pub use predict::predict;
pub use train::train;
pub use training::training_data;
