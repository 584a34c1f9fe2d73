pub mod image;
pub mod points;
pub mod state;

pub use image::*;
pub use points::*;
pub use state::*;
