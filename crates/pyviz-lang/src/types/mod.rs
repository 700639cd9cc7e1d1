pub mod visual;
pub mod palette;
