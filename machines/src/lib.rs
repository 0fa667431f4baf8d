pub mod image_loader;
pub mod pdp8e;

pub use pdp8e::Pdp8eSystem;
