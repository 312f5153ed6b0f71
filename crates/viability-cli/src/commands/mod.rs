pub mod analysis;
pub mod project;
pub mod resource;
pub mod viability;
