pub mod engine;
pub mod payback;
