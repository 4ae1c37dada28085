pub mod encode;
pub mod group;
pub mod loader;
pub mod pipeline;
pub mod reconstruct;
