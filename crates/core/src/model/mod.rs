pub mod group;
pub mod record;
pub mod span;
pub mod trace;
