pub mod analysis;
pub mod execution;
pub mod physics;
pub mod serialization;
pub mod trajectory;
pub mod velocity;
