pub mod acceptance;
pub mod actuator;
pub mod class;
pub mod classifier;
pub mod consumer;
pub mod duration;
pub mod interval;
pub mod phase;
pub mod scheduler;
pub mod selector;
pub mod series;
pub mod signal;
pub mod slot;
pub mod stats;
