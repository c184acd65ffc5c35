pub mod detection;
pub mod extraction;
pub mod match_log;
pub mod matcher;
pub mod memory_queue;
pub mod queue;
pub mod sampling;
pub mod store;
