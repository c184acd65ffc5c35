pub mod analysis;
pub mod image;
pub mod message;
pub mod report;
