//! Face and driver license scanning pipeline
//!
//! A producer samples images from a static store, asks a vision service for
//! faces and enqueues the images that contain one. A consumer drains the
//! queue, extracts document text from each image and appends those that
//! mention the target phrase to a match log. The two sides share nothing but
//! a grouped FIFO work queue, which also carries the end-of-work signal.

pub mod app_state;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod telemetry;
