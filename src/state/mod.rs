//! State module for tracking crawl job lifecycle
//!
//! # Components
//!
//! - `JobState`: Lifecycle of one crawl job (idle, starting, running, stopping, closed)

mod job_state;

pub use job_state::JobState;
