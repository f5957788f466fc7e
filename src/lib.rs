pub mod affordance;
pub mod aggregator;
pub mod app_state;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod session;
pub mod sharing;
pub mod store;
pub mod tasks;
pub mod view;

pub use aggregator::{SharingOutcome, TaskAggregator};
pub use error::{TaskError, TaskResult};
pub use session::Session;
