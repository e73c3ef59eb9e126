//! Cooperative cancellation for running pipelines.

mod token;

pub use token::CancellationToken;
