pub mod history;
pub mod snapshot;
pub mod state;

// Re-exports for convenience
pub use history::*;
pub use snapshot::*;
pub use state::*;
