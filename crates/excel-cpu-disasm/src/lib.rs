pub mod analyze;
pub mod listing;
pub mod model;

// Re-export commonly used types/functions for consumers
pub use analyze::{trace, Program, Report, Tracer};
pub use listing::{render_listing, Emitter, Header, ListingFlags, ListingOptions};
pub use model::{load_grid, GridCell};
