//! Pure todo logic shared by the server and the client cache.

pub mod filter;
pub mod lifecycle;
pub mod stats;

pub use filter::{derive_view, FilterMode, SortDirection, SortField, SortSpec, ViewCriteria};
pub use stats::TodoStats;
