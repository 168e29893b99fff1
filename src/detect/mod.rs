//! Pluggable detection backends
//!
//! Detection is a capability behind the [`Detector`] trait: object and face
//! landmark backends are swapped, never subclassed. Loading a backend is
//! expensive (model assets), so [`DetectorCache`] memoizes loads per backend
//! kind for the lifetime of the process: first caller loads, concurrent
//! callers await the same load, and a failed load is retried by the next
//! request instead of being cached.

pub mod backend;
pub mod backends;
pub mod loader;

pub use backend::{BackendKind, Detector};
pub use loader::{DetectorCache, DetectorProvider};
