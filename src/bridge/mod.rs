//! Bridge between the concentrator daemon and the application.
//!
//! ## Module Structure
//!
//! - `backend`: backend lifecycle and command surface (`Backend` struct)
//! - `channels`: output queue structures
//! - `events`: background receive loop for the daemon event stream

pub mod backend;
pub mod channels;
pub mod events;

// Re-export main types for convenience
pub use backend::Backend;
pub use channels::EventQueues;
