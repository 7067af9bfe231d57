//! Wire transport to the concentrator daemon.

pub mod command;
pub mod endpoint;
pub mod event;
pub mod multipart;

pub use command::CommandChannel;
pub use endpoint::Endpoint;
pub use event::EventChannel;
pub use multipart::Multipart;
