//! Backend implementations

pub mod channel;
#[cfg(feature = "console")]
pub mod console;
pub mod memory;
pub mod null;

pub use channel::ChannelBackend;
#[cfg(feature = "console")]
pub use console::ConsoleBackend;
pub use memory::MemoryBackend;
pub use null::NullBackend;

pub use crate::core::Backend;
