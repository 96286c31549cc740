//! Event handlers for published portfolio state

pub mod console;
pub mod composite;

// Re-export for convenience
pub use console::ConsoleEventHandler;
pub use composite::CompositeEventHandler;
