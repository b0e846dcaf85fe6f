pub mod messages;
pub mod player;
pub mod settings;

// Re-export important types
pub use messages::*;
pub use player::*;
pub use settings::*;
