pub mod channel;
pub mod message;
pub mod state;

pub use channel::*;
pub use message::*;
pub use state::*;
