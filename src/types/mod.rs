pub mod form;
pub mod metrics;

pub use form::*;
pub use metrics::*;
