pub mod arbiter;
pub mod channel;
pub mod error;
mod sleep;
pub mod validate;

pub use arbiter::*;
pub use channel::*;
pub use error::*;
pub use validate::*;
