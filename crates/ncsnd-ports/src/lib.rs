pub mod power;
pub mod service;
pub mod settings;
pub mod sound;
pub mod types;

pub use power::*;
pub use service::*;
pub use settings::*;
pub use sound::*;
pub use types::*;
