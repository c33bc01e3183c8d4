pub mod address;
pub mod command;
pub mod direct_sound;
pub mod error;
pub mod memory;
pub mod params;
pub mod ring;
pub mod sound;

pub use address::*;
pub use command::*;
pub use direct_sound::*;
pub use error::*;
pub use memory::*;
pub use params::*;
pub use ring::*;
pub use sound::*;
