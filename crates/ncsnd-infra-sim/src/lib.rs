mod faults;
mod hooks;
mod service;
mod voice;

pub use faults::SimOp;
pub use hooks::SimSleepHooks;
pub use service::SimCsndService;
pub use voice::{ChannelRegisters, DirectVoice, Voice};
