use crate::sound::{DirectSound, Sound};
use crate::types::*;
use std::fmt;

/// Opaque session token returned by the audio service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ServiceHandle(pub u32);

impl fmt::Display for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("service rejected request with result {0:#010x}")]
    Rejected(u32),
    #[error("argument out of range")]
    OutOfRange,
    #[error("stale service handle {0}")]
    StaleHandle(ServiceHandle),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Transport to the privileged audio mixing service.
///
/// Calls block until the service replies. Submitting to a channel that
/// already holds a request replaces it; silencing the replaced playback
/// is the service's job. `halt_channel` clears the channel's play state
/// (`SetPlayState 0`), the same write the service expects on stop and on
/// sleep; it does not reset the channel's registers.
pub trait CsndServicePort: Send + Sync {
    fn acquire_service_handle(&self) -> Result<ServiceHandle, ServiceError>;
    fn release_service_handle(&self, handle: ServiceHandle);

    /// Channels the service grants this process for the session.
    fn acquire_sound_channels(&self, handle: ServiceHandle) -> Result<ChannelMask, ServiceError>;
    fn release_sound_channels(&self, handle: ServiceHandle);

    fn submit_direct_sound(
        &self,
        handle: ServiceHandle,
        channel: ChannelIndex,
        priority: Priority,
        sound: &DirectSound,
    ) -> Result<(), ServiceError>;

    fn submit_sound(
        &self,
        handle: ServiceHandle,
        channel: ChannelIndex,
        sound: &Sound,
    ) -> Result<(), ServiceError>;

    fn set_pause(
        &self,
        handle: ServiceHandle,
        channel: ChannelIndex,
        paused: bool,
    ) -> Result<(), ServiceError>;

    fn halt_channel(&self, handle: ServiceHandle, channel: ChannelIndex) -> Result<(), ServiceError>;

    fn query_playing(&self, handle: ServiceHandle, channel: ChannelIndex) -> Result<bool, ServiceError>;

    fn set_volume(
        &self,
        handle: ServiceHandle,
        channel: ChannelIndex,
        volume: f32,
        pan: f32,
    ) -> Result<(), ServiceError>;

    fn set_rate(
        &self,
        handle: ServiceHandle,
        channel: ChannelIndex,
        sample_rate: u32,
        pitch: f32,
    ) -> Result<(), ServiceError>;
}
