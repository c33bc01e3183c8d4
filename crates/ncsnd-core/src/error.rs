use ncsnd_ports::service::ServiceError;
use ncsnd_ports::types::{ChannelIndex, Priority, SampleAddr};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RequestDefect {
    #[error("unsupported channel amount {0}")]
    UnsupportedChannelAmount(u8),
    #[error("stereo sound without a right buffer")]
    MissingRightBuffer,
    #[error("no sample data")]
    MissingSampleData,
    #[error("sample data length is zero")]
    EmptySampleData,
    #[error("sample rate is zero")]
    ZeroSampleRate,
    #[error("speed multiplier {0} is not a positive finite number")]
    InvalidSpeed(f32),
    #[error("channel volume {0} outside 0..=32768")]
    VolumeOutOfRange(i32),
    #[error("pitch {0} is not a positive finite number")]
    InvalidPitch(f32),
    #[error("volume or pan is not finite")]
    NonFiniteMix,
    #[error("looped sound without a loop buffer")]
    MissingLoopBuffer,
    #[error("loop start {loop_start} outside [{main_start}, +{size:#x})")]
    LoopOutsideBuffer {
        loop_start: SampleAddr,
        main_start: SampleAddr,
        size: u32,
    },
    #[error("direct sound mixing is owned by the service")]
    NotAdjustable,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ArbiterError {
    #[error("audio service unavailable: {0}")]
    ServiceUnavailable(#[source] ServiceError),
    #[error("arbiter already initialized")]
    AlreadyInitialized,
    #[error("arbiter not initialized")]
    NotInitialized,
    #[error("invalid channel {0}")]
    InvalidChannel(u32),
    #[error("invalid priority {0}")]
    InvalidPriority(u32),
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestDefect),
    #[error("channel {channel} busy at priority {current}")]
    ChannelBusy {
        channel: ChannelIndex,
        current: Priority,
    },
    #[error("transport error: {0}")]
    TransportError(#[source] ServiceError),
}

impl ArbiterError {
    /// Lifecycle errors come from calling out of order, not from the request.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            ArbiterError::NotInitialized
                | ArbiterError::AlreadyInitialized
                | ArbiterError::ServiceUnavailable(_)
        )
    }
}
