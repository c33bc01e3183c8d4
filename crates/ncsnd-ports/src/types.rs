use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of direct-sound playback slots exposed by the service.
pub const NUM_CHANNELS: usize = 4;

/// Lowest urgency a request may carry. Smaller values win.
pub const MAX_PRIORITY: u8 = 31;

pub const DIRECT_SOUND_MAX_VOLUME: i32 = 32768;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelIndex(u8);

impl ChannelIndex {
    pub const ALL: [ChannelIndex; NUM_CHANNELS] = [
        ChannelIndex(0),
        ChannelIndex(1),
        ChannelIndex(2),
        ChannelIndex(3),
    ];

    pub fn new(raw: u32) -> Option<Self> {
        if (raw as usize) < NUM_CHANNELS {
            Some(Self(raw as u8))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ChannelIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Priority(u8);

impl Priority {
    pub const HIGHEST: Priority = Priority(0);
    pub const LOWEST: Priority = Priority(MAX_PRIORITY);

    pub fn new(raw: u32) -> Option<Self> {
        if raw <= MAX_PRIORITY as u32 {
            Some(Self(raw as u8))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Strictly more urgent than `current`. Ties never preempt.
    pub fn preempts(self, current: Priority) -> bool {
        self.0 < current.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-wide set of channels the arbiter may hand out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelMask(pub u32);

impl ChannelMask {
    pub const ALL: ChannelMask = ChannelMask((1 << NUM_CHANNELS) - 1);
    pub const NONE: ChannelMask = ChannelMask(0);

    pub fn contains(self, channel: ChannelIndex) -> bool {
        self.0 & (1 << channel.get()) != 0
    }

    pub fn with(self, channel: ChannelIndex) -> Self {
        Self(self.0 | (1 << channel.get()))
    }

    pub fn without(self, channel: ChannelIndex) -> Self {
        Self(self.0 & !(1 << channel.get()))
    }

    pub fn intersect(self, other: ChannelMask) -> Self {
        Self(self.0 & other.0)
    }

    /// True when no bit outside `other` is set.
    pub fn is_subset_of(self, other: ChannelMask) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn channels(self) -> impl Iterator<Item = ChannelIndex> {
        ChannelIndex::ALL
            .into_iter()
            .filter(move |channel| self.contains(*channel))
    }
}

impl Default for ChannelMask {
    fn default() -> Self {
        Self::ALL
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AddressSpace {
    #[default]
    Virtual,
    Physical,
}

/// Address of a caller-owned sample buffer on the 32-bit console bus.
///
/// The buffer behind it is never copied or freed here; it has to stay
/// mapped until the playback it backs has stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SampleAddr(pub u32);

impl SampleAddr {
    pub const NULL: SampleAddr = SampleAddr(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SampleAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
