use ncsnd_ports::sound::Encoding;
use ncsnd_ports::types::ChannelIndex;

/// Clock the channel timers divide down from.
pub const TIMER_CLOCK: u32 = 0x03FE_C3FC;
pub const TIMER_MIN: u32 = 0x0042;
pub const TIMER_MAX: u32 = 0xFFFF;

pub const FLAG_LINEAR_INTERP: u32 = 1 << 6;
pub const FLAG_ENABLE: u32 = 1 << 14;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum LoopMode {
    Manual = 0,
    Normal = 1,
    OneShot = 2,
    NoReload = 3,
}

/// Channel timer for an effective playback rate, clamped to the register range.
pub fn timer_for_rate(sample_rate: u32, pitch: f32) -> u32 {
    let rate = (sample_rate as f32 * pitch) as u32;
    if rate == 0 {
        return TIMER_MAX;
    }
    (TIMER_CLOCK / rate).clamp(TIMER_MIN, TIMER_MAX)
}

/// Left volume in the low half, right in the high half, each out of 0x8000.
pub fn pack_volume(volume: f32, pan: f32) -> u32 {
    let volume = clamp_unit(volume);
    let right_share = clamp_unit((pan + 1.0) / 2.0);

    let left = (volume * (1.0 - right_share) * 32768.0) as u32;
    let right = (volume * right_share * 32768.0) as u32;
    left | (right << 16)
}

pub fn unpack_volume(packed: u32) -> (u16, u16) {
    ((packed & 0xFFFF) as u16, (packed >> 16) as u16)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelFlags {
    pub channel: u8,
    pub encoding: Encoding,
    pub loop_mode: LoopMode,
    pub linear_interpolation: bool,
    pub timer: u32,
}

impl ChannelFlags {
    pub fn new(channel: ChannelIndex, encoding: Encoding, looping: bool, interp: bool, timer: u32) -> Self {
        Self {
            channel: channel.get(),
            encoding,
            loop_mode: if looping {
                LoopMode::Normal
            } else {
                LoopMode::OneShot
            },
            linear_interpolation: interp,
            timer,
        }
    }

    pub fn to_bits(self) -> u32 {
        let mut flags = FLAG_ENABLE;
        flags |= (self.channel as u32) & 0x1F;
        flags |= (self.loop_mode as u32) << 10;
        flags |= (self.encoding as u32) << 12;
        if self.linear_interpolation {
            flags |= FLAG_LINEAR_INTERP;
        }
        flags | (self.timer << 16)
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        let loop_mode = match (bits >> 10) & 0x3 {
            0 => LoopMode::Manual,
            1 => LoopMode::Normal,
            2 => LoopMode::OneShot,
            _ => LoopMode::NoReload,
        };
        Some(Self {
            channel: (bits & 0x1F) as u8,
            encoding: Encoding::from_raw(((bits >> 12) & 0x3) as u8)?,
            loop_mode,
            linear_interpolation: bits & FLAG_LINEAR_INTERP != 0,
            timer: bits >> 16,
        })
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
