use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OutputMode {
    Mono = 0,
    Stereo = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Encoding {
    Pcm8 = 0,
    Pcm16 = 1,
    ImaAdpcm = 2,
}

impl OutputMode {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Mono),
            1 => Some(Self::Stereo),
            _ => None,
        }
    }
}

impl Encoding {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Pcm8),
            1 => Some(Self::Pcm16),
            2 => Some(Self::ImaAdpcm),
            _ => None,
        }
    }
}

/// Running IMA-ADPCM decoder state: last predictor and step table index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdpcmContext {
    pub data: u16,
    pub table_index: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectSoundChannelData {
    /// 1 for mono, 2 for left/right buffers.
    pub channel_amount: u8,
    pub encoding: Encoding,
    pub left_space: AddressSpace,
    pub right_space: AddressSpace,
    pub sample_rate: u32,
    pub left_sample_data: SampleAddr,
    pub right_sample_data: SampleAddr,
    /// Size of each individual buffer in bytes.
    pub sample_data_length: u32,
    pub left_adpcm: AdpcmContext,
    pub right_adpcm: AdpcmContext,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectSoundModifiers {
    pub speed_multiplier: f32,
    /// Per-ear volume, at most [`DIRECT_SOUND_MAX_VOLUME`].
    pub channel_volumes: [i32; 2],
    // Undocumented by the service; carried through untouched.
    pub unknown0: u8,
    pub unknown1: f32,
    pub unknown2: u32,
    pub ignore_volume_slider: bool,
    pub force_speaker_output: bool,
    pub play_on_sleep: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectSound {
    pub output_mode: OutputMode,
    pub channel_data: DirectSoundChannelData,
    pub modifiers: DirectSoundModifiers,
}

impl DirectSound {
    pub fn new() -> Self {
        Self {
            output_mode: OutputMode::Stereo,
            channel_data: DirectSoundChannelData {
                channel_amount: 0,
                encoding: Encoding::Pcm8,
                left_space: AddressSpace::Virtual,
                right_space: AddressSpace::Virtual,
                sample_rate: 0,
                left_sample_data: SampleAddr::NULL,
                right_sample_data: SampleAddr::NULL,
                sample_data_length: 0,
                left_adpcm: AdpcmContext::default(),
                right_adpcm: AdpcmContext::default(),
            },
            modifiers: DirectSoundModifiers {
                speed_multiplier: 1.0,
                channel_volumes: [DIRECT_SOUND_MAX_VOLUME, DIRECT_SOUND_MAX_VOLUME],
                unknown0: 0,
                unknown1: 1.0,
                unknown2: 0,
                ignore_volume_slider: false,
                force_speaker_output: false,
                play_on_sleep: false,
            },
        }
    }

    pub fn mono(encoding: Encoding, sample_rate: u32, data: SampleAddr, length: u32) -> Self {
        let mut sound = Self::new();
        sound.channel_data.channel_amount = 1;
        sound.channel_data.encoding = encoding;
        sound.channel_data.sample_rate = sample_rate;
        sound.channel_data.left_sample_data = data;
        sound.channel_data.sample_data_length = length;
        sound
    }

    pub fn stereo(
        encoding: Encoding,
        sample_rate: u32,
        left: SampleAddr,
        right: SampleAddr,
        length: u32,
    ) -> Self {
        let mut sound = Self::mono(encoding, sample_rate, left, length);
        sound.channel_data.channel_amount = 2;
        sound.channel_data.right_sample_data = right;
        sound
    }
}

impl Default for DirectSound {
    fn default() -> Self {
        Self::new()
    }
}

/// A channel-level sound programmed register by register.
///
/// With `loop_playback` set the whole region `[sample_data, sample_data + total_size_bytes)`
/// plays once, then `[loop_sample_data, sample_data + total_size_bytes)` repeats.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sound {
    pub address_space: AddressSpace,
    pub sample_data: SampleAddr,
    pub loop_sample_data: SampleAddr,
    pub total_size_bytes: u32,
    pub encoding: Encoding,
    pub loop_playback: bool,
    pub context: AdpcmContext,
    pub loop_context: AdpcmContext,
    pub sample_rate: u32,
    /// 0.0 ..= 1.0
    pub volume: f32,
    pub pitch: f32,
    /// -1.0 (left) ..= 1.0 (right)
    pub pan: f32,
    pub linear_interpolation: bool,
}

impl Sound {
    pub fn new() -> Self {
        Self {
            address_space: AddressSpace::Virtual,
            sample_data: SampleAddr::NULL,
            loop_sample_data: SampleAddr::NULL,
            total_size_bytes: 0,
            encoding: Encoding::Pcm8,
            loop_playback: false,
            context: AdpcmContext::default(),
            loop_context: AdpcmContext::default(),
            sample_rate: 0,
            volume: 1.0,
            pitch: 1.0,
            pan: 0.0,
            linear_interpolation: true,
        }
    }

    pub fn one_shot(encoding: Encoding, sample_rate: u32, data: SampleAddr, size: u32) -> Self {
        let mut sound = Self::new();
        sound.encoding = encoding;
        sound.sample_rate = sample_rate;
        sound.sample_data = data;
        sound.total_size_bytes = size;
        sound
    }

    pub fn looped(
        encoding: Encoding,
        sample_rate: u32,
        data: SampleAddr,
        loop_start: SampleAddr,
        size: u32,
    ) -> Self {
        let mut sound = Self::one_shot(encoding, sample_rate, data, size);
        sound.loop_playback = true;
        sound.loop_sample_data = loop_start;
        sound
    }
}

impl Default for Sound {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    DirectSound,
    Sound,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum PlaybackRequest {
    DirectSound(DirectSound),
    Sound(Sound),
}

impl PlaybackRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            PlaybackRequest::DirectSound(_) => RequestKind::DirectSound,
            PlaybackRequest::Sound(_) => RequestKind::Sound,
        }
    }

    /// Channel-level sounds carry no sleep policy and always pause.
    pub fn plays_on_sleep(&self) -> bool {
        match self {
            PlaybackRequest::DirectSound(sound) => sound.modifiers.play_on_sleep,
            PlaybackRequest::Sound(_) => false,
        }
    }
}

impl From<DirectSound> for PlaybackRequest {
    fn from(sound: DirectSound) -> Self {
        PlaybackRequest::DirectSound(sound)
    }
}

impl From<Sound> for PlaybackRequest {
    fn from(sound: Sound) -> Self {
        PlaybackRequest::Sound(sound)
    }
}
