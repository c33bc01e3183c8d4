use crate::error::{ArbiterError, RequestDefect};
use ncsnd_ports::sound::{DirectSound, PlaybackRequest, Sound};
use ncsnd_ports::types::{ChannelIndex, ChannelMask, Priority, DIRECT_SOUND_MAX_VOLUME};

pub fn channel_in_range(raw: u32) -> Result<ChannelIndex, ArbiterError> {
    ChannelIndex::new(raw).ok_or(ArbiterError::InvalidChannel(raw))
}

pub fn admissible_channel(raw: u32, mask: ChannelMask) -> Result<ChannelIndex, ArbiterError> {
    let channel = channel_in_range(raw)?;
    if !mask.contains(channel) {
        return Err(ArbiterError::InvalidChannel(raw));
    }
    Ok(channel)
}

pub fn priority(raw: u32) -> Result<Priority, ArbiterError> {
    Priority::new(raw).ok_or(ArbiterError::InvalidPriority(raw))
}

/// Structural checks that must pass before any state changes.
pub fn validate_request(request: &PlaybackRequest) -> Result<(), RequestDefect> {
    match request {
        PlaybackRequest::DirectSound(sound) => validate_direct_sound(sound),
        PlaybackRequest::Sound(sound) => validate_sound(sound),
    }
}

pub fn validate_direct_sound(sound: &DirectSound) -> Result<(), RequestDefect> {
    let data = &sound.channel_data;
    match data.channel_amount {
        1 => {}
        2 if data.right_sample_data.is_null() => return Err(RequestDefect::MissingRightBuffer),
        2 => {}
        other => return Err(RequestDefect::UnsupportedChannelAmount(other)),
    }
    if data.left_sample_data.is_null() {
        return Err(RequestDefect::MissingSampleData);
    }
    if data.sample_data_length == 0 {
        return Err(RequestDefect::EmptySampleData);
    }
    if data.sample_rate == 0 {
        return Err(RequestDefect::ZeroSampleRate);
    }

    let mods = &sound.modifiers;
    if !(mods.speed_multiplier.is_finite() && mods.speed_multiplier > 0.0) {
        return Err(RequestDefect::InvalidSpeed(mods.speed_multiplier));
    }
    if let Some(volume) = mods
        .channel_volumes
        .iter()
        .find(|volume| !(0..=DIRECT_SOUND_MAX_VOLUME).contains(*volume))
    {
        return Err(RequestDefect::VolumeOutOfRange(*volume));
    }
    Ok(())
}

pub fn validate_sound(sound: &Sound) -> Result<(), RequestDefect> {
    if sound.sample_data.is_null() {
        return Err(RequestDefect::MissingSampleData);
    }
    if sound.total_size_bytes == 0 {
        return Err(RequestDefect::EmptySampleData);
    }
    if sound.sample_rate == 0 {
        return Err(RequestDefect::ZeroSampleRate);
    }
    validate_rate(sound.pitch)?;
    validate_mix(sound.volume, sound.pan)?;

    if sound.loop_playback {
        if sound.loop_sample_data.is_null() {
            return Err(RequestDefect::MissingLoopBuffer);
        }
        let main_start = sound.sample_data.get() as u64;
        let end = main_start + sound.total_size_bytes as u64;
        let loop_start = sound.loop_sample_data.get() as u64;
        if loop_start < main_start || loop_start >= end {
            return Err(RequestDefect::LoopOutsideBuffer {
                loop_start: sound.loop_sample_data,
                main_start: sound.sample_data,
                size: sound.total_size_bytes,
            });
        }
    }
    Ok(())
}

/// Out-of-range values are clamped by the hardware encoding; only NaN and
/// infinities are refused.
pub fn validate_mix(volume: f32, pan: f32) -> Result<(), RequestDefect> {
    if !volume.is_finite() || !pan.is_finite() {
        return Err(RequestDefect::NonFiniteMix);
    }
    Ok(())
}

pub fn validate_rate(pitch: f32) -> Result<(), RequestDefect> {
    if !(pitch.is_finite() && pitch > 0.0) {
        return Err(RequestDefect::InvalidPitch(pitch));
    }
    Ok(())
}
