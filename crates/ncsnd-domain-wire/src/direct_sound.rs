use crate::address::AddressTranslator;
use crate::error::{ensure_len, WireError};
use byteorder::{ByteOrder, LittleEndian};
use ncsnd_ports::sound::*;
use ncsnd_ports::types::{AddressSpace, SampleAddr};

/// Size of the direct sound block shared with the service.
pub const DIRECT_SOUND_SIZE: usize = 60;

// Header.
const OFF_ALWAYS0: usize = 0;
const OFF_OUTPUT_MODE: usize = 1;

// Channel data block (28 bytes at 4).
const OFF_CHANNEL_AMOUNT: usize = 4;
const OFF_ENCODING: usize = 5;
const OFF_LEFT_PHYS: usize = 6;
const OFF_RIGHT_PHYS: usize = 7;
const OFF_SAMPLE_RATE: usize = 8;
const OFF_LEFT_DATA: usize = 12;
const OFF_RIGHT_DATA: usize = 16;
const OFF_DATA_LENGTH: usize = 20;
const OFF_LEFT_ADPCM: usize = 24;
const OFF_RIGHT_ADPCM: usize = 28;

// Modifiers block (28 bytes at 32).
const OFF_SPEED: usize = 32;
const OFF_VOLUMES: usize = 36;
const OFF_UNKNOWN0: usize = 44;
const OFF_UNKNOWN1: usize = 48;
const OFF_UNKNOWN2: usize = 52;
const OFF_IGNORE_SLIDER: usize = 56;
const OFF_FORCE_SPEAKER: usize = 57;
const OFF_PLAY_ON_SLEEP: usize = 58;

/// Lays out a direct sound exactly as the service reads it.
///
/// Padding bytes are written as zero.
pub fn encode_direct_sound(sound: &DirectSound) -> [u8; DIRECT_SOUND_SIZE] {
    let mut buf = [0u8; DIRECT_SOUND_SIZE];
    let data = &sound.channel_data;
    let mods = &sound.modifiers;

    buf[OFF_ALWAYS0] = 0;
    buf[OFF_OUTPUT_MODE] = sound.output_mode as u8;

    buf[OFF_CHANNEL_AMOUNT] = data.channel_amount;
    buf[OFF_ENCODING] = data.encoding as u8;
    buf[OFF_LEFT_PHYS] = phys_flag(data.left_space);
    buf[OFF_RIGHT_PHYS] = phys_flag(data.right_space);
    LittleEndian::write_u32(&mut buf[OFF_SAMPLE_RATE..], data.sample_rate);
    LittleEndian::write_u32(&mut buf[OFF_LEFT_DATA..], data.left_sample_data.get());
    LittleEndian::write_u32(&mut buf[OFF_RIGHT_DATA..], data.right_sample_data.get());
    LittleEndian::write_u32(&mut buf[OFF_DATA_LENGTH..], data.sample_data_length);
    write_adpcm(&mut buf[OFF_LEFT_ADPCM..], data.left_adpcm);
    write_adpcm(&mut buf[OFF_RIGHT_ADPCM..], data.right_adpcm);

    LittleEndian::write_f32(&mut buf[OFF_SPEED..], mods.speed_multiplier);
    LittleEndian::write_i32(&mut buf[OFF_VOLUMES..], mods.channel_volumes[0]);
    LittleEndian::write_i32(&mut buf[OFF_VOLUMES + 4..], mods.channel_volumes[1]);
    buf[OFF_UNKNOWN0] = mods.unknown0;
    LittleEndian::write_f32(&mut buf[OFF_UNKNOWN1..], mods.unknown1);
    LittleEndian::write_u32(&mut buf[OFF_UNKNOWN2..], mods.unknown2);
    buf[OFF_IGNORE_SLIDER] = mods.ignore_volume_slider as u8;
    buf[OFF_FORCE_SPEAKER] = mods.force_speaker_output as u8;
    buf[OFF_PLAY_ON_SLEEP] = mods.play_on_sleep as u8;

    buf
}

pub fn decode_direct_sound(buf: &[u8]) -> Result<DirectSound, WireError> {
    ensure_len(buf, DIRECT_SOUND_SIZE)?;

    if buf[OFF_ALWAYS0] != 0 {
        return Err(WireError::InvalidField("always0"));
    }
    let output_mode =
        OutputMode::from_raw(buf[OFF_OUTPUT_MODE]).ok_or(WireError::InvalidField("output_mode"))?;
    let encoding =
        Encoding::from_raw(buf[OFF_ENCODING]).ok_or(WireError::InvalidField("encoding"))?;

    Ok(DirectSound {
        output_mode,
        channel_data: DirectSoundChannelData {
            channel_amount: buf[OFF_CHANNEL_AMOUNT],
            encoding,
            left_space: space_from_flag(buf[OFF_LEFT_PHYS]),
            right_space: space_from_flag(buf[OFF_RIGHT_PHYS]),
            sample_rate: LittleEndian::read_u32(&buf[OFF_SAMPLE_RATE..]),
            left_sample_data: SampleAddr(LittleEndian::read_u32(&buf[OFF_LEFT_DATA..])),
            right_sample_data: SampleAddr(LittleEndian::read_u32(&buf[OFF_RIGHT_DATA..])),
            sample_data_length: LittleEndian::read_u32(&buf[OFF_DATA_LENGTH..]),
            left_adpcm: read_adpcm(&buf[OFF_LEFT_ADPCM..]),
            right_adpcm: read_adpcm(&buf[OFF_RIGHT_ADPCM..]),
        },
        modifiers: DirectSoundModifiers {
            speed_multiplier: LittleEndian::read_f32(&buf[OFF_SPEED..]),
            channel_volumes: [
                LittleEndian::read_i32(&buf[OFF_VOLUMES..]),
                LittleEndian::read_i32(&buf[OFF_VOLUMES + 4..]),
            ],
            unknown0: buf[OFF_UNKNOWN0],
            unknown1: LittleEndian::read_f32(&buf[OFF_UNKNOWN1..]),
            unknown2: LittleEndian::read_u32(&buf[OFF_UNKNOWN2..]),
            ignore_volume_slider: buf[OFF_IGNORE_SLIDER] != 0,
            force_speaker_output: buf[OFF_FORCE_SPEAKER] != 0,
            play_on_sleep: buf[OFF_PLAY_ON_SLEEP] != 0,
        },
    })
}

/// Produces the image handed to the service: every buffer address physical.
///
/// The service always reads the addresses as physical, so both phys flags
/// go out as zero the way system applets send them. A mono sound sends
/// a null right buffer whatever the request carried.
pub fn service_image(
    sound: &DirectSound,
    translator: &dyn AddressTranslator,
) -> Result<[u8; DIRECT_SOUND_SIZE], WireError> {
    let mut prepared = *sound;
    let data = &mut prepared.channel_data;

    data.left_sample_data = to_physical(translator, data.left_space, data.left_sample_data)?;
    data.right_sample_data = if data.channel_amount == 2 {
        to_physical(translator, data.right_space, data.right_sample_data)?
    } else {
        SampleAddr::NULL
    };
    data.left_space = AddressSpace::Virtual;
    data.right_space = AddressSpace::Virtual;

    Ok(encode_direct_sound(&prepared))
}

pub(crate) fn to_physical(
    translator: &dyn AddressTranslator,
    space: AddressSpace,
    addr: SampleAddr,
) -> Result<SampleAddr, WireError> {
    match space {
        AddressSpace::Physical => Ok(addr),
        AddressSpace::Virtual if addr.is_null() => Ok(addr),
        AddressSpace::Virtual => translator.virt_to_phys(addr),
    }
}

fn phys_flag(space: AddressSpace) -> u8 {
    match space {
        AddressSpace::Virtual => 0,
        AddressSpace::Physical => 1,
    }
}

fn space_from_flag(flag: u8) -> AddressSpace {
    if flag != 0 {
        AddressSpace::Physical
    } else {
        AddressSpace::Virtual
    }
}

fn write_adpcm(buf: &mut [u8], context: AdpcmContext) {
    LittleEndian::write_u16(buf, context.data);
    buf[2] = context.table_index;
    buf[3] = 0;
}

fn read_adpcm(buf: &[u8]) -> AdpcmContext {
    AdpcmContext {
        data: LittleEndian::read_u16(buf),
        table_index: buf[2],
    }
}
