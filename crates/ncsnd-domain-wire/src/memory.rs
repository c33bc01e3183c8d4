use crate::direct_sound::DIRECT_SOUND_SIZE;
use crate::error::{ensure_len, WireError};
use crate::ring::DEFAULT_COMMAND_BLOCK_SIZE;
use byteorder::{ByteOrder, LittleEndian};
use ncsnd_ports::types::{ChannelIndex, ChannelMask};

/// Hardware channels the service reports status for.
pub const HW_CHANNEL_COUNT: u32 = 32;
pub const CHANNEL_INFO_SIZE: u32 = 12;
const CAPTURE_INFO_SIZE: u32 = 8;
const CAPTURE_UNITS: u32 = 2;
const SEMAPHORE_BLOCK_SIZE: u32 = 8;

/// Offsets the service is told about when the session starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SharedMemLayout {
    /// Command ring size; the ring starts at offset 0.
    pub command_block_size: u32,
    /// DSP semaphore and irq flags, channel info, capture info, direct sound.
    pub offsets: [u32; 4],
    pub total_size: u32,
}

impl SharedMemLayout {
    pub fn new(command_block_size: u32) -> Self {
        let semaphores = command_block_size;
        let channel_info = semaphores + SEMAPHORE_BLOCK_SIZE;
        let capture_info = channel_info + HW_CHANNEL_COUNT * CHANNEL_INFO_SIZE;
        let direct_sound = capture_info + CAPTURE_UNITS * CAPTURE_INFO_SIZE;
        Self {
            command_block_size,
            offsets: [semaphores, channel_info, capture_info, direct_sound],
            total_size: direct_sound + DIRECT_SOUND_SIZE as u32,
        }
    }

    pub fn channel_info_offset(&self, slot: u32) -> usize {
        (self.offsets[1] + slot * CHANNEL_INFO_SIZE) as usize
    }

    pub fn direct_sound_offset(&self) -> usize {
        self.offsets[3] as usize
    }
}

impl Default for SharedMemLayout {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_BLOCK_SIZE)
    }
}

/// Status records are packed: only enabled channels get a slot.
pub fn channel_info_slot(channel: ChannelIndex, mask: ChannelMask) -> u32 {
    let below = (1u32 << channel.get()) - 1;
    (below & mask.0).count_ones()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ChannelInfo {
    pub active: bool,
    pub adpcm_sample: i16,
    pub adpcm_index: u8,
}

impl ChannelInfo {
    pub fn write(&self, buf: &mut [u8]) -> Result<(), WireError> {
        ensure_len(buf, CHANNEL_INFO_SIZE as usize)?;
        buf[..CHANNEL_INFO_SIZE as usize].fill(0);
        buf[0] = self.active as u8;
        LittleEndian::write_i16(&mut buf[4..], self.adpcm_sample);
        buf[6] = self.adpcm_index;
        Ok(())
    }

    pub fn read(buf: &[u8]) -> Result<Self, WireError> {
        ensure_len(buf, CHANNEL_INFO_SIZE as usize)?;
        Ok(Self {
            active: buf[0] != 0,
            adpcm_sample: LittleEndian::read_i16(&buf[4..]),
            adpcm_index: buf[6],
        })
    }
}
