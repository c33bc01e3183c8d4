use crate::error::WireError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CommandId {
    SetPlayStateR = 0x0,
    SetPlayState = 0x1,
    SetEncoding = 0x2,
    SetLoopBlock = 0x3,
    SetLoopMode = 0x4,
    SetBit7 = 0x5,
    SetInterp = 0x6,
    SetDuty = 0x7,
    SetTimer = 0x8,
    SetVol = 0x9,
    SetBlock = 0xA,
    SetAdpcmState = 0xB,
    SetLoopAdpcmState = 0xC,
    SetAdpcmReload = 0xD,
    SetChnParams = 0xE,
    SetChnParamsPsg = 0xF,
    SetChnParamsNoise = 0x10,
    UpdateChnInfo = 0x300,
}

impl TryFrom<u16> for CommandId {
    type Error = WireError;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        let id = match raw {
            0x0 => CommandId::SetPlayStateR,
            0x1 => CommandId::SetPlayState,
            0x2 => CommandId::SetEncoding,
            0x3 => CommandId::SetLoopBlock,
            0x4 => CommandId::SetLoopMode,
            0x5 => CommandId::SetBit7,
            0x6 => CommandId::SetInterp,
            0x7 => CommandId::SetDuty,
            0x8 => CommandId::SetTimer,
            0x9 => CommandId::SetVol,
            0xA => CommandId::SetBlock,
            0xB => CommandId::SetAdpcmState,
            0xC => CommandId::SetLoopAdpcmState,
            0xD => CommandId::SetAdpcmReload,
            0xE => CommandId::SetChnParams,
            0xF => CommandId::SetChnParamsPsg,
            0x10 => CommandId::SetChnParamsNoise,
            0x300 => CommandId::UpdateChnInfo,
            other => return Err(WireError::UnknownCommand(other)),
        };
        Ok(id)
    }
}

pub const COMMAND_PARAM_WORDS: usize = 6;

/// Commands this driver emits, with their parameter words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Stops the channel and resets its registers.
    SetPlayStateR { channel: u8, value: u32 },
    /// 0 pauses, 1 resumes without touching the registers.
    SetPlayState { channel: u8, value: u32 },
    SetBlock {
        channel: u8,
        loop_block: bool,
        phys_addr: u32,
        size: u32,
    },
    SetTimer { channel: u8, timer: u32 },
    SetVol {
        channel: u8,
        chn_volumes: u32,
        cap_volumes: u32,
    },
    SetAdpcmState {
        channel: u8,
        loop_block: bool,
        sample: u16,
        index: u8,
    },
    SetChnParams {
        flags: u32,
        chn_volumes: u32,
        cap_volumes: u32,
        phys_addr0: u32,
        phys_addr1: u32,
        total_size: u32,
    },
    UpdateChnInfo,
}

impl Command {
    pub fn id(&self) -> CommandId {
        match self {
            Command::SetPlayStateR { .. } => CommandId::SetPlayStateR,
            Command::SetPlayState { .. } => CommandId::SetPlayState,
            Command::SetBlock { loop_block: true, .. } => CommandId::SetLoopBlock,
            Command::SetBlock { .. } => CommandId::SetBlock,
            Command::SetTimer { .. } => CommandId::SetTimer,
            Command::SetVol { .. } => CommandId::SetVol,
            Command::SetAdpcmState { loop_block: true, .. } => CommandId::SetLoopAdpcmState,
            Command::SetAdpcmState { .. } => CommandId::SetAdpcmState,
            Command::SetChnParams { .. } => CommandId::SetChnParams,
            Command::UpdateChnInfo => CommandId::UpdateChnInfo,
        }
    }

    pub fn params(&self) -> [u32; COMMAND_PARAM_WORDS] {
        let mut p = [0u32; COMMAND_PARAM_WORDS];
        match *self {
            Command::SetPlayStateR { channel, value } | Command::SetPlayState { channel, value } => {
                p[0] = channel_bits(channel);
                p[1] = value;
            }
            Command::SetBlock {
                channel,
                phys_addr,
                size,
                ..
            } => {
                p[0] = channel_bits(channel);
                p[1] = phys_addr;
                p[2] = size;
            }
            Command::SetTimer { channel, timer } => {
                p[0] = channel_bits(channel);
                p[1] = timer;
            }
            Command::SetVol {
                channel,
                chn_volumes,
                cap_volumes,
            } => {
                p[0] = channel_bits(channel);
                p[1] = chn_volumes;
                p[2] = cap_volumes;
            }
            Command::SetAdpcmState {
                channel,
                sample,
                index,
                ..
            } => {
                p[0] = channel_bits(channel);
                p[1] = sample as u32;
                p[2] = (index & 0x7F) as u32;
            }
            Command::SetChnParams {
                flags,
                chn_volumes,
                cap_volumes,
                phys_addr0,
                phys_addr1,
                total_size,
            } => {
                p[0] = flags;
                p[1] = chn_volumes;
                p[2] = cap_volumes;
                p[3] = phys_addr0;
                p[4] = phys_addr1;
                p[5] = total_size;
            }
            Command::UpdateChnInfo => {}
        }
        p
    }

    pub fn decode(id: CommandId, p: &[u32; COMMAND_PARAM_WORDS]) -> Result<Self, WireError> {
        let channel = (p[0] & 0x1F) as u8;
        let command = match id {
            CommandId::SetPlayStateR => Command::SetPlayStateR { channel, value: p[1] },
            CommandId::SetPlayState => Command::SetPlayState { channel, value: p[1] },
            CommandId::SetBlock | CommandId::SetLoopBlock => Command::SetBlock {
                channel,
                loop_block: id == CommandId::SetLoopBlock,
                phys_addr: p[1],
                size: p[2],
            },
            CommandId::SetTimer => Command::SetTimer { channel, timer: p[1] },
            CommandId::SetVol => Command::SetVol {
                channel,
                chn_volumes: p[1],
                cap_volumes: p[2],
            },
            CommandId::SetAdpcmState | CommandId::SetLoopAdpcmState => Command::SetAdpcmState {
                channel,
                loop_block: id == CommandId::SetLoopAdpcmState,
                sample: (p[1] & 0xFFFF) as u16,
                index: (p[2] & 0x7F) as u8,
            },
            CommandId::SetChnParams => Command::SetChnParams {
                flags: p[0],
                chn_volumes: p[1],
                cap_volumes: p[2],
                phys_addr0: p[3],
                phys_addr1: p[4],
                total_size: p[5],
            },
            CommandId::UpdateChnInfo => Command::UpdateChnInfo,
            other => return Err(WireError::UnsupportedCommand(other)),
        };
        Ok(command)
    }
}

fn channel_bits(channel: u8) -> u32 {
    (channel as u32) & 0x1F
}
