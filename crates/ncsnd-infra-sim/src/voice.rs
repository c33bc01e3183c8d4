use ncsnd_domain_wire::{ChannelFlags, Command, FLAG_ENABLE};
use ncsnd_ports::sound::{AdpcmContext, DirectSound};
use ncsnd_ports::types::Priority;

/// Register file of one simulated channel, as programmed by commands.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChannelRegisters {
    pub flags: Option<ChannelFlags>,
    pub timer: u32,
    pub chn_volumes: u32,
    pub cap_volumes: u32,
    pub main_addr: u32,
    pub loop_addr: u32,
    pub total_size: u32,
    pub main_block: Option<(u32, u32)>,
    pub loop_block: Option<(u32, u32)>,
    pub adpcm: Option<AdpcmContext>,
    pub loop_adpcm: Option<AdpcmContext>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectVoice {
    pub sound: DirectSound,
    pub priority: Priority,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Voice {
    pub registers: ChannelRegisters,
    pub direct: Option<DirectVoice>,
    pub active: bool,
    pub paused: bool,
}

impl Voice {
    pub fn is_bound(&self) -> bool {
        self.direct.is_some() || self.registers.flags.is_some()
    }

    pub(crate) fn reset(&mut self) {
        *self = Voice::default();
    }

    pub(crate) fn start_direct(&mut self, sound: DirectSound, priority: Priority) {
        self.reset();
        self.direct = Some(DirectVoice { sound, priority });
        self.active = true;
    }

    /// Applies one channel command. `UpdateChnInfo` is handled by the service.
    pub(crate) fn apply(&mut self, command: &Command) {
        match *command {
            Command::SetPlayStateR { value, .. } => {
                self.reset();
                self.active = value != 0;
            }
            Command::SetPlayState { value: 0, .. } => {
                if self.active {
                    self.active = false;
                    self.paused = true;
                }
            }
            Command::SetPlayState { .. } => {
                if self.paused || (!self.active && self.is_bound()) {
                    self.paused = false;
                    self.active = true;
                }
            }
            Command::SetBlock {
                loop_block,
                phys_addr,
                size,
                ..
            } => {
                if loop_block {
                    self.registers.loop_block = Some((phys_addr, size));
                } else {
                    self.registers.main_block = Some((phys_addr, size));
                }
            }
            Command::SetTimer { timer, .. } => self.registers.timer = timer,
            Command::SetVol {
                chn_volumes,
                cap_volumes,
                ..
            } => {
                self.registers.chn_volumes = chn_volumes;
                self.registers.cap_volumes = cap_volumes;
            }
            Command::SetAdpcmState {
                loop_block,
                sample,
                index,
                ..
            } => {
                let context = AdpcmContext {
                    data: sample,
                    table_index: index,
                };
                if loop_block {
                    self.registers.loop_adpcm = Some(context);
                } else {
                    self.registers.adpcm = Some(context);
                }
            }
            Command::SetChnParams {
                flags,
                chn_volumes,
                cap_volumes,
                phys_addr0,
                phys_addr1,
                total_size,
            } => {
                self.direct = None;
                self.registers.flags = ChannelFlags::from_bits(flags);
                self.registers.timer = flags >> 16;
                self.registers.chn_volumes = chn_volumes;
                self.registers.cap_volumes = cap_volumes;
                self.registers.main_addr = phys_addr0;
                self.registers.loop_addr = phys_addr1;
                self.registers.total_size = total_size;
                self.registers.main_block = Some((phys_addr0, total_size));
                self.registers.loop_block = None;
                self.active = flags & FLAG_ENABLE != 0;
                self.paused = false;
            }
            Command::UpdateChnInfo => {}
        }
    }
}
