use crate::faults::{Faults, SimOp};
use crate::voice::Voice;
use ncsnd_domain_wire::{
    channel_info_slot, decode_direct_sound, is_batch_done, mark_batch_done, pack_volume,
    read_chain, service_image, sound_commands, timer_for_rate, AddressTranslator, ChannelInfo,
    Command, CommandRing, LinearHeapTranslator, SharedMemLayout, WireError, DIRECT_SOUND_SIZE,
};
use ncsnd_ports::service::{CsndServicePort, ServiceError, ServiceHandle};
use ncsnd_ports::sound::{DirectSound, Sound};
use ncsnd_ports::types::{ChannelIndex, ChannelMask, Priority, MAX_PRIORITY, NUM_CHANNELS};
use parking_lot::Mutex;
use tracing::{debug, trace};

/// Software CSND: both the client half (command ring, shared memory image)
/// and the service half (register file) in one process.
pub struct SimCsndService {
    inner: Mutex<Inner>,
    translator: Box<dyn AddressTranslator>,
}

struct Inner {
    session: Option<ServiceHandle>,
    next_handle: u32,
    granted: ChannelMask,
    channels_acquired: bool,
    layout: SharedMemLayout,
    shared_mem: Vec<u8>,
    ring: CommandRing,
    voices: [Voice; NUM_CHANNELS],
    faults: Faults,
    executed: Vec<Command>,
}

impl SimCsndService {
    pub fn new() -> Self {
        Self::with_translator(Box::new(LinearHeapTranslator))
    }

    pub fn with_translator(translator: Box<dyn AddressTranslator>) -> Self {
        let layout = SharedMemLayout::default();
        Self {
            inner: Mutex::new(Inner {
                session: None,
                next_handle: 0x100,
                granted: ChannelMask::ALL,
                channels_acquired: false,
                layout,
                shared_mem: vec![0; layout.total_size as usize],
                ring: CommandRing::new(layout.command_block_size),
                voices: [Voice::default(); NUM_CHANNELS],
                faults: Faults::default(),
                executed: Vec::new(),
            }),
            translator,
        }
    }

    pub fn fail_next(&self, op: SimOp, err: ServiceError) {
        self.inner.lock().faults.push(op, err);
    }

    pub fn set_granted_channels(&self, mask: ChannelMask) {
        self.inner.lock().granted = mask;
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().session.is_some()
    }

    pub fn channels_acquired(&self) -> bool {
        self.inner.lock().channels_acquired
    }

    pub fn voice(&self, channel: ChannelIndex) -> Voice {
        self.inner.lock().voices[channel.as_usize()]
    }

    /// Marks the channel's playback as having reached its end.
    pub fn finish_playback(&self, channel: ChannelIndex) {
        let mut inner = self.inner.lock();
        let voice = &mut inner.voices[channel.as_usize()];
        voice.active = false;
        voice.paused = false;
    }

    pub fn executed_commands(&self) -> Vec<Command> {
        self.inner.lock().executed.clone()
    }

    pub fn clear_command_log(&self) {
        self.inner.lock().executed.clear();
    }

    pub fn layout(&self) -> SharedMemLayout {
        self.inner.lock().layout
    }

    pub fn shared_memory(&self) -> Vec<u8> {
        self.inner.lock().shared_mem.clone()
    }

    fn run(
        &self,
        handle: ServiceHandle,
        op: SimOp,
        commands: &[Command],
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock();
        inner.begin(handle, op)?;
        for command in commands {
            inner.push(command)?;
        }
        inner.flush()
    }
}

impl Default for SimCsndService {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn begin(&mut self, handle: ServiceHandle, op: SimOp) -> Result<(), ServiceError> {
        match self.session {
            Some(current) if current == handle => {}
            _ => return Err(ServiceError::StaleHandle(handle)),
        }
        self.faults.take(op)
    }

    fn push(&mut self, command: &Command) -> Result<(), ServiceError> {
        let Inner { ring, shared_mem, .. } = self;
        ring.push(shared_mem, command).map_err(wire_error)
    }

    fn flush(&mut self) -> Result<(), ServiceError> {
        let Some(start) = self.ring.take_batch() else {
            return Ok(());
        };
        self.execute(start)?;
        if !is_batch_done(&self.shared_mem, start) {
            return Err(ServiceError::Backend(format!(
                "command batch at {start:#x} not acknowledged"
            )));
        }
        Ok(())
    }

    /// Service side of `ExecuteCommands`.
    fn execute(&mut self, start: u32) -> Result<(), ServiceError> {
        let commands =
            read_chain(&self.shared_mem, self.layout.command_block_size, start).map_err(wire_error)?;
        for command in &commands {
            trace!(?command, "executing csnd command");
            match command {
                Command::UpdateChnInfo => self.publish_channel_info()?,
                Command::SetChnParams { flags, .. } => self.voice_mut(flags & 0x1F)?.apply(command),
                Command::SetPlayStateR { channel, .. }
                | Command::SetPlayState { channel, .. }
                | Command::SetBlock { channel, .. }
                | Command::SetTimer { channel, .. }
                | Command::SetVol { channel, .. }
                | Command::SetAdpcmState { channel, .. } => {
                    self.voice_mut(*channel as u32)?.apply(command)
                }
            }
        }
        self.executed.extend(commands);
        mark_batch_done(&mut self.shared_mem, start);
        Ok(())
    }

    fn voice_mut(&mut self, channel: u32) -> Result<&mut Voice, ServiceError> {
        self.voices
            .get_mut(channel as usize)
            .ok_or(ServiceError::OutOfRange)
    }

    fn publish_channel_info(&mut self) -> Result<(), ServiceError> {
        for channel in self.granted.channels() {
            let voice = self.voices[channel.as_usize()];
            let info = ChannelInfo {
                active: voice.active,
                adpcm_sample: voice.registers.adpcm.map(|c| c.data as i16).unwrap_or(0),
                adpcm_index: voice.registers.adpcm.map(|c| c.table_index).unwrap_or(0),
            };
            let offset = self
                .layout
                .channel_info_offset(channel_info_slot(channel, self.granted));
            info.write(&mut self.shared_mem[offset..]).map_err(wire_error)?;
        }
        Ok(())
    }

    fn read_channel_info(&self, channel: ChannelIndex) -> Result<ChannelInfo, ServiceError> {
        let offset = self
            .layout
            .channel_info_offset(channel_info_slot(channel, self.granted));
        ChannelInfo::read(&self.shared_mem[offset..]).map_err(wire_error)
    }
}

impl CsndServicePort for SimCsndService {
    fn acquire_service_handle(&self) -> Result<ServiceHandle, ServiceError> {
        let mut inner = self.inner.lock();
        inner.faults.take(SimOp::Acquire)?;
        if inner.session.is_some() {
            return Err(ServiceError::Unavailable("session already open".to_string()));
        }

        let handle = ServiceHandle(inner.next_handle);
        inner.next_handle += 1;
        inner.session = Some(handle);
        inner.shared_mem.fill(0);
        inner.ring = CommandRing::new(inner.layout.command_block_size);
        inner.voices = [Voice::default(); NUM_CHANNELS];
        debug!(%handle, size = inner.layout.total_size, "sim csnd session opened");
        Ok(handle)
    }

    fn release_service_handle(&self, handle: ServiceHandle) {
        let mut inner = self.inner.lock();
        if inner.session != Some(handle) {
            return;
        }
        inner.session = None;
        inner.channels_acquired = false;
        inner.voices = [Voice::default(); NUM_CHANNELS];
        debug!(%handle, "sim csnd session closed");
    }

    fn acquire_sound_channels(&self, handle: ServiceHandle) -> Result<ChannelMask, ServiceError> {
        let mut inner = self.inner.lock();
        inner.begin(handle, SimOp::AcquireChannels)?;
        inner.channels_acquired = true;
        debug!(%handle, granted = inner.granted.0, "sim csnd channels acquired");
        Ok(inner.granted)
    }

    fn release_sound_channels(&self, handle: ServiceHandle) {
        let mut inner = self.inner.lock();
        if inner.session != Some(handle) {
            return;
        }
        inner.channels_acquired = false;
        debug!(%handle, "sim csnd channels released");
    }

    fn submit_direct_sound(
        &self,
        handle: ServiceHandle,
        channel: ChannelIndex,
        priority: Priority,
        sound: &DirectSound,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock();
        inner.begin(handle, SimOp::SubmitDirectSound)?;
        if channel.as_usize() >= NUM_CHANNELS || priority.get() > MAX_PRIORITY {
            return Err(ServiceError::OutOfRange);
        }

        let image = service_image(sound, self.translator.as_ref()).map_err(wire_error)?;
        let offset = inner.layout.direct_sound_offset();
        inner.shared_mem[offset..offset + DIRECT_SOUND_SIZE].copy_from_slice(&image);

        // Service side of PlaySoundDirectly reads the block back.
        let decoded = decode_direct_sound(&inner.shared_mem[offset..]).map_err(wire_error)?;
        inner.voices[channel.as_usize()].start_direct(decoded, priority);
        debug!(%channel, %priority, "sim direct sound started");
        Ok(())
    }

    fn submit_sound(
        &self,
        handle: ServiceHandle,
        channel: ChannelIndex,
        sound: &Sound,
    ) -> Result<(), ServiceError> {
        let commands =
            sound_commands(channel, sound, self.translator.as_ref()).map_err(wire_error)?;
        self.run(handle, SimOp::SubmitSound, &commands)
    }

    fn set_pause(
        &self,
        handle: ServiceHandle,
        channel: ChannelIndex,
        paused: bool,
    ) -> Result<(), ServiceError> {
        let command = Command::SetPlayState {
            channel: channel.get(),
            value: if paused { 0 } else { 1 },
        };
        self.run(handle, SimOp::SetPause, &[command])
    }

    fn halt_channel(&self, handle: ServiceHandle, channel: ChannelIndex) -> Result<(), ServiceError> {
        let command = Command::SetPlayState {
            channel: channel.get(),
            value: 0,
        };
        self.run(handle, SimOp::Halt, &[command])
    }

    fn query_playing(&self, handle: ServiceHandle, channel: ChannelIndex) -> Result<bool, ServiceError> {
        let mut inner = self.inner.lock();
        inner.begin(handle, SimOp::QueryPlaying)?;
        if !inner.granted.contains(channel) {
            return Ok(false);
        }
        inner.push(&Command::UpdateChnInfo)?;
        inner.flush()?;
        Ok(inner.read_channel_info(channel)?.active)
    }

    fn set_volume(
        &self,
        handle: ServiceHandle,
        channel: ChannelIndex,
        volume: f32,
        pan: f32,
    ) -> Result<(), ServiceError> {
        let volumes = pack_volume(volume, pan);
        let command = Command::SetVol {
            channel: channel.get(),
            chn_volumes: volumes,
            cap_volumes: volumes,
        };
        self.run(handle, SimOp::SetVolume, &[command])
    }

    fn set_rate(
        &self,
        handle: ServiceHandle,
        channel: ChannelIndex,
        sample_rate: u32,
        pitch: f32,
    ) -> Result<(), ServiceError> {
        let command = Command::SetTimer {
            channel: channel.get(),
            timer: timer_for_rate(sample_rate, pitch),
        };
        self.run(handle, SimOp::SetRate, &[command])
    }
}

fn wire_error(err: WireError) -> ServiceError {
    ServiceError::Backend(err.to_string())
}
