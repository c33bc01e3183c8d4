use crate::channel::{ChannelSnapshot, ChannelState, SlotTable};
use crate::error::{ArbiterError, RequestDefect};
use crate::sleep::ArbiterHook;
use crate::validate;
use ncsnd_ports::power::{HookId, PowerEvent, SleepHookPort};
use ncsnd_ports::service::{CsndServicePort, ServiceError, ServiceHandle};
use ncsnd_ports::settings::ArbiterSettings;
use ncsnd_ports::sound::{PlaybackRequest, Sound};
use ncsnd_ports::types::{ChannelIndex, ChannelMask, Priority};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug)]
pub(crate) struct Session {
    pub(crate) handle: ServiceHandle,
    pub(crate) granted: ChannelMask,
    pub(crate) hook: Option<HookId>,
}

pub(crate) struct Shared {
    pub(crate) service: Arc<dyn CsndServicePort>,
    pub(crate) hooks: Arc<dyn SleepHookPort>,
    pub(crate) session: RwLock<Option<Session>>,
    pub(crate) slots: SlotTable,
    mask: AtomicU32,
}

/// Owns the fixed pool of hardware playback channels.
///
/// Calls on different channels run concurrently; calls on the same channel
/// serialize on that channel's lock, which also covers the blocking service
/// round-trip.
pub struct ChannelArbiter {
    shared: Arc<Shared>,
}

impl ChannelArbiter {
    pub fn new(
        service: Arc<dyn CsndServicePort>,
        hooks: Arc<dyn SleepHookPort>,
        mask: ChannelMask,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                service,
                hooks,
                session: RwLock::new(None),
                slots: SlotTable::new(),
                mask: AtomicU32::new(mask.0),
            }),
        }
    }

    pub fn from_settings(
        service: Arc<dyn CsndServicePort>,
        hooks: Arc<dyn SleepHookPort>,
        settings: &ArbiterSettings,
    ) -> Self {
        Self::new(service, hooks, settings.channel_mask)
    }

    pub fn initialize(&self, install_hook: bool) -> Result<(), ArbiterError> {
        let mut session = self.shared.session.write();
        if session.is_some() {
            return Err(ArbiterError::AlreadyInitialized);
        }

        let handle = self
            .shared
            .service
            .acquire_service_handle()
            .map_err(ArbiterError::ServiceUnavailable)?;
        let granted = match self.shared.service.acquire_sound_channels(handle) {
            Ok(mask) => mask.intersect(ChannelMask::ALL),
            Err(err) => {
                self.shared.service.release_service_handle(handle);
                return Err(ArbiterError::ServiceUnavailable(err));
            }
        };
        self.shared.slots.reset_all();

        let hook = if install_hook {
            let sink = Arc::new(ArbiterHook::new(Arc::downgrade(&self.shared)));
            match self.shared.hooks.install(sink) {
                Ok(id) => Some(id),
                Err(err) => {
                    self.shared.service.release_sound_channels(handle);
                    self.shared.service.release_service_handle(handle);
                    return Err(ArbiterError::ServiceUnavailable(err));
                }
            }
        } else {
            None
        };

        info!(
            %handle,
            granted = granted.0,
            sleep_hook = hook.is_some(),
            "csnd arbiter initialized"
        );
        *session = Some(Session {
            handle,
            granted,
            hook,
        });
        Ok(())
    }

    pub fn teardown(&self) {
        let mut session = self.shared.session.write();
        let Some(current) = session.take() else {
            return;
        };

        for channel in ChannelIndex::ALL {
            let mut slot = self.shared.slots.lock(channel);
            if slot.is_idle() {
                continue;
            }
            if let Err(err) = self.shared.service.halt_channel(current.handle, channel) {
                warn!(%channel, %err, "halt during teardown failed");
            }
            slot.release();
        }

        if let Some(id) = current.hook {
            self.shared.hooks.uninstall(id);
        }
        self.shared.service.release_sound_channels(current.handle);
        self.shared.service.release_service_handle(current.handle);
        info!(handle = %current.handle, "csnd arbiter torn down");
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.session.read().is_some()
    }

    pub fn channel_mask(&self) -> ChannelMask {
        ChannelMask(self.shared.mask.load(Ordering::Acquire))
    }

    /// Channels the service granted this session; empty before initialization.
    pub fn granted_channels(&self) -> ChannelMask {
        self.shared
            .session
            .read()
            .as_ref()
            .map(|session| session.granted)
            .unwrap_or(ChannelMask::NONE)
    }

    /// Channels `admit` accepts right now: the configured mask limited to
    /// the service grant.
    pub fn admissible_channels(&self) -> ChannelMask {
        self.channel_mask().intersect(self.granted_channels())
    }

    /// Replaces the set of channels new requests may be admitted on.
    /// Playback already bound elsewhere is left alone.
    pub fn set_channel_mask(&self, mask: ChannelMask) {
        self.shared.mask.store(mask.0, Ordering::Release);
        debug!(mask = mask.0, "channel mask updated");
    }

    /// Binds `request` to `channel` if the channel is free or `priority`
    /// strictly outranks the current binding.
    ///
    /// A Playing slot that would otherwise reject the request is checked
    /// against the service first; if its playback already ended the slot is
    /// reclaimed as if `reap_finished` had run.
    pub fn admit(
        &self,
        channel: u32,
        priority: u32,
        request: impl Into<PlaybackRequest>,
    ) -> Result<(), ArbiterError> {
        let request = request.into();
        let session = self.shared.session.read();
        let session = session.as_ref().ok_or(ArbiterError::NotInitialized)?;

        let admissible = self.channel_mask().intersect(session.granted);
        let channel = validate::admissible_channel(channel, admissible)?;
        let priority = validate::priority(priority)?;
        validate::validate_request(&request)?;

        let mut slot = self.shared.slots.lock(channel);
        let preempting = match slot.current_priority() {
            None => false,
            Some(current) if priority.preempts(current) => true,
            Some(current) if self.playback_ended(session.handle, channel, slot.state()) => {
                debug!(%channel, %current, "reclaimed finished channel");
                slot.release();
                false
            }
            Some(current) => {
                debug!(%channel, %priority, %current, "admission rejected, channel busy");
                return Err(ArbiterError::ChannelBusy { channel, current });
            }
        };

        if let Err(err) = self.submit(session.handle, channel, priority, &request) {
            warn!(%channel, %err, preempting, "submission failed, channel rolled back to idle");
            if preempting {
                if let Err(halt_err) = self.shared.service.halt_channel(session.handle, channel) {
                    warn!(%channel, err = %halt_err, "halt after failed preemption failed");
                }
                slot.release();
            }
            return Err(ArbiterError::TransportError(err));
        }

        if let Some(replaced) = slot.bind(request, priority) {
            info!(
                %channel,
                %priority,
                replaced = %replaced.priority,
                "preempted channel"
            );
        } else {
            debug!(%channel, %priority, kind = ?request.kind(), "admitted request");
        }
        Ok(())
    }

    pub fn pause(&self, channel: u32, pause: bool) -> Result<(), ArbiterError> {
        let session = self.shared.session.read();
        let session = session.as_ref().ok_or(ArbiterError::NotInitialized)?;
        let channel = validate::channel_in_range(channel)?;

        let mut slot = self.shared.slots.lock(channel);
        match (slot.state(), pause) {
            (ChannelState::Playing, true) | (ChannelState::Paused, false) => {
                self.shared
                    .service
                    .set_pause(session.handle, channel, pause)
                    .map_err(ArbiterError::TransportError)?;
                slot.set_paused(pause, false);
                debug!(%channel, pause, "channel pause state changed");
            }
            (ChannelState::Paused, true) => {
                // An explicit pause outranks a pending resume on wake.
                slot.set_paused(true, false);
            }
            _ => {}
        }
        Ok(())
    }

    /// Releases the channel regardless of priority. The hardware may need a
    /// little longer to fall silent; a failed halt is logged, not returned.
    pub fn stop(&self, channel: u32) -> Result<(), ArbiterError> {
        let session = self.shared.session.read();
        let session = session.as_ref().ok_or(ArbiterError::NotInitialized)?;
        let channel = validate::channel_in_range(channel)?;

        let mut slot = self.shared.slots.lock(channel);
        if slot.is_idle() {
            return Ok(());
        }
        if let Err(err) = self.shared.service.halt_channel(session.handle, channel) {
            warn!(%channel, %err, "halt failed");
        }
        slot.release();
        debug!(%channel, "channel stopped");
        Ok(())
    }

    /// Lock-free; `false` for out-of-range channels and before initialization.
    pub fn is_playing(&self, channel: u32) -> bool {
        ChannelIndex::new(channel)
            .map(|channel| self.shared.slots.state(channel) == ChannelState::Playing)
            .unwrap_or(false)
    }

    pub fn channel_state(&self, channel: u32) -> Result<ChannelSnapshot, ArbiterError> {
        let session = self.shared.session.read();
        session.as_ref().ok_or(ArbiterError::NotInitialized)?;
        let channel = validate::channel_in_range(channel)?;
        let snapshot = self.shared.slots.lock(channel).snapshot();
        Ok(snapshot)
    }

    pub fn bound_request(&self, channel: u32) -> Result<Option<PlaybackRequest>, ArbiterError> {
        let session = self.shared.session.read();
        session.as_ref().ok_or(ArbiterError::NotInitialized)?;
        let channel = validate::channel_in_range(channel)?;
        let slot = self.shared.slots.lock(channel);
        Ok(slot.binding().map(|binding| binding.request))
    }

    pub fn set_volume(&self, channel: u32, volume: f32, pan: f32) -> Result<(), ArbiterError> {
        validate::validate_mix(volume, pan)?;
        self.adjust_sound(
            channel,
            |shared, handle, index| shared.service.set_volume(handle, index, volume, pan),
            |sound| {
                sound.volume = volume;
                sound.pan = pan;
            },
        )
    }

    pub fn set_rate(&self, channel: u32, sample_rate: u32, pitch: f32) -> Result<(), ArbiterError> {
        if sample_rate == 0 {
            return Err(RequestDefect::ZeroSampleRate.into());
        }
        validate::validate_rate(pitch)?;
        self.adjust_sound(
            channel,
            |shared, handle, index| shared.service.set_rate(handle, index, sample_rate, pitch),
            |sound| {
                sound.sample_rate = sample_rate;
                sound.pitch = pitch;
            },
        )
    }

    /// Returns Playing channels whose hardware playback has ended to Idle.
    pub fn reap_finished(&self) -> Result<Vec<ChannelIndex>, ArbiterError> {
        let session = self.shared.session.read();
        let session = session.as_ref().ok_or(ArbiterError::NotInitialized)?;

        let mut reaped = Vec::new();
        for channel in ChannelIndex::ALL {
            let mut slot = self.shared.slots.lock(channel);
            if slot.state() != ChannelState::Playing {
                continue;
            }
            let active = self
                .shared
                .service
                .query_playing(session.handle, channel)
                .map_err(ArbiterError::TransportError)?;
            if !active {
                slot.release();
                debug!(%channel, "playback finished");
                reaped.push(channel);
            }
        }
        Ok(reaped)
    }

    /// Delivers a power transition by hand. Ignored unless the sleep hook
    /// was installed at initialization.
    pub fn notify_power_event(&self, event: PowerEvent) -> Result<(), ArbiterError> {
        let session = self.shared.session.read();
        let session = session.as_ref().ok_or(ArbiterError::NotInitialized)?;
        if session.hook.is_none() {
            debug!(?event, "power event ignored, no sleep hook installed");
            return Ok(());
        }
        self.shared.apply_power_event(session.handle, event);
        Ok(())
    }

    fn submit(
        &self,
        handle: ServiceHandle,
        channel: ChannelIndex,
        priority: Priority,
        request: &PlaybackRequest,
    ) -> Result<(), ServiceError> {
        match request {
            PlaybackRequest::DirectSound(sound) => self
                .shared
                .service
                .submit_direct_sound(handle, channel, priority, sound),
            PlaybackRequest::Sound(sound) => self.shared.service.submit_sound(handle, channel, sound),
        }
    }

    fn playback_ended(&self, handle: ServiceHandle, channel: ChannelIndex, state: ChannelState) -> bool {
        if state != ChannelState::Playing {
            return false;
        }
        match self.shared.service.query_playing(handle, channel) {
            Ok(active) => !active,
            Err(err) => {
                warn!(%channel, %err, "playback query failed, channel kept busy");
                false
            }
        }
    }

    fn adjust_sound(
        &self,
        channel: u32,
        send: impl FnOnce(&Shared, ServiceHandle, ChannelIndex) -> Result<(), ServiceError>,
        record: impl FnOnce(&mut Sound),
    ) -> Result<(), ArbiterError> {
        let session = self.shared.session.read();
        let session = session.as_ref().ok_or(ArbiterError::NotInitialized)?;
        let channel = validate::channel_in_range(channel)?;

        let mut slot = self.shared.slots.lock(channel);
        match slot.request_mut() {
            None => Ok(()),
            Some(PlaybackRequest::DirectSound(_)) => Err(RequestDefect::NotAdjustable.into()),
            Some(PlaybackRequest::Sound(sound)) => {
                send(&self.shared, session.handle, channel).map_err(ArbiterError::TransportError)?;
                record(sound);
                Ok(())
            }
        }
    }
}

impl Drop for ChannelArbiter {
    fn drop(&mut self) {
        self.teardown();
    }
}
