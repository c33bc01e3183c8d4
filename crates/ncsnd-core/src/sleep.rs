use crate::arbiter::Shared;
use crate::channel::ChannelState;
use ncsnd_ports::power::{PowerEvent, PowerEventSink};
use ncsnd_ports::service::ServiceHandle;
use ncsnd_ports::types::ChannelIndex;
use std::sync::Weak;
use tracing::{debug, info, warn};

/// Registered with the platform while the arbiter holds a session.
pub(crate) struct ArbiterHook {
    shared: Weak<Shared>,
}

impl ArbiterHook {
    pub(crate) fn new(shared: Weak<Shared>) -> Self {
        Self { shared }
    }
}

impl PowerEventSink for ArbiterHook {
    fn on_power_event(&self, event: PowerEvent) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let session = shared.session.read();
        match session.as_ref() {
            Some(session) if session.hook.is_some() => shared.apply_power_event(session.handle, event),
            _ => debug!(?event, "power event after teardown dropped"),
        }
    }
}

impl Shared {
    /// Caller holds the session read lock.
    pub(crate) fn apply_power_event(&self, handle: ServiceHandle, event: PowerEvent) {
        if event.is_pausing() {
            self.pause_for_sleep(handle, event);
        } else if event.is_resuming() {
            self.resume_after_sleep(handle, event);
        } else {
            self.halt_all(handle);
        }
    }

    fn pause_for_sleep(&self, handle: ServiceHandle, event: PowerEvent) {
        let mut paused = 0;
        for channel in ChannelIndex::ALL {
            let mut slot = self.slots.lock(channel);
            if slot.state() != ChannelState::Playing {
                continue;
            }
            let keeps_playing = slot
                .binding()
                .map(|binding| binding.request.plays_on_sleep())
                .unwrap_or(false);
            if keeps_playing {
                continue;
            }
            match self.service.set_pause(handle, channel, true) {
                Ok(()) => {
                    slot.set_paused(true, true);
                    paused += 1;
                }
                Err(err) => warn!(%channel, %err, "pause on sleep failed"),
            }
        }
        info!(?event, paused, "channels paused for sleep");
    }

    fn resume_after_sleep(&self, handle: ServiceHandle, event: PowerEvent) {
        let mut resumed = 0;
        for channel in ChannelIndex::ALL {
            let mut slot = self.slots.lock(channel);
            if slot.state() != ChannelState::Paused || !slot.sleep_paused() {
                continue;
            }
            match self.service.set_pause(handle, channel, false) {
                Ok(()) => {
                    slot.set_paused(false, false);
                    resumed += 1;
                }
                Err(err) => warn!(%channel, %err, "resume after sleep failed"),
            }
        }
        info!(?event, resumed, "channels resumed after sleep");
    }

    fn halt_all(&self, handle: ServiceHandle) {
        for channel in ChannelIndex::ALL {
            let mut slot = self.slots.lock(channel);
            if slot.is_idle() {
                continue;
            }
            if let Err(err) = self.service.halt_channel(handle, channel) {
                warn!(%channel, %err, "halt on exit failed");
            }
            slot.release();
        }
        info!("all channels halted on exit");
    }
}
