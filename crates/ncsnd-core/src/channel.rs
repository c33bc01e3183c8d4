use ncsnd_ports::sound::{PlaybackRequest, RequestKind};
use ncsnd_ports::types::{ChannelIndex, Priority, NUM_CHANNELS};
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use std::ops::Deref;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum ChannelState {
    Idle = 0,
    Playing = 1,
    Paused = 2,
}

impl ChannelState {
    fn from_tag(tag: u8) -> Self {
        match tag {
            1 => ChannelState::Playing,
            2 => ChannelState::Paused,
            _ => ChannelState::Idle,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Binding {
    pub request: PlaybackRequest,
    pub priority: Priority,
}

/// State of one hardware slot. `binding` is `Some` exactly when not Idle.
#[derive(Clone, Debug)]
pub struct ChannelSlot {
    index: ChannelIndex,
    state: ChannelState,
    binding: Option<Binding>,
    sleep_paused: bool,
}

impl ChannelSlot {
    fn new(index: ChannelIndex) -> Self {
        Self {
            index,
            state: ChannelState::Idle,
            binding: None,
            sleep_paused: false,
        }
    }

    pub fn index(&self) -> ChannelIndex {
        self.index
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    pub fn current_priority(&self) -> Option<Priority> {
        self.binding.as_ref().map(|binding| binding.priority)
    }

    pub fn is_idle(&self) -> bool {
        self.state == ChannelState::Idle
    }

    pub fn sleep_paused(&self) -> bool {
        self.sleep_paused
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            channel: self.index,
            state: self.state,
            priority: self.current_priority(),
            kind: self.binding.as_ref().map(|binding| binding.request.kind()),
            sleep_paused: self.sleep_paused,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ChannelSnapshot {
    pub channel: ChannelIndex,
    pub state: ChannelState,
    pub priority: Option<Priority>,
    pub kind: Option<RequestKind>,
    pub sleep_paused: bool,
}

struct SlotCell {
    tag: AtomicU8,
    slot: Mutex<ChannelSlot>,
}

/// Locked slot. Every mutation republishes the state tag so lock-free
/// readers never see a state the slot does not hold.
pub struct SlotGuard<'a> {
    slot: MutexGuard<'a, ChannelSlot>,
    tag: &'a AtomicU8,
}

impl SlotGuard<'_> {
    /// Binds `request` as Playing and hands back whatever it replaced.
    pub fn bind(&mut self, request: PlaybackRequest, priority: Priority) -> Option<Binding> {
        let previous = self.slot.binding.replace(Binding { request, priority });
        self.slot.sleep_paused = false;
        self.set_state(ChannelState::Playing);
        previous
    }

    pub fn release(&mut self) -> Option<Binding> {
        let previous = self.slot.binding.take();
        self.slot.sleep_paused = false;
        self.set_state(ChannelState::Idle);
        previous
    }

    pub fn set_paused(&mut self, paused: bool, by_sleep: bool) {
        if self.slot.binding.is_none() {
            return;
        }
        self.slot.sleep_paused = paused && by_sleep;
        self.set_state(if paused {
            ChannelState::Paused
        } else {
            ChannelState::Playing
        });
    }

    pub fn request_mut(&mut self) -> Option<&mut PlaybackRequest> {
        self.slot.binding.as_mut().map(|binding| &mut binding.request)
    }

    fn set_state(&mut self, state: ChannelState) {
        self.slot.state = state;
        self.tag.store(state as u8, Ordering::Release);
    }
}

impl Deref for SlotGuard<'_> {
    type Target = ChannelSlot;

    fn deref(&self) -> &Self::Target {
        &self.slot
    }
}

/// Fixed arena of channel slots, one lock per slot.
pub struct SlotTable {
    cells: [SlotCell; NUM_CHANNELS],
}

impl SlotTable {
    pub fn new() -> Self {
        Self {
            cells: ChannelIndex::ALL.map(|index| SlotCell {
                tag: AtomicU8::new(ChannelState::Idle as u8),
                slot: Mutex::new(ChannelSlot::new(index)),
            }),
        }
    }

    pub fn lock(&self, channel: ChannelIndex) -> SlotGuard<'_> {
        let cell = &self.cells[channel.as_usize()];
        SlotGuard {
            slot: cell.slot.lock(),
            tag: &cell.tag,
        }
    }

    pub fn state(&self, channel: ChannelIndex) -> ChannelState {
        ChannelState::from_tag(self.cells[channel.as_usize()].tag.load(Ordering::Acquire))
    }

    pub fn reset_all(&self) {
        for channel in ChannelIndex::ALL {
            self.lock(channel).release();
        }
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}
