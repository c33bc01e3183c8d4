use ncsnd_ports::service::ServiceError;
use std::collections::{HashMap, VecDeque};

/// Service entry points a failure can be scripted for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SimOp {
    Acquire,
    AcquireChannels,
    SubmitDirectSound,
    SubmitSound,
    SetPause,
    Halt,
    QueryPlaying,
    SetVolume,
    SetRate,
}

#[derive(Debug, Default)]
pub(crate) struct Faults {
    queued: HashMap<SimOp, VecDeque<ServiceError>>,
}

impl Faults {
    pub(crate) fn push(&mut self, op: SimOp, err: ServiceError) {
        self.queued.entry(op).or_default().push_back(err);
    }

    pub(crate) fn take(&mut self, op: SimOp) -> Result<(), ServiceError> {
        match self.queued.get_mut(&op).and_then(|queue| queue.pop_front()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
