use crate::service::ServiceError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerEvent {
    Suspend,
    Restore,
    Sleep,
    Wakeup,
    Exit,
}

impl PowerEvent {
    pub fn is_pausing(self) -> bool {
        matches!(self, PowerEvent::Suspend | PowerEvent::Sleep)
    }

    pub fn is_resuming(self) -> bool {
        matches!(self, PowerEvent::Restore | PowerEvent::Wakeup)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HookId(pub u32);

/// Receives applet power transitions. Called from the platform's event thread.
pub trait PowerEventSink: Send + Sync + 'static {
    fn on_power_event(&self, event: PowerEvent);
}

pub trait SleepHookPort: Send + Sync {
    fn install(&self, sink: Arc<dyn PowerEventSink>) -> Result<HookId, ServiceError>;
    fn uninstall(&self, id: HookId);
}
