use ncsnd_ports::power::{HookId, PowerEvent, PowerEventSink, SleepHookPort};
use ncsnd_ports::service::ServiceError;
use parking_lot::Mutex;
use std::sync::Arc;

/// Stand-in for the applet manager's hook list.
pub struct SimSleepHooks {
    inner: Mutex<Inner>,
}

struct Inner {
    next_id: u32,
    sinks: Vec<(HookId, Arc<dyn PowerEventSink>)>,
    fail_install: Option<ServiceError>,
}

impl SimSleepHooks {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                sinks: Vec::new(),
                fail_install: None,
            }),
        }
    }

    pub fn installed(&self) -> usize {
        self.inner.lock().sinks.len()
    }

    pub fn fail_next_install(&self, err: ServiceError) {
        self.inner.lock().fail_install = Some(err);
    }

    /// Delivers `event` to every installed hook on the calling thread.
    pub fn fire(&self, event: PowerEvent) {
        let sinks: Vec<_> = self
            .inner
            .lock()
            .sinks
            .iter()
            .map(|(_, sink)| Arc::clone(sink))
            .collect();
        for sink in sinks {
            sink.on_power_event(event);
        }
    }
}

impl Default for SimSleepHooks {
    fn default() -> Self {
        Self::new()
    }
}

impl SleepHookPort for SimSleepHooks {
    fn install(&self, sink: Arc<dyn PowerEventSink>) -> Result<HookId, ServiceError> {
        let mut inner = self.inner.lock();
        if let Some(err) = inner.fail_install.take() {
            return Err(err);
        }
        let id = HookId(inner.next_id);
        inner.next_id += 1;
        inner.sinks.push((id, sink));
        Ok(id)
    }

    fn uninstall(&self, id: HookId) {
        self.inner.lock().sinks.retain(|(installed, _)| *installed != id);
    }
}
