use ncsnd_infra_sim::SimSleepHooks;
use ncsnd_ports::power::{PowerEvent, PowerEventSink, SleepHookPort};
use ncsnd_ports::service::ServiceError;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<PowerEvent>>,
}

impl PowerEventSink for Recorder {
    fn on_power_event(&self, event: PowerEvent) {
        self.seen.lock().push(event);
    }
}

#[test]
fn installed_sinks_receive_events_until_removed() {
    let hooks = SimSleepHooks::new();
    let recorder = Arc::new(Recorder::default());
    let id = hooks.install(recorder.clone()).expect("install");
    assert_eq!(hooks.installed(), 1);

    hooks.fire(PowerEvent::Sleep);
    hooks.fire(PowerEvent::Wakeup);
    hooks.uninstall(id);
    hooks.fire(PowerEvent::Exit);

    assert_eq!(hooks.installed(), 0);
    assert_eq!(
        *recorder.seen.lock(),
        vec![PowerEvent::Sleep, PowerEvent::Wakeup]
    );
}

#[test]
fn install_failure_is_reported_once() {
    let hooks = SimSleepHooks::new();
    hooks.fail_next_install(ServiceError::Backend("no hook slots".into()));
    let recorder = Arc::new(Recorder::default());
    assert!(hooks.install(recorder.clone()).is_err());
    assert!(hooks.install(recorder).is_ok());
}
