use ncsnd_core::{ArbiterError, ChannelArbiter, ChannelState, RequestDefect};
use ncsnd_infra_sim::{SimCsndService, SimOp, SimSleepHooks};
use ncsnd_ports::service::ServiceError;
use ncsnd_ports::settings::ArbiterSettings;
use ncsnd_ports::sound::{DirectSound, Encoding, PlaybackRequest, RequestKind, Sound};
use ncsnd_ports::types::{ChannelIndex, ChannelMask, Priority, SampleAddr};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const HEAP: u32 = 0x1400_0000;

fn ch(raw: u32) -> ChannelIndex {
    ChannelIndex::new(raw).unwrap()
}

fn prio(raw: u32) -> Priority {
    Priority::new(raw).unwrap()
}

fn setup() -> (Arc<SimCsndService>, Arc<SimSleepHooks>, ChannelArbiter) {
    let service = Arc::new(SimCsndService::new());
    let hooks = Arc::new(SimSleepHooks::new());
    let arbiter = ChannelArbiter::new(service.clone(), hooks.clone(), ChannelMask::ALL);
    arbiter.initialize(false).expect("initialize");
    (service, hooks, arbiter)
}

fn mono_pcm16() -> DirectSound {
    DirectSound::mono(Encoding::Pcm16, 32_728, SampleAddr(HEAP), 0x4000)
}

fn stereo_adpcm() -> DirectSound {
    DirectSound::stereo(
        Encoding::ImaAdpcm,
        32_728,
        SampleAddr(HEAP + 0x1_0000),
        SampleAddr(HEAP + 0x2_0000),
        0x2000,
    )
}

fn one_shot() -> Sound {
    Sound::one_shot(Encoding::Pcm16, 22_050, SampleAddr(HEAP + 0x3_0000), 0x800)
}

#[test]
fn lower_priority_is_busy_and_keeps_first_request() {
    let (_service, _hooks, arbiter) = setup();
    for channel in 0..4 {
        for (first, second) in [(0, 1), (3, 7), (10, 31), (12, 12)] {
            arbiter.admit(channel, first, mono_pcm16()).expect("first admit");
            let err = arbiter.admit(channel, second, stereo_adpcm()).unwrap_err();
            assert_eq!(
                err,
                ArbiterError::ChannelBusy {
                    channel: ch(channel),
                    current: prio(first),
                }
            );
            assert_eq!(
                arbiter.bound_request(channel).unwrap(),
                Some(PlaybackRequest::DirectSound(mono_pcm16()))
            );
            assert_eq!(arbiter.channel_state(channel).unwrap().priority, Some(prio(first)));
            arbiter.stop(channel).unwrap();
        }
    }
}

#[test]
fn higher_priority_preempts() {
    let (service, _hooks, arbiter) = setup();
    for channel in 0..4 {
        arbiter.admit(channel, 20, mono_pcm16()).unwrap();
        arbiter.admit(channel, 4, stereo_adpcm()).unwrap();

        assert!(arbiter.is_playing(channel));
        assert_eq!(
            arbiter.bound_request(channel).unwrap(),
            Some(PlaybackRequest::DirectSound(stereo_adpcm()))
        );
        assert_eq!(arbiter.channel_state(channel).unwrap().priority, Some(prio(4)));

        let voice = service.voice(ch(channel)).direct.expect("direct voice");
        assert_eq!(voice.priority, prio(4));
        assert_eq!(voice.sound.channel_data.channel_amount, 2);
    }
}

#[test]
fn preemption_replaces_paused_channels_too() {
    let (_service, _hooks, arbiter) = setup();
    arbiter.admit(1, 9, one_shot()).unwrap();
    arbiter.pause(1, true).unwrap();
    arbiter.admit(1, 2, mono_pcm16()).unwrap();

    let snapshot = arbiter.channel_state(1).unwrap();
    assert_eq!(snapshot.state, ChannelState::Playing);
    assert_eq!(snapshot.kind, Some(RequestKind::DirectSound));
}

#[test]
fn stop_always_leaves_channel_silent() {
    let (service, _hooks, arbiter) = setup();

    arbiter.stop(0).unwrap();
    assert!(!arbiter.is_playing(0));

    arbiter.admit(0, 10, mono_pcm16()).unwrap();
    arbiter.stop(0).unwrap();
    assert!(!arbiter.is_playing(0));
    assert!(!service.voice(ch(0)).active);

    arbiter.admit(0, 10, one_shot()).unwrap();
    arbiter.pause(0, true).unwrap();
    arbiter.stop(0).unwrap();
    arbiter.stop(0).unwrap();
    assert!(!arbiter.is_playing(0));
    assert_eq!(arbiter.channel_state(0).unwrap().state, ChannelState::Idle);
    assert_eq!(arbiter.bound_request(0).unwrap(), None);
}

#[test]
fn stop_ignores_halt_failures() {
    let (service, _hooks, arbiter) = setup();
    arbiter.admit(2, 10, one_shot()).unwrap();
    service.fail_next(SimOp::Halt, ServiceError::Rejected(1));
    arbiter.stop(2).unwrap();
    assert_eq!(arbiter.channel_state(2).unwrap().state, ChannelState::Idle);
}

#[test]
fn pause_round_trip_keeps_binding() {
    let (service, _hooks, arbiter) = setup();
    arbiter.admit(3, 7, one_shot()).unwrap();

    arbiter.pause(3, true).unwrap();
    assert!(!arbiter.is_playing(3));
    assert_eq!(arbiter.channel_state(3).unwrap().state, ChannelState::Paused);
    assert!(service.voice(ch(3)).paused);

    arbiter.pause(3, true).unwrap();
    arbiter.pause(3, false).unwrap();
    assert!(arbiter.is_playing(3));
    let snapshot = arbiter.channel_state(3).unwrap();
    assert_eq!(snapshot.priority, Some(prio(7)));
    assert_eq!(
        arbiter.bound_request(3).unwrap(),
        Some(PlaybackRequest::Sound(one_shot()))
    );
    assert!(service.voice(ch(3)).active);
}

#[test]
fn pause_on_idle_channel_is_a_no_op() {
    let (service, _hooks, arbiter) = setup();
    arbiter.pause(0, true).unwrap();
    arbiter.pause(0, false).unwrap();
    assert_eq!(arbiter.channel_state(0).unwrap().state, ChannelState::Idle);
    assert!(service.executed_commands().is_empty());
}

#[test]
fn loop_outside_buffer_is_rejected_without_effects() {
    let (service, _hooks, arbiter) = setup();
    let base = HEAP + 0x4_0000;
    for loop_start in [base - 4, base + 0x1000, base + 0x2000] {
        let sound = Sound::looped(
            Encoding::Pcm16,
            22_050,
            SampleAddr(base),
            SampleAddr(loop_start),
            0x1000,
        );
        let err = arbiter.admit(0, 0, sound).unwrap_err();
        assert!(matches!(
            err,
            ArbiterError::InvalidRequest(RequestDefect::LoopOutsideBuffer { .. })
        ));
    }
    assert_eq!(arbiter.channel_state(0).unwrap().state, ChannelState::Idle);
    assert!(service.executed_commands().is_empty());
}

#[test]
fn invalid_arguments_change_nothing() {
    let (service, _hooks, arbiter) = setup();
    arbiter.admit(1, 10, mono_pcm16()).unwrap();

    assert_eq!(arbiter.admit(4, 0, mono_pcm16()), Err(ArbiterError::InvalidChannel(4)));
    assert_eq!(arbiter.admit(1, 32, mono_pcm16()), Err(ArbiterError::InvalidPriority(32)));

    let mut empty = stereo_adpcm();
    empty.channel_data.sample_data_length = 0;
    assert_eq!(
        arbiter.admit(1, 0, empty),
        Err(ArbiterError::InvalidRequest(RequestDefect::EmptySampleData))
    );

    let mut three = stereo_adpcm();
    three.channel_data.channel_amount = 3;
    assert_eq!(
        arbiter.admit(1, 0, three),
        Err(ArbiterError::InvalidRequest(
            RequestDefect::UnsupportedChannelAmount(3)
        ))
    );

    assert_eq!(
        arbiter.bound_request(1).unwrap(),
        Some(PlaybackRequest::DirectSound(mono_pcm16()))
    );
    assert_eq!(service.voice(ch(1)).direct.map(|voice| voice.priority), Some(prio(10)));
}

#[test]
fn concrete_preemption_scenario() {
    let (service, _hooks, arbiter) = setup();

    arbiter.admit(0, 10, mono_pcm16()).unwrap();
    assert!(arbiter.is_playing(0));

    arbiter.admit(0, 5, stereo_adpcm()).unwrap();
    let voice = service.voice(ch(0)).direct.expect("direct voice");
    assert_eq!(voice.sound.channel_data.encoding, Encoding::ImaAdpcm);

    let late = DirectSound::mono(Encoding::Pcm8, 16_364, SampleAddr(HEAP), 0x100);
    assert_eq!(
        arbiter.admit(0, 20, late),
        Err(ArbiterError::ChannelBusy {
            channel: ch(0),
            current: prio(5),
        })
    );
    assert_eq!(
        arbiter.bound_request(0).unwrap(),
        Some(PlaybackRequest::DirectSound(stereo_adpcm()))
    );

    arbiter.stop(0).unwrap();
    assert!(!arbiter.is_playing(0));
}

#[test]
fn transport_failure_on_idle_channel_leaves_it_idle() {
    let (service, _hooks, arbiter) = setup();
    service.fail_next(SimOp::SubmitSound, ServiceError::Rejected(0xC8A0_4000));

    assert_eq!(
        arbiter.admit(2, 10, one_shot()),
        Err(ArbiterError::TransportError(ServiceError::Rejected(0xC8A0_4000)))
    );
    assert!(!arbiter.is_playing(2));
    assert_eq!(arbiter.channel_state(2).unwrap().state, ChannelState::Idle);

    arbiter.admit(2, 10, one_shot()).unwrap();
    assert!(arbiter.is_playing(2));
}

#[test]
fn transport_failure_while_preempting_rolls_back_to_idle() {
    let (service, _hooks, arbiter) = setup();
    arbiter.admit(0, 10, mono_pcm16()).unwrap();
    service.fail_next(
        SimOp::SubmitDirectSound,
        ServiceError::Backend("ipc timeout".into()),
    );

    let err = arbiter.admit(0, 5, stereo_adpcm()).unwrap_err();
    assert!(matches!(err, ArbiterError::TransportError(_)));
    assert_eq!(arbiter.channel_state(0).unwrap().state, ChannelState::Idle);
    assert_eq!(arbiter.bound_request(0).unwrap(), None);
    assert!(!service.voice(ch(0)).active);
}

#[test]
fn operations_before_initialize_are_lifecycle_errors() {
    let service = Arc::new(SimCsndService::new());
    let hooks = Arc::new(SimSleepHooks::new());
    let arbiter = ChannelArbiter::new(service.clone(), hooks, ChannelMask::ALL);

    let err = arbiter.admit(0, 0, mono_pcm16()).unwrap_err();
    assert_eq!(err, ArbiterError::NotInitialized);
    assert!(err.is_lifecycle());
    assert_eq!(arbiter.pause(0, true), Err(ArbiterError::NotInitialized));
    assert_eq!(arbiter.stop(0), Err(ArbiterError::NotInitialized));
    assert_eq!(arbiter.set_volume(0, 1.0, 0.0), Err(ArbiterError::NotInitialized));
    assert_eq!(arbiter.reap_finished(), Err(ArbiterError::NotInitialized));
    assert!(arbiter.channel_state(0).is_err());
    assert!(!arbiter.is_playing(0));
    assert!(!service.is_connected());

    arbiter.teardown();
    assert!(!arbiter.is_initialized());
}

#[test]
fn initialize_twice_fails_until_teardown() {
    let (service, _hooks, arbiter) = setup();
    assert_eq!(arbiter.initialize(false), Err(ArbiterError::AlreadyInitialized));

    arbiter.admit(1, 3, mono_pcm16()).unwrap();
    arbiter.teardown();
    arbiter.teardown();
    assert!(!service.is_connected());
    assert!(!service.voice(ch(1)).is_bound());
    assert!(!arbiter.is_playing(1));

    arbiter.initialize(false).unwrap();
    assert_eq!(arbiter.channel_state(1).unwrap().state, ChannelState::Idle);
}

#[test]
fn unavailable_service_fails_initialize() {
    let service = Arc::new(SimCsndService::new());
    let hooks = Arc::new(SimSleepHooks::new());
    let arbiter = ChannelArbiter::new(service.clone(), hooks, ChannelMask::ALL);
    service.fail_next(SimOp::Acquire, ServiceError::Unavailable("not running".into()));

    let err = arbiter.initialize(true).unwrap_err();
    assert!(matches!(err, ArbiterError::ServiceUnavailable(_)));
    assert!(err.is_lifecycle());
    assert!(!arbiter.is_initialized());

    arbiter.initialize(true).unwrap();
}

#[test]
fn hook_install_failure_releases_the_session() {
    let service = Arc::new(SimCsndService::new());
    let hooks = Arc::new(SimSleepHooks::new());
    let arbiter = ChannelArbiter::new(service.clone(), hooks.clone(), ChannelMask::ALL);
    hooks.fail_next_install(ServiceError::Backend("hook table full".into()));

    assert!(matches!(
        arbiter.initialize(true),
        Err(ArbiterError::ServiceUnavailable(_))
    ));
    assert!(!service.is_connected());
    assert_eq!(hooks.installed(), 0);
}

#[test]
fn mask_gates_admission_only() {
    let (_service, _hooks, arbiter) = setup();
    arbiter.admit(1, 10, one_shot()).unwrap();

    arbiter.set_channel_mask(ChannelMask(0b0001));
    assert_eq!(arbiter.channel_mask(), ChannelMask(0b0001));
    assert_eq!(arbiter.admit(1, 0, mono_pcm16()), Err(ArbiterError::InvalidChannel(1)));
    assert_eq!(arbiter.admit(2, 0, mono_pcm16()), Err(ArbiterError::InvalidChannel(2)));

    assert!(arbiter.is_playing(1));
    arbiter.stop(1).unwrap();
    assert!(!arbiter.is_playing(1));
    arbiter.admit(0, 10, one_shot()).unwrap();
}

#[test]
fn settings_supply_the_mask() {
    let service = Arc::new(SimCsndService::new());
    let hooks = Arc::new(SimSleepHooks::new());
    let settings = ArbiterSettings {
        channel_mask: ChannelMask(0b1000),
        ..ArbiterSettings::default()
    };
    let arbiter = ChannelArbiter::from_settings(service, hooks, &settings);
    arbiter.initialize(settings.install_sleep_hook).unwrap();

    assert_eq!(arbiter.admit(0, 1, one_shot()), Err(ArbiterError::InvalidChannel(0)));
    arbiter.admit(3, 1, one_shot()).unwrap();
}

#[test]
fn finished_channels_are_reaped() {
    let (service, _hooks, arbiter) = setup();
    arbiter.admit(0, 10, one_shot()).unwrap();
    arbiter.admit(2, 10, mono_pcm16()).unwrap();
    arbiter.admit(3, 10, one_shot()).unwrap();
    arbiter.pause(3, true).unwrap();

    service.finish_playback(ch(2));
    service.finish_playback(ch(3));
    assert_eq!(arbiter.reap_finished().unwrap(), vec![ch(2)]);

    assert!(arbiter.is_playing(0));
    assert!(!arbiter.is_playing(2));
    assert_eq!(arbiter.channel_state(3).unwrap().state, ChannelState::Paused);
    assert_eq!(arbiter.reap_finished().unwrap(), Vec::<ChannelIndex>::new());
}

#[test]
fn volume_and_rate_adjust_bound_sounds() {
    let (service, _hooks, arbiter) = setup();
    arbiter.admit(1, 10, one_shot()).unwrap();

    arbiter.set_volume(1, 0.5, -1.0).unwrap();
    arbiter.set_rate(1, 32_728, 1.0).unwrap();

    let Some(PlaybackRequest::Sound(sound)) = arbiter.bound_request(1).unwrap() else {
        panic!("expected a bound sound");
    };
    assert_eq!((sound.volume, sound.pan), (0.5, -1.0));
    assert_eq!((sound.sample_rate, sound.pitch), (32_728, 1.0));

    let registers = service.voice(ch(1)).registers;
    assert_eq!(registers.chn_volumes, 0x0000_4000);
    assert_eq!(registers.timer, 2048);
}

#[test]
fn volume_and_rate_reject_bad_input() {
    let (_service, _hooks, arbiter) = setup();
    arbiter.admit(0, 10, mono_pcm16()).unwrap();
    arbiter.admit(1, 10, one_shot()).unwrap();

    assert_eq!(
        arbiter.set_volume(0, 1.0, 0.0),
        Err(ArbiterError::InvalidRequest(RequestDefect::NotAdjustable))
    );
    assert_eq!(
        arbiter.set_volume(1, f32::NAN, 0.0),
        Err(ArbiterError::InvalidRequest(RequestDefect::NonFiniteMix))
    );
    assert_eq!(
        arbiter.set_rate(1, 0, 1.0),
        Err(ArbiterError::InvalidRequest(RequestDefect::ZeroSampleRate))
    );
    assert!(matches!(
        arbiter.set_rate(1, 22_050, -1.0),
        Err(ArbiterError::InvalidRequest(RequestDefect::InvalidPitch(_)))
    ));
    arbiter.set_volume(2, 1.0, 0.0).unwrap();
}

#[test]
fn concurrent_admits_on_one_channel_bind_exactly_once() {
    let (_service, _hooks, arbiter) = setup();
    let results: Vec<Result<(), ArbiterError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| arbiter.admit(2, 10, one_shot())))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results.iter().filter_map(|result| result.as_ref().err()).all(|err| {
        *err == ArbiterError::ChannelBusy {
            channel: ch(2),
            current: prio(10),
        }
    }));
    assert!(arbiter.is_playing(2));
}

#[test]
fn concurrent_admits_on_distinct_channels_all_succeed() {
    let (_service, _hooks, arbiter) = setup();
    std::thread::scope(|scope| {
        for channel in 0..4 {
            let arbiter = &arbiter;
            scope.spawn(move || {
                for priority in (0..=31).rev() {
                    arbiter.admit(channel, priority, one_shot()).unwrap();
                    assert!(arbiter.is_playing(channel));
                }
            });
        }
    });
    for channel in 0..4 {
        assert_eq!(arbiter.channel_state(channel).unwrap().priority, Some(prio(0)));
    }
}

#[test]
fn dropping_the_arbiter_tears_down() {
    let service = Arc::new(SimCsndService::new());
    let hooks = Arc::new(SimSleepHooks::new());
    let arbiter = ChannelArbiter::new(service.clone(), hooks.clone(), ChannelMask::ALL);
    arbiter.initialize(true).unwrap();
    arbiter.admit(0, 1, mono_pcm16()).unwrap();
    assert_eq!(hooks.installed(), 1);

    drop(arbiter);
    assert!(!service.is_connected());
    assert_eq!(hooks.installed(), 0);
}

#[test]
fn unused_buffer_addresses_do_not_block_admission() {
    let (service, _hooks, arbiter) = setup();

    let mut effect = one_shot();
    effect.loop_sample_data = SampleAddr(0x0800_0000);
    arbiter.admit(0, 10, effect).unwrap();
    assert_eq!(service.voice(ch(0)).registers.loop_addr, 0);

    let mut voice = mono_pcm16();
    voice.channel_data.right_sample_data = SampleAddr(0x0800_0000);
    arbiter.admit(1, 10, voice).unwrap();
    let direct = service.voice(ch(1)).direct.expect("direct voice");
    assert_eq!(direct.sound.channel_data.right_sample_data, SampleAddr::NULL);
}

#[test]
fn channels_outside_the_service_grant_are_invalid() {
    let service = Arc::new(SimCsndService::new());
    let hooks = Arc::new(SimSleepHooks::new());
    service.set_granted_channels(ChannelMask(0b0001));
    let arbiter = ChannelArbiter::new(service.clone(), hooks, ChannelMask::ALL);
    assert_eq!(arbiter.granted_channels(), ChannelMask::NONE);

    arbiter.initialize(false).unwrap();
    assert!(service.channels_acquired());
    assert_eq!(arbiter.granted_channels(), ChannelMask(0b0001));
    assert_eq!(arbiter.admissible_channels(), ChannelMask(0b0001));

    assert_eq!(arbiter.admit(2, 5, one_shot()), Err(ArbiterError::InvalidChannel(2)));
    assert!(!arbiter.is_playing(2));
    assert_eq!(arbiter.reap_finished().unwrap(), Vec::<ChannelIndex>::new());
    arbiter.admit(0, 5, one_shot()).unwrap();

    arbiter.set_channel_mask(ChannelMask(0b0110));
    assert_eq!(arbiter.admissible_channels(), ChannelMask::NONE);

    arbiter.teardown();
    assert!(!service.channels_acquired());
    assert!(!service.is_connected());
}

#[test]
fn channel_grant_failure_releases_the_session() {
    let service = Arc::new(SimCsndService::new());
    let hooks = Arc::new(SimSleepHooks::new());
    let arbiter = ChannelArbiter::new(service.clone(), hooks.clone(), ChannelMask::ALL);
    service.fail_next(SimOp::AcquireChannels, ServiceError::Rejected(0xC8A0_4000));

    assert_eq!(
        arbiter.initialize(true),
        Err(ArbiterError::ServiceUnavailable(ServiceError::Rejected(0xC8A0_4000)))
    );
    assert!(!service.is_connected());
    assert_eq!(hooks.installed(), 0);

    arbiter.initialize(true).unwrap();
    assert!(service.channels_acquired());
}

#[test]
fn finished_playback_is_reclaimed_on_admit() {
    let (service, _hooks, arbiter) = setup();
    arbiter.admit(1, 10, one_shot()).unwrap();
    service.finish_playback(ch(1));

    arbiter.admit(1, 20, mono_pcm16()).unwrap();
    assert_eq!(arbiter.channel_state(1).unwrap().priority, Some(prio(20)));
    assert_eq!(
        arbiter.bound_request(1).unwrap(),
        Some(PlaybackRequest::DirectSound(mono_pcm16()))
    );

    // Still audible: a lower priority stays rejected.
    assert_eq!(
        arbiter.admit(1, 25, one_shot()),
        Err(ArbiterError::ChannelBusy {
            channel: ch(1),
            current: prio(20),
        })
    );

    // A paused channel is never reclaimed.
    arbiter.admit(2, 10, one_shot()).unwrap();
    arbiter.pause(2, true).unwrap();
    assert!(matches!(
        arbiter.admit(2, 10, one_shot()),
        Err(ArbiterError::ChannelBusy { .. })
    ));
}

#[test]
fn failed_playback_query_keeps_channel_busy() {
    let (service, _hooks, arbiter) = setup();
    arbiter.admit(3, 10, one_shot()).unwrap();
    service.finish_playback(ch(3));
    service.fail_next(SimOp::QueryPlaying, ServiceError::Backend("ipc timeout".into()));

    assert!(matches!(
        arbiter.admit(3, 10, one_shot()),
        Err(ArbiterError::ChannelBusy { .. })
    ));
    arbiter.admit(3, 10, one_shot()).unwrap();
}
