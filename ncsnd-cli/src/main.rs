use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ncsnd_core::{ArbiterError, ChannelArbiter};
use ncsnd_infra_sim::{SimCsndService, SimSleepHooks};
use ncsnd_infra_storage_fs::FsSettings;
use ncsnd_ports::power::PowerEvent;
use ncsnd_ports::settings::{ArbiterSettings, SettingsPort};
use ncsnd_ports::sound::{DirectSound, Encoding, Sound};
use ncsnd_ports::types::{ChannelIndex, SampleAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Buffers inside the simulated linear heap.
const PCM16_BUFFER: SampleAddr = SampleAddr(0x1400_0000);
const ADPCM_LEFT: SampleAddr = SampleAddr(0x1401_0000);
const ADPCM_RIGHT: SampleAddr = SampleAddr(0x1402_0000);
const LOOP_BUFFER: SampleAddr = SampleAddr(0x1403_0000);

#[derive(Parser, Debug)]
#[command(name = "ncsnd")]
#[command(about = "Drives the CSND channel arbiter against the simulated service")]
#[command(version)]
struct Args {
    /// Settings file; defaults to the per-user config directory
    #[arg(short, long, env = "NCSND_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Admit, preempt, reject and stop on one channel
    Scenario,
    /// Pause playback across a sleep/wake cycle
    Sleep,
    /// Play a looped sound and reap it once the hardware finishes
    Loop,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ncsnd=debug,ncsnd_core=debug,ncsnd_infra_sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let settings = load_settings(args.settings.as_ref())?;
    info!(mask = settings.channel_mask.0, "settings loaded");

    let service = Arc::new(SimCsndService::new());
    let hooks = Arc::new(SimSleepHooks::new());
    let arbiter = ChannelArbiter::from_settings(service.clone(), hooks.clone(), &settings);
    arbiter
        .initialize(settings.install_sleep_hook)
        .context("failed to initialize arbiter")?;

    match args.command.unwrap_or(Cmd::Scenario) {
        Cmd::Scenario => run_scenario(&arbiter)?,
        Cmd::Sleep => run_sleep(&arbiter, &hooks, settings.default_priority)?,
        Cmd::Loop => run_loop(&arbiter, &service, settings.default_priority)?,
    }

    arbiter.teardown();
    Ok(())
}

fn load_settings(path: Option<&PathBuf>) -> Result<ArbiterSettings> {
    let settings = match path {
        Some(path) => FsSettings::load_from(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => FsSettings::default().load_settings()?,
    };
    Ok(settings)
}

fn run_scenario(arbiter: &ChannelArbiter) -> Result<()> {
    let mono = DirectSound::mono(Encoding::Pcm16, 32_728, PCM16_BUFFER, 0x4000);
    arbiter.admit(0, 10, mono)?;
    print_state(arbiter, 0)?;

    let stereo = DirectSound::stereo(Encoding::ImaAdpcm, 32_728, ADPCM_LEFT, ADPCM_RIGHT, 0x2000);
    arbiter.admit(0, 5, stereo)?;
    print_state(arbiter, 0)?;

    let late = DirectSound::mono(Encoding::Pcm8, 16_364, PCM16_BUFFER, 0x1000);
    match arbiter.admit(0, 20, late) {
        Err(err @ ArbiterError::ChannelBusy { .. }) => info!(%err, "low priority request rejected"),
        Err(err) => return Err(err.into()),
        Ok(()) => bail!("priority 20 unexpectedly preempted priority 5"),
    }
    print_state(arbiter, 0)?;

    arbiter.stop(0)?;
    info!(playing = arbiter.is_playing(0), "channel 0 stopped");
    Ok(())
}

fn run_sleep(
    arbiter: &ChannelArbiter,
    hooks: &SimSleepHooks,
    priority: u32,
) -> Result<()> {
    let mut background = DirectSound::mono(Encoding::Pcm16, 32_728, PCM16_BUFFER, 0x4000);
    background.modifiers.play_on_sleep = true;
    let effect = Sound::one_shot(Encoding::Pcm16, 22_050, LOOP_BUFFER, 0x8000);

    let channels: Vec<ChannelIndex> = arbiter.admissible_channels().channels().take(2).collect();
    let &[first, second] = channels.as_slice() else {
        bail!("sleep demo needs two admissible channels");
    };
    arbiter.admit(first.get() as u32, priority, background)?;
    arbiter.admit(second.get() as u32, priority, effect)?;

    hooks.fire(PowerEvent::Sleep);
    print_state(arbiter, first.get() as u32)?;
    print_state(arbiter, second.get() as u32)?;

    hooks.fire(PowerEvent::Wakeup);
    print_state(arbiter, second.get() as u32)?;
    Ok(())
}

fn run_loop(
    arbiter: &ChannelArbiter,
    service: &SimCsndService,
    priority: u32,
) -> Result<()> {
    let Some(channel) = arbiter.admissible_channels().channels().next() else {
        bail!("no admissible channel");
    };
    let tail = SampleAddr(LOOP_BUFFER.get() + 0x1000);
    let sound = Sound::looped(Encoding::Pcm16, 44_100, LOOP_BUFFER, tail, 0x4000);
    arbiter.admit(channel.get() as u32, priority, sound)?;
    arbiter.set_volume(channel.get() as u32, 0.5, -0.25)?;

    for command in service.executed_commands() {
        info!(?command, "service executed");
    }

    service.finish_playback(channel);
    let reaped = arbiter.reap_finished()?;
    info!(?reaped, "reaped finished channels");
    Ok(())
}

fn print_state(arbiter: &ChannelArbiter, channel: u32) -> Result<()> {
    let snapshot = arbiter.channel_state(channel)?;
    println!("{}", serde_json::to_string(&snapshot)?);
    Ok(())
}
