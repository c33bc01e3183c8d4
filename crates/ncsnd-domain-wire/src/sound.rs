use crate::address::AddressTranslator;
use crate::command::Command;
use crate::direct_sound::to_physical;
use crate::error::WireError;
use crate::params::{pack_volume, timer_for_rate, ChannelFlags};
use ncsnd_ports::sound::{Encoding, Sound};
use ncsnd_ports::types::ChannelIndex;

/// Register writes that start `sound` on `channel`, in submission order.
pub fn sound_commands(
    channel: ChannelIndex,
    sound: &Sound,
    translator: &dyn AddressTranslator,
) -> Result<Vec<Command>, WireError> {
    let main = to_physical(translator, sound.address_space, sound.sample_data)?.get();
    // A one-shot never reads its loop register; leave it clear.
    let loop_start = if sound.loop_playback {
        to_physical(translator, sound.address_space, sound.loop_sample_data)?.get()
    } else {
        0
    };
    let chn = channel.get();

    let mut commands = Vec::with_capacity(4);
    if sound.encoding == Encoding::ImaAdpcm {
        commands.push(Command::SetAdpcmState {
            channel: chn,
            loop_block: false,
            sample: sound.context.data,
            index: sound.context.table_index,
        });
        commands.push(Command::SetAdpcmState {
            channel: chn,
            loop_block: true,
            sample: sound.loop_context.data,
            index: sound.loop_context.table_index,
        });
    }

    let timer = timer_for_rate(sound.sample_rate, sound.pitch);
    let flags = ChannelFlags::new(
        channel,
        sound.encoding,
        sound.loop_playback,
        sound.linear_interpolation,
        timer,
    );
    let volumes = pack_volume(sound.volume, sound.pan);
    commands.push(Command::SetChnParams {
        flags: flags.to_bits(),
        chn_volumes: volumes,
        cap_volumes: volumes,
        phys_addr0: main,
        phys_addr1: loop_start,
        total_size: sound.total_size_bytes,
    });

    // The first block is already running; narrow the repeat to the loop tail.
    if sound.loop_playback && loop_start > main {
        commands.push(Command::SetBlock {
            channel: chn,
            loop_block: true,
            phys_addr: loop_start,
            size: sound.total_size_bytes.saturating_sub(loop_start - main),
        });
    }

    Ok(commands)
}
