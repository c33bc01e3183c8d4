use crate::command::{Command, CommandId, COMMAND_PARAM_WORDS};
use crate::error::{ensure_len, WireError};
use byteorder::{ByteOrder, LittleEndian};

pub const COMMAND_ENTRY_SIZE: u32 = 0x20;
pub const DEFAULT_COMMAND_BLOCK_SIZE: u32 = 0x2000;

const END_OF_CHAIN: u16 = 0xFFFF;
const OFF_NEXT: usize = 0;
const OFF_ID: usize = 2;
const OFF_DONE: usize = 4;
const OFF_PARAMS: usize = 8;

/// Write side of the command list living at the start of shared memory.
///
/// Entries are 0x20 bytes: next offset, command id, a completion flag word,
/// a reserved word, then six parameter words. The cursor wraps at the end
/// of the block.
#[derive(Clone, Debug)]
pub struct CommandRing {
    block_size: u32,
    start: u32,
    cursor: u32,
    pending: u32,
}

impl CommandRing {
    pub fn new(block_size: u32) -> Self {
        let block_size = (block_size / COMMAND_ENTRY_SIZE).max(1) * COMMAND_ENTRY_SIZE;
        Self {
            block_size,
            start: 0,
            cursor: 0,
            pending: 0,
        }
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn capacity(&self) -> u32 {
        self.block_size / COMMAND_ENTRY_SIZE
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }

    pub fn push(&mut self, mem: &mut [u8], command: &Command) -> Result<(), WireError> {
        ensure_len(mem, self.block_size as usize)?;
        if self.pending == self.capacity() {
            return Err(WireError::RingFull);
        }

        if self.pending > 0 {
            let prev = if self.cursor >= COMMAND_ENTRY_SIZE {
                self.cursor - COMMAND_ENTRY_SIZE
            } else {
                self.block_size - COMMAND_ENTRY_SIZE
            };
            LittleEndian::write_u16(&mut mem[prev as usize + OFF_NEXT..], self.cursor as u16);
        }

        let entry = &mut mem[self.cursor as usize..(self.cursor + COMMAND_ENTRY_SIZE) as usize];
        LittleEndian::write_u16(&mut entry[OFF_NEXT..], END_OF_CHAIN);
        LittleEndian::write_u16(&mut entry[OFF_ID..], command.id() as u16);
        LittleEndian::write_u16(&mut entry[OFF_DONE..], 0);
        LittleEndian::write_u16(&mut entry[OFF_DONE + 2..], 0);
        for (i, word) in command.params().iter().enumerate() {
            LittleEndian::write_u32(&mut entry[OFF_PARAMS + i * 4..], *word);
        }

        self.cursor += COMMAND_ENTRY_SIZE;
        if self.cursor >= self.block_size {
            self.cursor = 0;
        }
        self.pending += 1;
        Ok(())
    }

    /// Hands off everything pushed so far. Returns the offset of the first
    /// entry of the batch, or `None` when nothing was written.
    pub fn take_batch(&mut self) -> Option<u32> {
        if self.pending == 0 {
            return None;
        }
        let start = self.start;
        self.start = self.cursor;
        self.pending = 0;
        Some(start)
    }
}

/// Walks a submitted batch from `start` to its end marker.
pub fn read_chain(mem: &[u8], block_size: u32, start: u32) -> Result<Vec<Command>, WireError> {
    ensure_len(mem, block_size as usize)?;
    let capacity = block_size / COMMAND_ENTRY_SIZE;

    let mut commands = Vec::new();
    let mut offset = start;
    for _ in 0..capacity {
        if offset % COMMAND_ENTRY_SIZE != 0 || offset >= block_size {
            return Err(WireError::CorruptChain(offset));
        }
        let entry = &mem[offset as usize..(offset + COMMAND_ENTRY_SIZE) as usize];
        let next = LittleEndian::read_u16(&entry[OFF_NEXT..]);
        let id = CommandId::try_from(LittleEndian::read_u16(&entry[OFF_ID..]))?;

        let mut params = [0u32; COMMAND_PARAM_WORDS];
        for (i, word) in params.iter_mut().enumerate() {
            *word = LittleEndian::read_u32(&entry[OFF_PARAMS + i * 4..]);
        }
        commands.push(Command::decode(id, &params)?);

        if next == END_OF_CHAIN {
            return Ok(commands);
        }
        offset = next as u32;
    }
    Err(WireError::CorruptChain(offset))
}

pub fn mark_batch_done(mem: &mut [u8], start: u32) {
    if let Some(flag) = mem.get_mut(start as usize + OFF_DONE) {
        *flag = 1;
    }
}

pub fn is_batch_done(mem: &[u8], start: u32) -> bool {
    mem.get(start as usize + OFF_DONE)
        .map(|flag| *flag != 0)
        .unwrap_or(false)
}
