use crate::command::CommandId;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("buffer too short: need {needed} bytes, have {available}")]
    BufferTooShort { needed: usize, available: usize },
    #[error("unknown command id {0:#x}")]
    UnknownCommand(u16),
    #[error("command {0:?} is not handled")]
    UnsupportedCommand(CommandId),
    #[error("invalid value for field {0}")]
    InvalidField(&'static str),
    #[error("address {0:#010x} is not mapped")]
    UnmappedAddress(u32),
    #[error("command ring is full")]
    RingFull,
    #[error("command chain is corrupt at offset {0:#x}")]
    CorruptChain(u32),
}

pub(crate) fn ensure_len(buf: &[u8], needed: usize) -> Result<(), WireError> {
    if buf.len() < needed {
        return Err(WireError::BufferTooShort {
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}
