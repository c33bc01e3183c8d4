use crate::error::WireError;
use ncsnd_ports::types::SampleAddr;

pub trait AddressTranslator: Send + Sync {
    fn virt_to_phys(&self, addr: SampleAddr) -> Result<SampleAddr, WireError>;
}

#[derive(Clone, Copy, Debug)]
struct Window {
    virt_start: u32,
    virt_end: u32,
    phys_start: u32,
}

const CONSOLE_WINDOWS: [Window; 4] = [
    // Linear heap, legacy mapping.
    Window {
        virt_start: 0x1400_0000,
        virt_end: 0x1C00_0000,
        phys_start: 0x2000_0000,
    },
    // Linear heap, newer mapping.
    Window {
        virt_start: 0x3000_0000,
        virt_end: 0x4000_0000,
        phys_start: 0x2000_0000,
    },
    // VRAM
    Window {
        virt_start: 0x1F00_0000,
        virt_end: 0x1F60_0000,
        phys_start: 0x1800_0000,
    },
    // DSP memory
    Window {
        virt_start: 0x1FF0_0000,
        virt_end: 0x1FF8_0000,
        phys_start: 0x1FF0_0000,
    },
];

/// Fixed virtual windows of the console's application memory map.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearHeapTranslator;

impl AddressTranslator for LinearHeapTranslator {
    fn virt_to_phys(&self, addr: SampleAddr) -> Result<SampleAddr, WireError> {
        let raw = addr.get();
        CONSOLE_WINDOWS
            .iter()
            .find(|window| raw >= window.virt_start && raw < window.virt_end)
            .map(|window| SampleAddr(raw - window.virt_start + window.phys_start))
            .ok_or(WireError::UnmappedAddress(raw))
    }
}
