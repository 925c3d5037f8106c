//! Memory bus interface.

/// Memory bus interface.
///
/// The CPU accesses memory and peripherals through this trait. The bus
/// handles address decoding and routing to the appropriate region, and is
/// responsible for charging the session clock for whatever each access
/// costs — the CPU never sees region-side delays directly, only the clock.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);

    /// Bulk-store a byte sequence starting at `address`.
    ///
    /// Initialization path for program images and vector contents, not an
    /// emulated access: implementations must not charge clock cycles here.
    fn write_range(&mut self, address: u16, bytes: &[u8]) {
        for (i, &byte) in bytes.iter().enumerate() {
            self.write(address.wrapping_add(i as u16), byte);
        }
    }

    /// Read a little-endian 16-bit word as two `read` calls.
    ///
    /// Used for the reset/NMI/IRQ vectors and indirect pointers; costs both
    /// reads' cycles.
    fn read_word(&mut self, address: u16) -> u16 {
        let low = self.read(address);
        let high = self.read(address.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }
}
