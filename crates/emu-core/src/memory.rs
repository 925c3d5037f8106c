//! Memory regions and the address-mapped system bus.

use std::rc::Rc;

use thiserror::Error;

use crate::{Bus, Clock};

/// A mappable span of the 64 KiB address space.
///
/// Plain storage and memory-mapped devices implement the same trait;
/// offsets are relative to the region's base address. A device that does
/// work on access reports its cost through [`Region::access_cycles`] and
/// the bus charges it on top of the standard one cycle per access, so
/// device time lands on the same timeline the CPU uses.
pub trait Region {
    /// Read the byte at `offset`.
    fn read(&mut self, offset: u16) -> u8;

    /// Write the byte at `offset`.
    fn write(&mut self, offset: u16, value: u8);

    /// Number of addressable bytes in this region.
    fn size(&self) -> usize;

    /// Extra clock cycles one access to this region costs beyond the
    /// standard bus cycle. Zero for plain storage.
    fn access_cycles(&self) -> u64 {
        0
    }
}

impl Region for Box<dyn Region> {
    fn read(&mut self, offset: u16) -> u8 {
        self.as_mut().read(offset)
    }

    fn write(&mut self, offset: u16, value: u8) {
        self.as_mut().write(offset, value);
    }

    fn size(&self) -> usize {
        self.as_ref().size()
    }

    fn access_cycles(&self) -> u64 {
        self.as_ref().access_cycles()
    }
}

/// Plain byte-addressable RAM, zero-filled.
pub struct Ram {
    bytes: Vec<u8>,
}

impl Ram {
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    /// RAM pre-loaded with an image (useful for test fixtures).
    #[must_use]
    pub fn from_image(image: &[u8]) -> Self {
        Self {
            bytes: image.to_vec(),
        }
    }
}

impl Region for Ram {
    fn read(&mut self, offset: u16) -> u8 {
        self.bytes[offset as usize]
    }

    fn write(&mut self, offset: u16, value: u8) {
        self.bytes[offset as usize] = value;
    }

    fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Read-only memory.
///
/// Writes are squelched, as on hardware with the write-enable line unwired;
/// a debug log records the attempt.
pub struct Rom {
    bytes: Vec<u8>,
}

impl Rom {
    #[must_use]
    pub fn new(image: Vec<u8>) -> Self {
        Self { bytes: image }
    }
}

impl Region for Rom {
    fn read(&mut self, offset: u16) -> u8 {
        self.bytes[offset as usize]
    }

    fn write(&mut self, offset: u16, value: u8) {
        log::debug!("write to ROM ignored: ${value:02X} at offset ${offset:04X}");
    }

    fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Errors detected while assembling a memory map.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("region at ${start:04X} has zero size")]
    EmptyRegion { start: u16 },

    #[error("region at ${start:04X} ({size} bytes) runs past the end of the address space")]
    OutOfRange { start: u16, size: usize },

    #[error("region at ${second:04X} overlaps the region at ${first:04X}")]
    Overlap { first: u16, second: u16 },
}

struct Mapping {
    start: u16,
    /// Last address inside the region (inclusive).
    end: u16,
    region: Box<dyn Region>,
}

impl Mapping {
    fn contains(&self, address: u16) -> bool {
        (self.start..=self.end).contains(&address)
    }
}

/// Builder for [`SystemBus`]; regions are validated when the map is built.
pub struct SystemBusBuilder {
    clock: Rc<Clock>,
    regions: Vec<(u16, Box<dyn Region>)>,
}

impl SystemBusBuilder {
    #[must_use]
    pub fn new(clock: Rc<Clock>) -> Self {
        Self {
            clock,
            regions: Vec::new(),
        }
    }

    /// Map `region` starting at `start`.
    #[must_use]
    pub fn region(mut self, start: u16, region: impl Region + 'static) -> Self {
        self.regions.push((start, Box::new(region)));
        self
    }

    /// Validate the map and produce the bus.
    ///
    /// A malformed map (empty region, region past $FFFF, overlap) is a
    /// configuration error and nothing is built.
    pub fn build(self) -> Result<SystemBus, MapError> {
        let mut mappings = Vec::with_capacity(self.regions.len());
        for (start, region) in self.regions {
            let size = region.size();
            if size == 0 {
                return Err(MapError::EmptyRegion { start });
            }
            let end = u32::from(start) + size as u32 - 1;
            if end > 0xFFFF {
                return Err(MapError::OutOfRange { start, size });
            }
            mappings.push(Mapping {
                start,
                end: end as u16,
                region,
            });
        }

        mappings.sort_by_key(|m| m.start);
        for pair in mappings.windows(2) {
            if pair[1].start <= pair[0].end {
                return Err(MapError::Overlap {
                    first: pair[0].start,
                    second: pair[1].start,
                });
            }
        }

        Ok(SystemBus {
            clock: self.clock,
            mappings,
        })
    }
}

/// Address-mapped bus: routes every access to exactly one region and
/// charges the shared clock for it.
///
/// Address-to-region resolution is a pure function of the address. An
/// unmapped access panics: the map is part of the session configuration,
/// and a hole in it is a broken machine description, not recoverable
/// emulated-program behavior.
pub struct SystemBus {
    clock: Rc<Clock>,
    mappings: Vec<Mapping>,
}

impl std::fmt::Debug for SystemBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemBus")
            .field("clock", &self.clock)
            .field(
                "mappings",
                &self
                    .mappings
                    .iter()
                    .map(|m| (m.start, m.end))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl SystemBus {
    #[must_use]
    pub fn builder(clock: Rc<Clock>) -> SystemBusBuilder {
        SystemBusBuilder::new(clock)
    }

    /// Whether `address` resolves to a region.
    #[must_use]
    pub fn is_mapped(&self, address: u16) -> bool {
        self.mappings.iter().any(|m| m.contains(address))
    }

    /// Read without charging the clock — debugger/test path, not an
    /// emulated access.
    pub fn peek(&mut self, address: u16) -> u8 {
        let index = self.mapping_index(address);
        let mapping = &mut self.mappings[index];
        mapping.region.read(address - mapping.start)
    }

    fn mapping_index(&self, address: u16) -> usize {
        self.mappings
            .iter()
            .position(|m| m.contains(address))
            .unwrap_or_else(|| panic!("unmapped address ${address:04X}: broken memory map"))
    }
}

impl Bus for SystemBus {
    fn read(&mut self, address: u16) -> u8 {
        let index = self.mapping_index(address);
        let mapping = &mut self.mappings[index];
        let value = mapping.region.read(address - mapping.start);
        self.clock.advance(1 + mapping.region.access_cycles());
        log::trace!("bus read  ${address:04X} -> ${value:02X}");
        value
    }

    fn write(&mut self, address: u16, value: u8) {
        let index = self.mapping_index(address);
        let mapping = &mut self.mappings[index];
        mapping.region.write(address - mapping.start, value);
        self.clock.advance(1 + mapping.region.access_cycles());
        log::trace!("bus write ${address:04X} <- ${value:02X}");
    }

    fn write_range(&mut self, address: u16, bytes: &[u8]) {
        for (i, &byte) in bytes.iter().enumerate() {
            let address = address.wrapping_add(i as u16);
            let index = self.mapping_index(address);
            let mapping = &mut self.mappings[index];
            mapping.region.write(address - mapping.start, byte);
        }
    }
}
