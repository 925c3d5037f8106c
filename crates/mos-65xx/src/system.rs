//! Per-session bundle of clock, bus and CPU.
//!
//! One `System` is one independent emulation session: its own clock, its
//! own memory map, its own CPU. Nothing is global, so sessions can be
//! created side by side (and thrown away) freely — which is also what
//! makes the test suites cheap to write.

use std::rc::Rc;

use thiserror::Error;

use emu_core::{Bus, Clock, MapError, Ram, Region, Rom, SystemBus};

use crate::cpu::{Mos65xx, NMI_VECTOR, RESET_VECTOR, StepError};
use crate::variant::Variant;

/// Errors detected while assembling a session.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Map(#[from] MapError),

    /// The six bytes at $FFFA-$FFFF must be readable: they hold the NMI,
    /// reset and IRQ/BRK vectors.
    #[error("vector byte ${0:04X} is not mapped")]
    UnmappedVector(u16),
}

/// Session configuration surface: variant, memory layout, initial images.
pub struct SystemBuilder {
    variant: Variant,
    regions: Vec<(u16, Box<dyn Region>)>,
    images: Vec<(u16, Vec<u8>)>,
}

impl SystemBuilder {
    #[must_use]
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            regions: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Map zero-filled RAM at `start`.
    #[must_use]
    pub fn ram(self, start: u16, size: usize) -> Self {
        self.device(start, Ram::new(size))
    }

    /// Map ROM contents at `start`.
    #[must_use]
    pub fn rom(self, start: u16, image: Vec<u8>) -> Self {
        self.device(start, Rom::new(image))
    }

    /// Map any region (including device-backed ones) at `start`.
    #[must_use]
    pub fn device(mut self, start: u16, region: impl Region + 'static) -> Self {
        self.regions.push((start, Box::new(region)));
        self
    }

    /// Queue an image to be bulk-stored once the map is built. Lands via
    /// region writes, so ROM contents belong in the ROM image instead.
    #[must_use]
    pub fn load(mut self, address: u16, bytes: &[u8]) -> Self {
        self.images.push((address, bytes.to_vec()));
        self
    }

    /// Queue the reset vector contents.
    #[must_use]
    pub fn reset_vector(self, target: u16) -> Self {
        let bytes = target.to_le_bytes();
        self.load(RESET_VECTOR, &bytes)
    }

    /// Validate the configuration and assemble the session.
    ///
    /// Fails fast on a malformed memory map or if any vector byte is left
    /// unmapped; nothing half-built is returned.
    pub fn build(self) -> Result<System, BuildError> {
        let clock = Rc::new(Clock::new());

        let mut builder = SystemBus::builder(Rc::clone(&clock));
        for (start, region) in self.regions {
            builder = builder.region(start, region);
        }
        let mut bus = builder.build()?;

        for address in NMI_VECTOR..=0xFFFF {
            if !bus.is_mapped(address) {
                return Err(BuildError::UnmappedVector(address));
            }
        }

        for (address, bytes) in &self.images {
            bus.write_range(*address, bytes);
        }

        let cpu = Mos65xx::with_clock(self.variant, Rc::clone(&clock));
        Ok(System { clock, bus, cpu })
    }
}

/// One emulation session: clock + memory bus + CPU.
#[derive(Debug)]
pub struct System {
    clock: Rc<Clock>,
    bus: SystemBus,
    cpu: Mos65xx,
}

impl System {
    #[must_use]
    pub fn builder(variant: Variant) -> SystemBuilder {
        SystemBuilder::new(variant)
    }

    /// Run the CPU reset sequence against this session's bus.
    pub fn reset(&mut self) {
        self.cpu.reset(&mut self.bus);
    }

    /// Execute one instruction; see [`Mos65xx::step`].
    pub fn step(&mut self) -> Result<u64, StepError> {
        self.cpu.step(&mut self.bus)
    }

    /// Execute up to `count` instructions, returning total cycles.
    pub fn run(&mut self, count: u64) -> Result<u64, StepError> {
        let mut total = 0;
        for _ in 0..count {
            total += self.step()?;
        }
        Ok(total)
    }

    #[must_use]
    pub fn cpu(&self) -> &Mos65xx {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Mos65xx {
        &mut self.cpu
    }

    pub fn bus_mut(&mut self) -> &mut SystemBus {
        &mut self.bus
    }

    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }
}
