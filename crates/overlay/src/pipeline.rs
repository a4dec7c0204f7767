// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Rotator output ring.
//!
//! Buffers that need rotating pass through a fixed ring of output slots
//! before they reach a pipe. Frame `k` is rotated into slot `k mod N` and
//! that slot is handed to the display. No fence is waited on: the ring depth
//! alone guarantees that the rotated content of frame `k` stays untouched
//! until frame `k + N` is produced, so `N` must outlast the display latency.

use crate::driver::{BufferDescriptor, DisplayDriver, Memory, RotatorParams, SessionId};
use crate::Error;

/// Smallest ring that keeps one frame on screen while the next is rotated.
pub const MIN_BUFFERS: usize = 2;

/// One output slot of the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferSlot {
    /// Offset of the last source frame rotated into this slot
    pub source_offset: u64,
    /// Offset of this slot inside the session output memory
    pub rotated_offset: u64,
    /// Number of the frame rotated into this slot, `None` until first used
    pub frame: Option<u64>,
}

#[derive(Debug)]
pub struct RotationPipeline {
    session: SessionId,
    params: RotatorParams,
    slots: Vec<BufferSlot>,
    submitted: u64,
}

impl RotationPipeline {
    /// Opens a rotator session and lays out `params.buffers` slots back to
    /// back in its output memory.
    pub fn start<D: DisplayDriver>(driver: &mut D, params: RotatorParams) -> Result<Self, Error> {
        if params.buffers < MIN_BUFFERS {
            return Err(Error::InvalidArgument(format!(
                "rotator needs at least {} buffers, got {}",
                MIN_BUFFERS, params.buffers
            )));
        }

        let session = driver.rotator_start(&params)?;
        let slots = (0..params.buffers as u64)
            .map(|i| BufferSlot {
                rotated_offset: i * params.slot_size,
                ..BufferSlot::default()
            })
            .collect();

        log::debug!(
            "rotator session {:?}: {} {} {} x{} slots of {} bytes",
            session,
            params.source,
            params.format,
            params.transform,
            params.buffers,
            params.slot_size
        );

        Ok(RotationPipeline {
            session,
            params,
            slots,
            submitted: 0,
        })
    }

    /// Rotates `src` into the next slot and returns the rotated buffer.
    ///
    /// On failure the ring does not advance.
    pub fn submit<D: DisplayDriver>(
        &mut self,
        driver: &mut D,
        src: &BufferDescriptor,
    ) -> Result<BufferDescriptor, Error> {
        let index = (self.submitted % self.slots.len() as u64) as usize;
        let slot = &mut self.slots[index];

        driver.rotator_apply(self.session, src, slot.rotated_offset)?;

        slot.source_offset = src.offset;
        slot.frame = Some(self.submitted);
        self.submitted += 1;

        log::trace!(
            "rotated frame {} at 0x{:x} into slot {} (0x{:x})",
            self.submitted - 1,
            src.offset,
            index,
            slot.rotated_offset
        );

        Ok(BufferDescriptor {
            memory: Memory::Rotator(self.session),
            offset: slot.rotated_offset,
            timestamp: src.timestamp.clone(),
        })
    }

    /// Ends the session. Slot memory belongs to the session and is released
    /// with it.
    pub fn finish<D: DisplayDriver>(self, driver: &mut D) {
        log::debug!(
            "rotator session {:?} finished after {} frames",
            self.session,
            self.submitted
        );
        driver.rotator_finish(self.session);
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn params(&self) -> &RotatorParams {
        &self.params
    }

    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[BufferSlot] {
        &self.slots
    }

    /// Number of frames rotated so far.
    pub fn submitted(&self) -> u64 {
        self.submitted
    }
}
