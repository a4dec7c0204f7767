// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! In-memory display driver.
//!
//! [`SimulatedDriver`] keeps pipes, rotator sessions and counters in plain
//! collections and validates descriptors the way display hardware would
//! (destination inside the display mode, crop inside the source). Faults
//! can be injected per operation so that the failure paths of the overlay
//! core can be exercised without hardware.
//!
//! ```
//! use overlay::driver::{DisplayDriver, DisplayId};
//! use overlay::sim::SimulatedDriver;
//!
//! let mut driver = SimulatedDriver::new((1280, 800), None);
//! let pipe = driver.open_pipe(DisplayId::Panel)?;
//! assert_eq!(driver.open_pipes(), 1);
//! driver.close_pipe(pipe);
//! assert!(driver.open_pipe(DisplayId::External).is_err());
//! # Ok::<(), overlay::Error>(())
//! ```

use crate::driver::{
    BufferDescriptor, DisplayDriver, DisplayId, Memory, OverlayDescriptor, OverlayFlags,
    PipeHandle, RotatorParams, SessionId,
};
use crate::geometry::Size;
use crate::Error;
use std::collections::HashMap;

#[derive(Debug)]
struct SimPipe {
    display: DisplayId,
    desc: OverlayDescriptor,
    frames: u64,
}

/// Software stand-in for the display hardware.
#[derive(Debug)]
pub struct SimulatedDriver {
    panel: Size,
    external: Option<Size>,
    max_pipes: usize,
    next_handle: u32,
    pipes: HashMap<u32, SimPipe>,
    next_session: u32,
    sessions: HashMap<u32, RotatorParams>,
    opens: u64,
    commits: u64,
    rotations: u64,
    frames: u64,
    fail_open_after: Option<u64>,
    fail_commit_after: Option<u64>,
    fail_commit_once: Option<u64>,
    fail_rotator_start: bool,
    fail_rotator_apply: bool,
    fail_submit: bool,
}

impl SimulatedDriver {
    /// Creates a driver with a panel of `panel` pixels and, when given, a
    /// connected external display. Two pipes are available.
    pub fn new(panel: (i32, i32), external: Option<(i32, i32)>) -> Self {
        SimulatedDriver {
            panel: panel.into(),
            external: external.map(Size::from),
            max_pipes: 2,
            next_handle: 1,
            pipes: HashMap::new(),
            next_session: 1,
            sessions: HashMap::new(),
            opens: 0,
            commits: 0,
            rotations: 0,
            frames: 0,
            fail_open_after: None,
            fail_commit_after: None,
            fail_commit_once: None,
            fail_rotator_start: false,
            fail_rotator_apply: false,
            fail_submit: false,
        }
    }

    /// Sets how many pipes may be open at once.
    pub fn with_pipe_budget(mut self, pipes: usize) -> Self {
        self.max_pipes = pipes;
        self
    }

    /// Connects (`Some`) or disconnects (`None`) the external display.
    pub fn set_external(&mut self, external: Option<(i32, i32)>) {
        self.external = external.map(Size::from);
    }

    /// Lets `n` more pipe opens succeed, then fails every further one.
    pub fn fail_open_after(&mut self, n: u64) {
        self.fail_open_after = Some(self.opens + n);
    }

    /// Lets `n` more commits succeed, then fails every further one.
    pub fn fail_commit_after(&mut self, n: u64) {
        self.fail_commit_after = Some(self.commits + n);
    }

    /// Lets `n` more commits succeed, then fails exactly one.
    pub fn fail_commit_once(&mut self, n: u64) {
        self.fail_commit_once = Some(self.commits + n);
    }

    pub fn fail_rotator_start(&mut self, fail: bool) {
        self.fail_rotator_start = fail;
    }

    pub fn fail_rotator_apply(&mut self, fail: bool) {
        self.fail_rotator_apply = fail;
    }

    pub fn fail_submit(&mut self, fail: bool) {
        self.fail_submit = fail;
    }

    /// Removes every injected fault.
    pub fn clear_faults(&mut self) {
        self.fail_open_after = None;
        self.fail_commit_after = None;
        self.fail_commit_once = None;
        self.fail_rotator_start = false;
        self.fail_rotator_apply = false;
        self.fail_submit = false;
    }

    pub fn open_pipes(&self) -> usize {
        self.pipes.len()
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Frames rotated across all sessions.
    pub fn rotations(&self) -> u64 {
        self.rotations
    }

    /// Frames submitted across all pipes.
    pub fn frames_submitted(&self) -> u64 {
        self.frames
    }

    /// Descriptors committed across all pipes, failed ones excluded.
    pub fn commits(&self) -> u64 {
        self.commits
    }

    /// Current descriptor of an open pipe.
    pub fn descriptor(&self, pipe: PipeHandle) -> Option<OverlayDescriptor> {
        self.pipes.get(&pipe.0).map(|p| p.desc)
    }

    /// Descriptors of the pipes open on `display`, in handle order.
    pub fn pipes_on(&self, display: DisplayId) -> Vec<OverlayDescriptor> {
        let mut handles: Vec<&u32> = self
            .pipes
            .iter()
            .filter(|(_, p)| p.display == display)
            .map(|(h, _)| h)
            .collect();
        handles.sort();
        handles.into_iter().map(|h| self.pipes[h].desc).collect()
    }

    /// Frames submitted to one pipe.
    pub fn frames_on(&self, pipe: PipeHandle) -> u64 {
        self.pipes.get(&pipe.0).map(|p| p.frames).unwrap_or(0)
    }

    fn mode(&self, display: DisplayId) -> Option<Size> {
        match display {
            DisplayId::Panel => Some(self.panel),
            DisplayId::External => self.external,
        }
    }
}

impl DisplayDriver for SimulatedDriver {
    fn display_size(&mut self, display: DisplayId) -> Result<Size, Error> {
        self.mode(display)
            .ok_or_else(|| Error::Device(format!("{} display not connected", display)))
    }

    fn open_pipe(&mut self, display: DisplayId) -> Result<PipeHandle, Error> {
        if self.mode(display).is_none() {
            return Err(Error::Device(format!("{} display not connected", display)));
        }
        if self.fail_open_after.is_some_and(|limit| self.opens >= limit) {
            return Err(Error::Device("injected open failure".to_string()));
        }
        if self.pipes.len() >= self.max_pipes {
            return Err(Error::ResourceExhausted(format!(
                "all {} pipes in use",
                self.max_pipes
            )));
        }

        let handle = self.next_handle;
        self.next_handle += 1;
        self.opens += 1;
        self.pipes.insert(
            handle,
            SimPipe {
                display,
                desc: OverlayDescriptor::default(),
                frames: 0,
            },
        );
        log::trace!("sim: open pipe {} on {}", handle, display);
        Ok(PipeHandle(handle))
    }

    fn commit(
        &mut self,
        pipe: PipeHandle,
        desc: &OverlayDescriptor,
    ) -> Result<OverlayDescriptor, Error> {
        if self.fail_commit_after.is_some_and(|limit| self.commits >= limit) {
            return Err(Error::Device("injected commit failure".to_string()));
        }
        if self.fail_commit_once == Some(self.commits) {
            self.fail_commit_once = None;
            return Err(Error::Device("injected one-shot commit failure".to_string()));
        }
        let display = self
            .pipes
            .get(&pipe.0)
            .map(|p| p.display)
            .ok_or_else(|| Error::Device(format!("commit on closed pipe {}", pipe.0)))?;
        let mode = self
            .mode(display)
            .ok_or_else(|| Error::Device(format!("{} display not connected", display)))?;

        if !desc.crop.fits_within(desc.source) {
            return Err(Error::Device(format!(
                "crop {} outside source {}",
                desc.crop, desc.source
            )));
        }
        if !desc.dest.fits_within(mode) {
            return Err(Error::Device(format!(
                "destination {} outside {} mode {}",
                desc.dest, display, mode
            )));
        }

        let mut accepted = *desc;
        accepted.flags |= OverlayFlags::COMMITTED;
        if let Some(p) = self.pipes.get_mut(&pipe.0) {
            p.desc = accepted;
        }
        self.commits += 1;
        Ok(accepted)
    }

    fn read_descriptor(&mut self, pipe: PipeHandle) -> Result<OverlayDescriptor, Error> {
        self.descriptor(pipe)
            .ok_or_else(|| Error::Device(format!("read on closed pipe {}", pipe.0)))
    }

    fn close_pipe(&mut self, pipe: PipeHandle) {
        if self.pipes.remove(&pipe.0).is_none() {
            log::warn!("sim: close of unknown pipe {}", pipe.0);
        }
    }

    fn rotator_start(&mut self, params: &RotatorParams) -> Result<SessionId, Error> {
        if self.fail_rotator_start {
            return Err(Error::Device("injected rotator start failure".to_string()));
        }
        let id = self.next_session;
        self.next_session += 1;
        self.sessions.insert(id, *params);
        Ok(SessionId(id))
    }

    fn rotator_apply(
        &mut self,
        session: SessionId,
        src: &BufferDescriptor,
        dst_offset: u64,
    ) -> Result<(), Error> {
        if self.fail_rotator_apply {
            return Err(Error::Device("injected rotator failure".to_string()));
        }
        let params = self
            .sessions
            .get(&session.0)
            .ok_or_else(|| Error::Device(format!("unknown rotator session {}", session.0)))?;
        if matches!(src.memory, Memory::Rotator(_)) {
            return Err(Error::Device("rotator input must be client memory".to_string()));
        }
        if dst_offset >= params.slot_size * params.buffers as u64 {
            return Err(Error::Device(format!(
                "rotator output offset 0x{:x} out of range",
                dst_offset
            )));
        }
        self.rotations += 1;
        Ok(())
    }

    fn rotator_finish(&mut self, session: SessionId) {
        self.sessions.remove(&session.0);
    }

    fn submit_frame(&mut self, pipe: PipeHandle, buffer: &BufferDescriptor) -> Result<(), Error> {
        if self.fail_submit {
            return Err(Error::Device("injected submit failure".to_string()));
        }
        if let Memory::Rotator(session) = buffer.memory {
            if !self.sessions.contains_key(&session.0) {
                return Err(Error::Device(format!(
                    "frame from finished rotator session {}",
                    session.0
                )));
            }
        }
        let p = self
            .pipes
            .get_mut(&pipe.0)
            .ok_or_else(|| Error::Device(format!("submit on closed pipe {}", pipe.0)))?;
        p.frames += 1;
        self.frames += 1;
        Ok(())
    }
}
