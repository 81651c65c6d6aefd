// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::cell::Cell;
use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::ptr::NonNull;
use std::rc::Rc;

use anyhow::anyhow;
use anyhow::bail;

use crate::device::GpuAllocator;
use crate::device::GpuObject;
use crate::device::ModeSource;
use crate::device::RegisterChannel;
use crate::device::RegisterWriteRequest;
use crate::DisplayMode;
use crate::OutputId;

const WRAPPED_BUFFER_SIZE: usize = 4096;

/// Allocator backed by heap memory. Objects are kept alive until destroyed so
/// tests can inspect what was written to them.
#[derive(Default)]
pub struct MockAllocator {
    objects: RefCell<HashMap<u64, Box<[u8]>>>,
    next_id: Cell<u64>,
    pub fail_allocate: Cell<bool>,
    pub fail_wrap: Cell<bool>,
    pub fail_wait_idle: Cell<bool>,
    pub allocations: Cell<usize>,
    pub wraps: Cell<usize>,
    pub waits: Cell<usize>,
    pub destroyed: Cell<usize>,
}

impl MockAllocator {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn live_objects(&self) -> usize {
        self.objects.borrow().len()
    }

    fn create(&self, size: usize, gtt_offset_in_page: u32) -> GpuObject {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let mut storage = vec![0u8; size].into_boxed_slice();
        // Boxed slices never move their contents, so the pointer stays valid
        // while the box sits in `objects`.
        let ptr = NonNull::new(storage.as_mut_ptr()).unwrap_or(NonNull::dangling());
        self.objects.borrow_mut().insert(id, storage);
        // SAFETY: the storage is owned by `objects` until `destroy`.
        unsafe { GpuObject::new(id, ptr, size, gtt_offset_in_page) }
    }
}

impl GpuAllocator for MockAllocator {
    fn allocate(&self, size: usize, alignment: usize) -> anyhow::Result<GpuObject> {
        if self.fail_allocate.get() {
            bail!("out of GPU memory");
        }
        assert!(alignment.is_power_of_two());
        self.allocations.set(self.allocations.get() + 1);
        let gtt = 0x100 + self.next_id.get() as u32;
        Ok(self.create(size, gtt))
    }

    fn wrap(&self, handle: u32, size: usize) -> anyhow::Result<GpuObject> {
        if self.fail_wrap.get() {
            bail!("no such buffer {}", handle);
        }
        self.wraps.set(self.wraps.get() + 1);
        Ok(self.create(size.max(WRAPPED_BUFFER_SIZE), 0x1000 + handle))
    }

    fn wait_idle(&self, _object: &GpuObject) -> anyhow::Result<()> {
        self.waits.set(self.waits.get() + 1);
        if self.fail_wait_idle.get() {
            bail!("wait idle timed out");
        }
        Ok(())
    }

    fn destroy(&self, object: GpuObject) -> anyhow::Result<()> {
        self.destroyed.set(self.destroyed.get() + 1);
        self.objects
            .borrow_mut()
            .remove(&object.id())
            .map(|_| ())
            .ok_or_else(|| anyhow!("unknown object {}", object.id()))
    }
}

/// Records every register write. Queued failures are returned in order before
/// any request succeeds.
#[derive(Clone, Default)]
pub struct MockRegisterChannel {
    pub requests: Rc<RefCell<Vec<RegisterWriteRequest>>>,
    pub failures: Rc<RefCell<VecDeque<String>>>,
}

impl MockRegisterChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, reason: &str) {
        self.failures.borrow_mut().push_back(reason.to_owned());
    }

    pub fn count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn last(&self) -> Option<RegisterWriteRequest> {
        self.requests.borrow().last().copied()
    }
}

impl RegisterChannel for MockRegisterChannel {
    fn write_registers(&mut self, request: &mut RegisterWriteRequest) -> anyhow::Result<()> {
        if let Some(reason) = self.failures.borrow_mut().pop_front() {
            bail!(reason);
        }
        self.requests.borrow_mut().push(*request);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockModeSource {
    pub modes: RefCell<HashMap<OutputId, DisplayMode>>,
}

impl MockModeSource {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn set_mode(&self, output: OutputId, width: u32, height: u32) {
        self.modes.borrow_mut().insert(output, DisplayMode { width, height });
    }
}

impl ModeSource for MockModeSource {
    fn active_mode(&self, output: OutputId) -> Option<DisplayMode> {
        self.modes.borrow().get(&output).copied()
    }
}
