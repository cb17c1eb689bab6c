//! Shared slots: a small pool of reusable buffers that hand off data between
//! a producer and a worker through an explicit status word instead of a
//! lock held across an `await` point.
//!
//! This workspace forbids `unsafe_code` (see the root `Cargo.toml` lint
//! table), so "shared memory" here is an ordinary heap buffer behind a
//! mutex, not a raw memory-mapped region -- what is genuinely lock-free is
//! the `AtomicU32` status word, which any number of readers can poll
//! without contending on the payload lock. `SlotMetadata` is still laid out
//! the way a real shared-memory slot header would be (8-byte aligned, fixed
//! 16 bytes) so a future transport that does memory-map a region can adopt
//! the same shape.
//!
//! Status transitions: `Free -> Allocated -> DataReady -> Processing ->
//! ResultReady -> Free`, or `Processing -> Error -> Free` if the worker
//! fails. Each transition is a single CAS on the status word; the payload
//! (written while `Allocated`) and the result (written while `Processing`)
//! never overlap in time, so no two parties ever touch the buffer at once.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;

/// Slot lifecycle, matching the producer/worker/consumer handoff: a
/// producer allocates and writes input (`Allocated` -> `DataReady`), a
/// worker claims it and writes a result (`Processing` -> `ResultReady` or
/// `Error`), then the consumer reads the result and frees the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SlotStatus {
    Free = 0,
    Allocated = 1,
    DataReady = 2,
    Processing = 3,
    ResultReady = 4,
    Error = 5,
}

impl SlotStatus {
    fn from_u32(value: u32) -> Self {
        match value {
            1 => SlotStatus::Allocated,
            2 => SlotStatus::DataReady,
            3 => SlotStatus::Processing,
            4 => SlotStatus::ResultReady,
            5 => SlotStatus::Error,
            _ => SlotStatus::Free,
        }
    }
}

/// Fixed-size, 8-byte-aligned metadata carried alongside a slot's payload.
#[derive(Debug, Clone, Copy, Default)]
#[repr(C, align(8))]
pub struct SlotMetadata {
    /// Bumped every time the slot transitions back to `Free`, so a handle
    /// from a prior allocation can be detected as stale.
    pub generation: u64,
    /// Logical length of whatever buffer is currently valid (input while
    /// `DataReady`, result while `ResultReady`).
    pub len: u32,
    _reserved: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("unexpected slot status: {0:?}")]
    UnexpectedStatus(SlotStatus),
    #[error("stale slot handle: generation {handle} does not match current {current}")]
    StaleHandle { handle: u64, current: u64 },
}

/// A caller's claim on a slot, returned by [`SharedSlot::try_allocate`] and
/// [`SharedSlot::try_claim`]. Every subsequent call against the slot must
/// present the same handle; one taken from an earlier cycle is rejected as
/// stale once the slot has been freed and reallocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotHandle {
    generation: u64,
}

struct Inner {
    generation: u64,
    metadata: SlotMetadata,
    input: Vec<u8>,
    result: Vec<u8>,
    error: Option<String>,
}

/// One reusable buffer slot.
pub struct SharedSlot {
    status: AtomicU32,
    /// Mirrors `Inner::generation` so a handle can be checked without
    /// taking the payload lock.
    generation: AtomicU64,
    inner: Mutex<Inner>,
    notify: Notify,
}

impl SharedSlot {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: AtomicU32::new(SlotStatus::Free as u32),
            generation: AtomicU64::new(0),
            inner: Mutex::new(Inner {
                generation: 0,
                metadata: SlotMetadata::default(),
                input: Vec::new(),
                result: Vec::new(),
                error: None,
            }),
            notify: Notify::new(),
        }
    }

    /// Current status, readable without locking.
    #[must_use]
    pub fn status(&self) -> SlotStatus {
        SlotStatus::from_u32(self.status.load(Ordering::Acquire))
    }

    /// Producer side: claims a `Free` slot. Returns `None` if another
    /// caller already holds it.
    pub fn try_allocate(&self) -> Option<SlotHandle> {
        self.cas(SlotStatus::Free, SlotStatus::Allocated).ok()?;
        Some(SlotHandle { generation: self.generation.load(Ordering::Acquire) })
    }

    /// Producer side: writes the input buffer and marks the slot
    /// `DataReady`, waking any worker waiting in [`SharedSlot::wait_data`].
    pub fn publish(&self, handle: SlotHandle, data: &[u8]) -> Result<(), SlotError> {
        self.check_generation(handle)?;
        {
            let mut inner = self.inner.lock();
            inner.input.clear();
            inner.input.extend_from_slice(data);
            inner.metadata.len = data.len() as u32;
        }
        self.cas(SlotStatus::Allocated, SlotStatus::DataReady)?;
        self.notify.notify_waiters();
        Ok(())
    }

    /// Worker side: waits until input is available.
    pub async fn wait_data(&self) {
        while self.status() != SlotStatus::DataReady {
            self.notify.notified().await;
        }
    }

    /// Worker side: claims a `DataReady` slot for processing, returning the
    /// input bytes the producer published. The same `handle` must be used
    /// for [`SharedSlot::complete`] or [`SharedSlot::fail`].
    pub fn try_claim(&self, handle: SlotHandle) -> Result<Vec<u8>, SlotError> {
        self.check_generation(handle)?;
        self.cas(SlotStatus::DataReady, SlotStatus::Processing)?;
        Ok(self.inner.lock().input.clone())
    }

    /// Worker side: writes the result and marks the slot `ResultReady`.
    pub fn complete(&self, handle: SlotHandle, result: &[u8]) -> Result<(), SlotError> {
        self.check_generation(handle)?;
        {
            let mut inner = self.inner.lock();
            inner.result.clear();
            inner.result.extend_from_slice(result);
            inner.metadata.len = result.len() as u32;
            inner.error = None;
        }
        self.cas(SlotStatus::Processing, SlotStatus::ResultReady)?;
        self.notify.notify_waiters();
        Ok(())
    }

    /// Worker side: marks the slot `Error` instead of producing a result.
    pub fn fail(&self, handle: SlotHandle, message: impl Into<String>) -> Result<(), SlotError> {
        self.check_generation(handle)?;
        self.inner.lock().error = Some(message.into());
        self.cas(SlotStatus::Processing, SlotStatus::Error)?;
        self.notify.notify_waiters();
        Ok(())
    }

    /// Consumer side: waits until a result (or error) is available.
    pub async fn wait_result(&self) {
        while !matches!(self.status(), SlotStatus::ResultReady | SlotStatus::Error) {
            self.notify.notified().await;
        }
    }

    /// Consumer side: reads the outcome of a `ResultReady`/`Error` slot and
    /// releases it back to `Free`, bumping the generation so the handle (and
    /// any copy of it) becomes stale for the next cycle.
    pub fn take_result(&self, handle: SlotHandle) -> Result<Result<Vec<u8>, String>, SlotError> {
        let status = self.status();
        let outcome = match status {
            SlotStatus::ResultReady => {
                self.check_generation(handle)?;
                Ok(self.inner.lock().result.clone())
            }
            SlotStatus::Error => {
                self.check_generation(handle)?;
                Err(self.inner.lock().error.clone().unwrap_or_default())
            }
            other => return Err(SlotError::UnexpectedStatus(other)),
        };
        self.recycle();
        Ok(outcome)
    }

    /// Releases the slot from any non-`Free` status without reading it.
    /// Idempotent: calling this twice for the same handle, or a handle from
    /// an already-recycled generation, is a no-op the second time rather
    /// than an error -- double-free is a normal race in a cleanup path (a
    /// timeout racing a completion), not a bug to report.
    pub fn release(&self, handle: SlotHandle) {
        if self.check_generation(handle).is_err() {
            return;
        }
        if self.status() == SlotStatus::Free {
            return;
        }
        self.recycle();
    }

    fn recycle(&self) {
        let new_generation = {
            let mut inner = self.inner.lock();
            inner.input.clear();
            inner.result.clear();
            inner.error = None;
            inner.generation = inner.generation.wrapping_add(1);
            inner.metadata = SlotMetadata { generation: inner.generation, len: 0, _reserved: 0 };
            inner.generation
        };
        self.generation.store(new_generation, Ordering::Release);
        self.status.store(SlotStatus::Free as u32, Ordering::Release);
        self.notify.notify_waiters();
    }

    fn cas(&self, from: SlotStatus, to: SlotStatus) -> Result<(), SlotError> {
        self.status
            .compare_exchange(from as u32, to as u32, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|current| SlotError::UnexpectedStatus(SlotStatus::from_u32(current)))
    }

    fn check_generation(&self, handle: SlotHandle) -> Result<(), SlotError> {
        let current = self.generation.load(Ordering::Acquire);
        if handle.generation != current {
            return Err(SlotError::StaleHandle { handle: handle.generation, current });
        }
        Ok(())
    }
}

impl Default for SharedSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_round_trip_through_every_status() {
        let slot = SharedSlot::new();
        let handle = slot.try_allocate().unwrap();
        slot.publish(handle, b"hello").unwrap();
        assert_eq!(slot.status(), SlotStatus::DataReady);

        let input = slot.try_claim(handle).unwrap();
        assert_eq!(input, b"hello");
        assert_eq!(slot.status(), SlotStatus::Processing);

        slot.complete(handle, &[42, 43, 44]).unwrap();
        assert_eq!(slot.status(), SlotStatus::ResultReady);

        let result = slot.take_result(handle).unwrap().unwrap();
        assert_eq!(result, vec![42, 43, 44]);
        assert_eq!(slot.status(), SlotStatus::Free);
    }

    #[test]
    fn failed_worker_reports_error_and_frees_slot() {
        let slot = SharedSlot::new();
        let handle = slot.try_allocate().unwrap();
        slot.publish(handle, b"input").unwrap();
        slot.try_claim(handle).unwrap();
        slot.fail(handle, "boom").unwrap();
        assert_eq!(slot.status(), SlotStatus::Error);

        let outcome = slot.take_result(handle).unwrap();
        assert_eq!(outcome, Err("boom".to_string()));
        assert_eq!(slot.status(), SlotStatus::Free);
    }

    #[test]
    fn second_allocate_fails_while_held() {
        let slot = SharedSlot::new();
        let _handle = slot.try_allocate().unwrap();
        assert!(slot.try_allocate().is_none());
    }

    #[test]
    fn double_release_is_idempotent() {
        let slot = SharedSlot::new();
        let handle = slot.try_allocate().unwrap();
        slot.release(handle);
        assert_eq!(slot.status(), SlotStatus::Free);
        slot.release(handle);
        assert_eq!(slot.status(), SlotStatus::Free);
    }

    #[test]
    fn stale_handle_is_rejected_after_reallocation() {
        let slot = SharedSlot::new();
        let first = slot.try_allocate().unwrap();
        slot.release(first);
        let second = slot.try_allocate().unwrap();
        assert_ne!(first, second);
        assert_eq!(
            slot.publish(first, b"stale"),
            Err(SlotError::StaleHandle { handle: first.generation, current: second.generation })
        );
    }

    #[tokio::test]
    async fn wait_data_resolves_after_publish() {
        let slot = std::sync::Arc::new(SharedSlot::new());
        let handle = slot.try_allocate().unwrap();

        let waiter = {
            let slot = slot.clone();
            tokio::spawn(async move {
                slot.wait_data().await;
            })
        };

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        slot.publish(handle, b"data").unwrap();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn wait_result_resolves_after_complete() {
        let slot = std::sync::Arc::new(SharedSlot::new());
        let handle = slot.try_allocate().unwrap();
        slot.publish(handle, b"data").unwrap();
        slot.try_claim(handle).unwrap();

        let waiter = {
            let slot = slot.clone();
            tokio::spawn(async move {
                slot.wait_result().await;
            })
        };

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        slot.complete(handle, b"done").unwrap();
        waiter.await.unwrap();
    }
}
