use std::{
    any,
    ops::Deref,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use bytemuck::Pod;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error(
        "Out of device memory allocating `{label}`: {requested} bytes requested, {available} available"
    )]
    OutOfMemory {
        label: String,
        requested: usize,
        available: usize,
    },
}

/// Device memory pool with a fixed byte budget.
/// Buffers hold on to their share of the budget until they are dropped.
#[derive(Debug)]
pub struct DeviceMemory {
    budget: usize,
    used: AtomicUsize,
}

impl DeviceMemory {
    pub fn new(budget: usize) -> Arc<DeviceMemory> {
        Arc::new(DeviceMemory {
            budget,
            used: AtomicUsize::new(0),
        })
    }

    pub fn unlimited() -> Arc<DeviceMemory> {
        Self::new(usize::MAX)
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    pub fn available(&self) -> usize {
        self.budget.saturating_sub(self.used())
    }

    /// Moves the data into a new device buffer, failing if it doesn't fit the remaining budget.
    pub fn upload<T: Pod>(
        self: &Arc<Self>,
        label: impl Into<String>,
        data: Vec<T>,
    ) -> Result<DeviceBuffer<T>, ResourceError> {
        let label = label.into();
        let size = std::mem::size_of_val(data.as_slice());

        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(size).filter(|total| *total <= self.budget)
            })
            .map_err(|used| ResourceError::OutOfMemory {
                label: label.clone(),
                requested: size,
                available: self.budget.saturating_sub(used),
            })?;

        log::debug!(
            "Allocating device buffer `{label}`; ty={}, size={size}",
            any::type_name::<T>(),
        );

        Ok(DeviceBuffer {
            label,
            data,
            size,
            memory: Arc::clone(self),
        })
    }
}

/// Immutable buffer living in device memory.
#[derive(Debug)]
pub struct DeviceBuffer<T> {
    label: String,
    data: Vec<T>,
    size: usize,
    memory: Arc<DeviceMemory>,
}

impl<T: Pod> DeviceBuffer<T> {
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

impl<T> DeviceBuffer<T> {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl<T> Deref for DeviceBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> Drop for DeviceBuffer<T> {
    fn drop(&mut self) {
        log::trace!("Releasing device buffer `{}`; size={}", self.label, self.size);
        self.memory.used.fetch_sub(self.size, Ordering::AcqRel);
    }
}
