// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Cooperative cancellation of long running reads and writes.
//!
//! Reads poll their interrupt once per fetched chunk, writes once per
//! copied column. An interrupt that returns an error aborts the operation;
//! buffers and statements are released and the connection stays usable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result, Status};

/// Decides whether an in-progress operation should stop.
pub trait Interrupt {
    /// Return an error to abort the operation.
    fn check(&self) -> Result<()>;
}

impl<F> Interrupt for F
where
    F: Fn() -> Result<()>,
{
    fn check(&self) -> Result<()> {
        self()
    }
}

/// An interrupt that never fires.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInterrupt;

impl Interrupt for NoInterrupt {
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

/// A flag shared between the thread running an operation and any thread
/// that wants to cancel it.
#[derive(Debug, Default, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can be reused.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

impl Interrupt for CancellationToken {
    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(cancelled())
        } else {
            Ok(())
        }
    }
}

/// The error an interrupt reports when it fires.
pub fn cancelled() -> Error {
    Error::with_message_and_status("Operation cancelled", Status::Cancelled)
}

type Handler = Arc<dyn Fn() -> Result<()> + Send + Sync>;

static GLOBAL_HANDLER: RwLock<Option<Handler>> = RwLock::new(None);

/// Install the process-wide interrupt handler, replacing any previous one.
///
/// The handler is polled at the same points as the interrupt passed to an
/// operation, after it.
pub fn set_interrupt_handler<F>(handler: F)
where
    F: Fn() -> Result<()> + Send + Sync + 'static,
{
    let mut guard = GLOBAL_HANDLER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = Some(Arc::new(handler));
}

/// Remove the process-wide interrupt handler.
pub fn clear_interrupt_handler() {
    let mut guard = GLOBAL_HANDLER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = None;
}

pub fn has_interrupt_handler() -> bool {
    GLOBAL_HANDLER
        .read()
        .map(|guard| guard.is_some())
        .unwrap_or(false)
}

/// Poll `interrupt`, then the process-wide handler if one is installed.
pub fn poll(interrupt: &dyn Interrupt) -> Result<()> {
    interrupt.check()?;
    let handler = GLOBAL_HANDLER
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    match handler {
        Some(handler) => handler(),
        None => Ok(()),
    }
}
