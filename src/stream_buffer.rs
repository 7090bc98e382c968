/*
    netmd-tfs-fs

    Copyright 2026 netmd-tfs-fs contributors

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the "Software"),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    src/stream_buffer.rs

    Holds the partial contents of a track being recovered from the device,
    and lets readers wait for enough bytes to arrive without blocking the
    single-threaded callback dispatcher. Mirrors the "decorator that wraps a
    lock around every method" discipline the teacher applies in
    `disk_lock`, adapted to async so a waiter can suspend without holding
    the lock across its `.await` (spec.md §4.3, §5).
*/
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

#[derive(Default)]
struct Inner {
    contents: Vec<u8>,
    complete: bool,
}

/// A growable, append-only buffer standing in for a track's recovered
/// bytes. Cheap to clone (shares the same underlying state).
#[derive(Clone)]
pub struct StreamBuffer {
    inner: Arc<Mutex<Inner>>,
    /// Fired whenever `append` or `mark_complete` changes the buffer, so
    /// that `get_contents` can re-check its threshold.
    changed: Arc<Notify>,
    /// Set once a transfer has been started for this buffer, so concurrent
    /// readers only trigger a single device transfer (spec.md §4.3: "a
    /// single transfer is started per buffer regardless of how many
    /// readers call getContents").
    started: Arc<Mutex<bool>>,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            changed: Arc::new(Notify::new()),
            started: Arc::new(Mutex::new(false)),
        }
    }

    /// Creates a buffer that is already complete, for data that is
    /// available up-front (a freshly written file, before it is sealed).
    pub fn with_contents(data: Vec<u8>, complete: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                contents: data,
                complete,
            })),
            changed: Arc::new(Notify::new()),
            started: Arc::new(Mutex::new(true)),
        }
    }

    /// Appends `bytes` and wakes any waiter whose threshold may now be
    /// satisfied. Runs to completion under the lock (spec.md §5).
    pub async fn append(&self, bytes: &[u8]) {
        {
            let mut inner = self.inner.lock().await;
            inner.contents.extend_from_slice(bytes);
        }
        self.changed.notify_waiters();
    }

    /// Marks the buffer as permanently done and releases every remaining
    /// waiter, whatever bytes arrived or didn't.
    pub async fn mark_complete(&self) {
        {
            let mut inner = self.inner.lock().await;
            inner.complete = true;
        }
        self.changed.notify_waiters();
    }

    pub async fn is_complete(&self) -> bool {
        self.inner.lock().await.complete
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.contents.len()
    }

    /// The "check-and-start" latch from spec.md §4.3: returns `true` only
    /// the first time it is called for this buffer, so the caller knows
    /// whether it must be the one to kick off a device transfer.
    pub async fn start_once(&self) -> bool {
        let mut started = self.started.lock().await;
        if *started {
            false
        }
        else {
            *started = true;
            true
        }
    }

    /// Returns up to `length` bytes starting at `start`, waiting for more
    /// data to arrive if necessary. Short once `complete` is set and fewer
    /// than `length` bytes remain (spec.md §4.3, testable property 5).
    pub async fn get_contents(&self, start: usize, length: usize) -> Vec<u8> {
        loop {
            let notified = self.changed.notified();
            {
                let inner = self.inner.lock().await;
                let available = inner.contents.len();
                if inner.complete || available >= start.saturating_add(length) {
                    let end = (start + length).min(available);
                    if start >= available {
                        return Vec::new();
                    }
                    return inner.contents[start..end].to_vec();
                }
            }
            notified.await;
        }
    }
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new()
    }
}
