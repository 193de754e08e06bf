//! Process-wide pool of scratch buffers.
//!
//! The writer rents its output buffer and its encoding scratch from here
//! and returns both on disposal, whichever exit path is taken. Returned
//! buffers are cleared before they become visible to the next renter; a
//! rented buffer is mutated only by its current owner.

use std::sync::{Mutex, OnceLock};

/// Capacity of freshly created pool buffers; doubles as the writer's
/// flush threshold.
pub(crate) const POOL_BUFFER_CAPACITY: usize = 8 * 1024;

/// How many returned buffers the pool retains before dropping extras.
const MAX_POOLED: usize = 8;

fn pool() -> &'static Mutex<Vec<Vec<u8>>> {
    static POOL: OnceLock<Mutex<Vec<Vec<u8>>>> = OnceLock::new();
    POOL.get_or_init(|| Mutex::new(Vec::new()))
}

/// Rent a cleared buffer with at least [`POOL_BUFFER_CAPACITY`] capacity.
pub(crate) fn acquire() -> Vec<u8> {
    let reused = pool().lock().ok().and_then(|mut held| held.pop());
    reused.unwrap_or_else(|| Vec::with_capacity(POOL_BUFFER_CAPACITY))
}

/// Return a buffer to the pool. Contents are cleared here so stale data
/// never leaks to the next renter.
pub(crate) fn release(mut buf: Vec<u8>) {
    buf.clear();
    if let Ok(mut held) = pool().lock() {
        if held.len() < MAX_POOLED {
            held.push(buf);
        }
    }
}
