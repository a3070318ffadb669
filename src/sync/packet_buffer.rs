use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};

use super::types::FramePacket;

struct State {
    deque: VecDeque<FramePacket>,
    closed: bool,
}

/// Bounded handoff buffer between the assembler and the consumer.
///
/// `push` never blocks: when the buffer is full the oldest packet is
/// dropped, so a slow consumer always sees the freshest packets. `pop`
/// blocks while the buffer is empty and open, and returns `None` once the
/// buffer has been closed and drained.
pub struct PacketBuffer {
    state: Mutex<State>,
    cond: Condvar,
    capacity: usize,
    pushed: AtomicU64,
    dropped: AtomicU64,
}

impl PacketBuffer {
    /// Create a buffer holding at most `capacity` packets (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                deque: VecDeque::with_capacity(capacity.max(1)),
                closed: false,
            }),
            cond: Condvar::new(),
            capacity: capacity.max(1),
            pushed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Append a packet, dropping the oldest one first when full. Packets
    /// pushed after `close` are discarded.
    pub fn push(&self, packet: FramePacket) {
        let mut state = self.state.lock();
        if state.closed {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if state.deque.len() == self.capacity {
            state.deque.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        state.deque.push_back(packet);
        self.pushed.fetch_add(1, Ordering::Relaxed);
        drop(state);
        self.cond.notify_one();
    }

    /// Remove and return the oldest packet, blocking while the buffer is
    /// empty. Returns `None` once the buffer is closed and drained.
    pub fn pop(&self) -> Option<FramePacket> {
        let mut state = self.state.lock();
        loop {
            if let Some(packet) = state.deque.pop_front() {
                return Some(packet);
            }
            if state.closed {
                return None;
            }
            self.cond.wait(&mut state);
        }
    }

    /// Stop accepting packets and wake every blocked consumer.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.cond.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().deque.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total packets accepted so far.
    pub fn pushed(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    /// Total packets discarded, either to make room or after close.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
