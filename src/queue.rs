//! The transmit queue: a FIFO of frames awaiting their turn to go out.
//!
//! The original driver left concurrent access to this queue as a `TODO:
//! wrap with semaphore`; per the spec, the application pushing a frame and
//! the MAC state machine popping one are genuinely concurrent, so this is
//! treated as mandatory rather than deferred — access is serialized with a
//! [`critical_section::Mutex`].

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;

use crate::frame::Frame;
use crate::{RX_QUEUE_CNT, TX_QUEUE_CNT};

/// A frame queued for transmission at or after `at_time_ms`.
#[derive(Clone)]
pub struct TxEntry {
    pub frame: Frame,
    pub at_time_ms: u32,
}

/// Fixed-capacity FIFO of [`TX_QUEUE_CNT`] outbound frames.
pub struct TxQueue {
    inner: Mutex<RefCell<Deque<TxEntry, TX_QUEUE_CNT>>>,
}

/// Why [`TxQueue::push`] refused an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueFull;

impl Default for TxQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TxQueue {
    pub const fn new() -> Self {
        TxQueue {
            inner: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Enqueues `entry`. Fails with [`QueueFull`] once [`TX_QUEUE_CNT`]
    /// frames are already queued; the caller decides whether to drop the
    /// frame or retry.
    pub fn push(&self, entry: TxEntry) -> Result<(), QueueFull> {
        critical_section::with(|cs| {
            self.inner
                .borrow_ref_mut(cs)
                .push_back(entry)
                .map_err(|_| QueueFull)
        })
    }

    /// Pops the oldest queued frame, or `None` if the queue is empty.
    pub fn pop(&self) -> Option<TxEntry> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).pop_front())
    }

    pub fn is_empty(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).is_empty())
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).len())
    }
}

/// Fixed-capacity FIFO of [`RX_QUEUE_CNT`] inbound frames, handed off from
/// [`crate::mac::Mac`]'s `Rxing` state to whatever the application does
/// with a received frame (spec.md §2: "parses it, and routes it upward").
pub struct RxQueue {
    inner: Mutex<RefCell<Deque<Frame, RX_QUEUE_CNT>>>,
}

impl Default for RxQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RxQueue {
    pub const fn new() -> Self {
        RxQueue {
            inner: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Enqueues a received `frame`. Fails with [`QueueFull`] once
    /// [`RX_QUEUE_CNT`] frames are already queued; the caller (the MAC
    /// state machine) drops the frame rather than block.
    pub fn push(&self, frame: Frame) -> Result<(), QueueFull> {
        critical_section::with(|cs| {
            self.inner
                .borrow_ref_mut(cs)
                .push_back(frame)
                .map_err(|_| QueueFull)
        })
    }

    /// Pops the oldest received frame, or `None` if none are queued.
    pub fn pop(&self) -> Option<Frame> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).pop_front())
    }

    pub fn is_empty(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).is_empty())
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Pid;

    fn entry(at: u32) -> TxEntry {
        let mut frm = Frame::new();
        frm.set_protocol(Pid::CsmaV0);
        TxEntry { frame: frm, at_time_ms: at }
    }

    #[test]
    fn fifo_order() {
        let q = TxQueue::new();
        q.push(entry(1)).unwrap();
        q.push(entry(2)).unwrap();
        assert_eq!(q.pop().unwrap().at_time_ms, 1);
        assert_eq!(q.pop().unwrap().at_time_ms, 2);
        assert!(q.pop().is_none());
    }

    #[test]
    fn rejects_push_past_capacity() {
        let q = TxQueue::new();
        for i in 0..TX_QUEUE_CNT {
            q.push(entry(i as u32)).unwrap();
        }
        assert_eq!(q.push(entry(99)), Err(QueueFull));
    }

    fn frame() -> Frame {
        let mut frm = Frame::new();
        frm.set_protocol(Pid::CsmaV0);
        frm
    }

    #[test]
    fn rx_queue_fifo_order() {
        let q = RxQueue::new();
        let mut a = frame();
        a.set_net_id(1);
        let mut b = frame();
        b.set_net_id(2);
        q.push(a).unwrap();
        q.push(b).unwrap();
        assert_eq!(q.pop().unwrap().fctl().bits(), 0x20);
        assert_eq!(q.len(), 1);
        q.pop().unwrap();
        assert!(q.pop().is_none());
    }

    #[test]
    fn rx_queue_rejects_push_past_capacity() {
        let q = RxQueue::new();
        for _ in 0..RX_QUEUE_CNT {
            q.push(frame()).unwrap();
        }
        assert_eq!(q.push(frame()), Err(QueueFull));
    }
}
