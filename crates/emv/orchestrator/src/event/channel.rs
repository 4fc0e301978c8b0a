//! Channel-based delivery of kernel callbacks and step events

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};

use crate::event::{KernelEvent, StepEvent};

/// Sender for kernel callbacks, handed to the kernel adapter
pub type KernelEventSender = Sender<KernelEvent>;
/// Receiver for kernel callbacks, drained by [`Orchestrator::run`](crate::Orchestrator::run)
pub type KernelEventReceiver = Receiver<KernelEvent>;

/// Sender for step events
pub type StepEventSender = Sender<StepEvent>;
/// Receiver for step events
pub type StepEventReceiver = Receiver<StepEvent>;

/// Create an unbounded channel for kernel callbacks
pub fn kernel_event_channel() -> (KernelEventSender, KernelEventReceiver) {
    unbounded()
}

/// Create a bounded channel with the specified capacity for kernel callbacks
pub fn bounded_kernel_event_channel(capacity: usize) -> (KernelEventSender, KernelEventReceiver) {
    bounded(capacity)
}

/// Create an unbounded channel for step events
pub fn step_event_channel() -> (StepEventSender, StepEventReceiver) {
    unbounded()
}
