//! Error handling.

use heapless::spsc::Queue;

/// All possible error types
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Error {
    AdcReadFailed,
    HeadlightGpioWriteFailed,
    NavIlluminationGpioWriteFailed,
}

impl Error {
    /// Record the error, dropping the oldest entry if the queue is full.
    pub fn log<const N: usize>(&self, queue: &mut Queue<Self, N>) {
        match queue.enqueue(*self) {
            Ok(()) => { /* Enqueued */ }
            Err(e) => {
                queue.dequeue();
                queue.enqueue(e).ok();
            }
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::AdcReadFailed => "LDR: ADC conversion failed",
            Self::HeadlightGpioWriteFailed => "Headlight relay GPIO write failed",
            Self::NavIlluminationGpioWriteFailed => "Nav illumination relay GPIO write failed",
        }
    }
}
