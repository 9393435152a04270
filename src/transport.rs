use std::rc::Rc;

use crate::error::Result;

/// Host callback receiving every payload the engine emits.
///
/// Errors returned by the callback (typically a failing event handler) are
/// propagated by the transport out of whichever `submit` or `pump_once` call
/// delivered the payload.
pub type InboundCallback = Rc<dyn Fn(&str) -> Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    Continue,
    Stop,
}

/// Raw text submission and message pumping against an embedded engine.
///
/// Implementations must invoke the registered callback for payloads emitted
/// while evaluating a submitted program *before* `submit` returns. The
/// correlation channel relies on this to read results synchronously; when an
/// engine can only deliver later, the channel falls back to pumping with a
/// timeout.
pub trait Transport {
    /// Evaluate `program` inside the engine.
    fn submit(&self, program: &str) -> Result<()>;

    /// Run one iteration of the message pump.
    fn pump_once(&self, blocking: bool) -> Result<PumpStatus>;

    /// Register the single inbound callback for the lifetime of the transport.
    fn register_callback(&self, callback: InboundCallback) -> Result<()>;
}
