//! Headless QuickJS engine used as a [`crate::transport::Transport`].

pub mod headless;
pub mod runtime;
pub mod seed;
mod shim;

pub use headless::HeadlessTransport;
pub use runtime::QuickJsEngine;
