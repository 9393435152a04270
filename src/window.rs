use std::rc::Rc;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tracing::info;

use crate::channel::Channel;
use crate::config::{BridgeConfig, WindowConfig};
use crate::document::Document;
use crate::error::Result;
use crate::js::HeadlessTransport;
use crate::transport::{PumpStatus, Transport};

const BLANK_PAGE: &str = "<html><body></body></html>";

/// Encode `html` as a `data:text/html` URL.
pub fn url_from_html(html: &str) -> String {
    format!(
        "data:text/html,{}",
        utf8_percent_encode(html, NON_ALPHANUMERIC)
    )
}

/// Collects window settings before a transport is opened.
#[derive(Debug, Clone, Default)]
pub struct WindowBuilder {
    config: WindowConfig,
}

impl WindowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: WindowConfig) -> Self {
        Self { config }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    pub fn resizable(mut self, resizable: bool) -> Self {
        self.config.resizable = resizable;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Load `html` directly instead of a URL.
    pub fn with_html(mut self, html: &str) -> Self {
        self.config.url = url_from_html(html);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    pub fn with_bridge_config(mut self, bridge: BridgeConfig) -> Self {
        self.config.bridge = bridge;
        self
    }

    /// The settings a transport will be opened with.
    pub fn config(&self) -> WindowConfig {
        let mut config = self.config.clone();
        if config.url.trim().is_empty() {
            config.url = url_from_html(BLANK_PAGE);
        }
        config
    }

    /// Open a transport with `open` and attach a document to it.
    pub fn build_with<T, F>(self, open: F) -> Result<Window<T>>
    where
        T: Transport + 'static,
        F: FnOnce(&WindowConfig) -> Result<T>,
    {
        let config = self.config();
        let transport = Rc::new(open(&config)?);
        let shared: Rc<dyn Transport> = transport.clone();
        let document = Document::open(shared, config.bridge.clone())?;
        info!(
            target: "tether::window",
            title = %config.title,
            width = config.width,
            height = config.height,
            "window created"
        );
        Ok(Window {
            transport,
            document,
            config,
        })
    }

    pub fn build_headless(self) -> Result<Window<HeadlessTransport>> {
        self.build_with(HeadlessTransport::open)
    }
}

/// A transport together with the document bound to it.
pub struct Window<T: Transport + 'static> {
    transport: Rc<T>,
    document: Document,
    config: WindowConfig,
}

impl<T: Transport + 'static> Window<T> {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn javascript(&self) -> &Channel {
        self.document.javascript()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Run `setup`, then pump until the transport reports [`PumpStatus::Stop`].
    ///
    /// Handler errors end the loop and are returned.
    pub fn render<F>(&self, setup: F) -> Result<()>
    where
        F: FnOnce(&Self) -> Result<()>,
    {
        setup(self)?;
        info!(target: "tether::window", title = %self.config.title, "entering message loop");

        let mut iterations = 0usize;
        while self.transport.pump_once(true)? == PumpStatus::Continue {
            iterations += 1;
        }

        info!(target: "tether::window", iterations, "message loop finished");
        Ok(())
    }
}
