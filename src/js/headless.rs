use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::rc::Rc;

use anyhow::{anyhow, bail, Context as AnyhowContext};
use base64::Engine as _;
use percent_encoding::percent_decode_str;
use rquickjs::{Function, Object};
use tracing::{debug, info};

use super::runtime::QuickJsEngine;
use super::seed::document_tree;
use super::shim::DOM_SHIM;
use crate::config::WindowConfig;
use crate::error::{BridgeError, Result};
use crate::transport::{InboundCallback, PumpStatus, Transport};

const BLANK_DOCUMENT: &str = "<html><body></body></html>";

/// [`Transport`] over an in-process QuickJS engine with a minimal DOM.
///
/// Payloads passed to `external.invoke` are queued while a program runs and
/// handed to the callback once evaluation returns, still inside `submit`.
/// Callbacks may therefore submit again without re-entering the engine lock.
/// UI input is simulated by queueing scripts that later `pump_once` calls run.
pub struct HeadlessTransport {
    engine: QuickJsEngine,
    outbox: Rc<RefCell<VecDeque<String>>>,
    input: RefCell<VecDeque<String>>,
    callback: RefCell<Option<InboundCallback>>,
    stop_requested: Rc<Cell<bool>>,
    debug: bool,
}

impl HeadlessTransport {
    /// Start an engine and load the document named by `config.url`.
    ///
    /// With `config.debug` set, every submitted program and every payload the
    /// engine emits is traced at `info` under the `quickjs` target.
    pub fn open(config: &WindowConfig) -> Result<Self> {
        let html = load_document(config).map_err(BridgeError::Engine)?;
        let mut transport = Self::with_html(&html)?;
        transport.debug = config.debug;
        Ok(transport)
    }

    pub fn with_html(html: &str) -> Result<Self> {
        let engine = QuickJsEngine::new().map_err(BridgeError::Engine)?;
        let transport = Self {
            engine,
            outbox: Rc::new(RefCell::new(VecDeque::new())),
            input: RefCell::new(VecDeque::new()),
            callback: RefCell::new(None),
            stop_requested: Rc::new(Cell::new(false)),
            debug: false,
        };
        transport.install().map_err(BridgeError::Engine)?;
        transport.seed(html).map_err(BridgeError::Engine)?;
        info!(target: "quickjs", "headless document loaded");
        Ok(transport)
    }

    /// Queue a script simulating user input; one runs per pump iteration.
    pub fn queue_input(&self, script: impl Into<String>) {
        self.input.borrow_mut().push_back(script.into());
    }

    /// Queue a click on the element with the given `id` attribute.
    pub fn click_element(&self, id: &str) {
        self.queue_input(format!("document.getElementById('{id}').click();"));
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn pending_input(&self) -> usize {
        self.input.borrow().len()
    }

    /// Make the next pump iteration report [`PumpStatus::Stop`].
    pub fn exit(&self) {
        self.stop_requested.set(true);
    }

    fn install(&self) -> anyhow::Result<()> {
        let outbox = Rc::clone(&self.outbox);
        let stop = Rc::clone(&self.stop_requested);
        self.engine.with_context(move |ctx| {
            let global = ctx.globals();
            let external = Object::new(ctx.clone())?;

            let invoke = Function::new(
                ctx.clone(),
                move |payload: String| -> rquickjs::Result<()> {
                    outbox.borrow_mut().push_back(payload);
                    Ok(())
                },
            )?
            .with_name("invoke")?;
            external.set("invoke", invoke)?;

            let exit = Function::new(ctx.clone(), move || -> rquickjs::Result<()> {
                stop.set(true);
                Ok(())
            })?
            .with_name("exit")?;
            external.set("exit", exit)?;

            global.set("external", external)?;
            Ok(())
        })?;
        self.engine.eval(DOM_SHIM, "dom-shim.js")
    }

    fn seed(&self, html: &str) -> anyhow::Result<()> {
        let tree = document_tree(html)?;
        let json = serde_json::to_string(&tree)?;
        self.engine
            .eval(&format!("__seed_document({json});"), "seed.js")
            .context("failed to seed headless document")
    }

    fn evaluate(&self, program: &str, filename: &str) -> Result<()> {
        if self.debug {
            info!(target: "quickjs", filename, program, "evaluate");
        }
        let outcome = self.engine.eval(program, filename);
        // Payloads emitted before a failure are still delivered.
        let delivered = self.deliver_outbox();
        outcome.map_err(|err| BridgeError::evaluation(program, format!("{err:#}")))?;
        delivered
    }

    fn deliver_outbox(&self) -> Result<()> {
        loop {
            let next = self.outbox.borrow_mut().pop_front();
            let Some(payload) = next else {
                return Ok(());
            };
            if self.debug {
                info!(target: "quickjs", payload = %payload, "inbound payload");
            }
            let callback = self.callback.borrow().clone();
            match callback {
                Some(callback) => callback(&payload)?,
                None => debug!(target: "quickjs", "payload emitted before a callback was registered"),
            }
        }
    }
}

impl Transport for HeadlessTransport {
    fn submit(&self, program: &str) -> Result<()> {
        self.evaluate(program, "submit.js")
    }

    fn pump_once(&self, blocking: bool) -> Result<PumpStatus> {
        if self.stop_requested.get() {
            return Ok(PumpStatus::Stop);
        }

        let next = self.input.borrow_mut().pop_front();
        match next {
            Some(script) => self.evaluate(&script, "input.js")?,
            None => {
                self.engine.drain_jobs().map_err(BridgeError::Engine)?;
                self.deliver_outbox()?;
                if blocking {
                    // Nothing else can produce input for a headless engine.
                    debug!(target: "quickjs", "input exhausted; stopping");
                    return Ok(PumpStatus::Stop);
                }
            }
        }

        if self.stop_requested.get() {
            Ok(PumpStatus::Stop)
        } else {
            Ok(PumpStatus::Continue)
        }
    }

    fn register_callback(&self, callback: InboundCallback) -> Result<()> {
        let mut slot = self.callback.borrow_mut();
        if slot.is_some() {
            return Err(BridgeError::CallbackAlreadyRegistered);
        }
        *slot = Some(callback);
        Ok(())
    }
}

fn load_document(config: &WindowConfig) -> anyhow::Result<String> {
    let Some(url) = config.parsed_url()? else {
        return Ok(BLANK_DOCUMENT.to_string());
    };

    match url.scheme() {
        "data" => decode_data_url(config.url.trim()),
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| anyhow!("invalid file URL {url}"))?;
            fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))
        }
        other => bail!("headless transport cannot load {other} URLs"),
    }
}

fn decode_data_url(raw: &str) -> anyhow::Result<String> {
    let body = raw
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("not a data URL"))?;
    let (media, data) = body
        .split_once(',')
        .ok_or_else(|| anyhow!("data URL without payload"))?;

    if media.ends_with(";base64") {
        let bytes = base64::engine::general_purpose::STANDARD.decode(data)?;
        return Ok(String::from_utf8(bytes)?);
    }
    Ok(percent_decode_str(data).decode_utf8()?.into_owned())
}
