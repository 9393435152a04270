use std::any::type_name;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::transport::{PumpStatus, Transport};

/// Request/response emulation over the transport's single inbound callback.
///
/// Every value-returning call gets its own correlation token and result slot.
/// Slots are keyed by token, so an event handler that submits while an outer
/// call is still waiting never disturbs the outer slot.
pub struct Channel {
    transport: Rc<dyn Transport>,
    config: BridgeConfig,
    slots: RefCell<HashMap<String, Option<JsonValue>>>,
}

impl Channel {
    pub fn new(transport: Rc<dyn Transport>, config: BridgeConfig) -> Self {
        Self {
            transport,
            config,
            slots: RefCell::new(HashMap::new()),
        }
    }

    pub fn transport(&self) -> &Rc<dyn Transport> {
        &self.transport
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Submit a program whose value is not needed.
    pub fn submit(&self, program: &str) -> Result<()> {
        debug!(target: "tether::channel", program, "submit");
        self.transport.submit(program)
    }

    /// Evaluate `expression` in the engine and decode its value as `T`.
    ///
    /// An absent or `null` value decodes to `T::default()`.
    pub fn submit_for_value<T>(&self, expression: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let token = Uuid::new_v4().to_string();
        self.slots.borrow_mut().insert(token.clone(), None);

        let program = self.wrap_expression(&token, expression);
        let outcome = self
            .submit(&program)
            .and_then(|()| self.await_slot(&token, expression));

        // The slot goes away on every path, filled or not.
        let value = self.slots.borrow_mut().remove(&token).flatten();
        outcome?;

        decode_value(value.unwrap_or(JsonValue::Null))
    }

    /// Fill the slot for `token`. Returns `false` when no call is waiting on it.
    pub fn deliver(&self, token: &str, value: JsonValue) -> bool {
        let mut slots = self.slots.borrow_mut();
        match slots.get_mut(token) {
            Some(slot) if slot.is_some() => {
                warn!(target: "tether::channel", token, "duplicate result delivery ignored");
                false
            }
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => {
                warn!(target: "tether::channel", token, "result for unknown correlation dropped");
                false
            }
        }
    }

    /// Number of value-returning calls currently waiting for their result.
    pub fn pending_correlations(&self) -> usize {
        self.slots.borrow().len()
    }

    fn wrap_expression(&self, token: &str, expression: &str) -> String {
        format!(
            "{invoke}(JSON.stringify({{kind: 'result', token: '{token}', value: ({expression})}}));",
            invoke = self.config.invoke_function,
        )
    }

    fn is_filled(&self, token: &str) -> bool {
        matches!(self.slots.borrow().get(token), Some(Some(_)))
    }

    fn await_slot(&self, token: &str, expression: &str) -> Result<()> {
        if self.is_filled(token) {
            return Ok(());
        }

        warn!(
            target: "tether::channel",
            token,
            "engine did not answer synchronously; pumping until the result arrives"
        );
        let timeout = self.config.result_timeout();
        let started = Instant::now();
        while started.elapsed() < timeout {
            let status = self.transport.pump_once(false)?;
            if self.is_filled(token) {
                return Ok(());
            }
            if status == PumpStatus::Stop {
                break;
            }
        }

        Err(BridgeError::ResultTimeout {
            expression: expression.to_string(),
            waited: started.elapsed(),
        })
    }
}

pub(crate) fn decode_value<T>(value: JsonValue) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value.clone()).map_err(|err| BridgeError::Deserialization {
        expected: type_name::<T>(),
        payload: value.to_string(),
        reason: err.to_string(),
    })
}
