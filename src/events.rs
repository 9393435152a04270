//! Closed table of the UI events forwarded from the engine, and their typed
//! argument values.

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventFamily {
    Mouse,
    Keyboard,
    Focus,
}

const MOUSE_FIELDS: &[&str] = &[
    "type",
    "isTrusted",
    "altKey",
    "button",
    "buttons",
    "clientX",
    "clientY",
    "ctrlKey",
    "metaKey",
    "movementX",
    "movementY",
    "offsetX",
    "offsetY",
    "pageX",
    "pageY",
    "screenX",
    "screenY",
    "shiftKey",
    "which",
];

const KEYBOARD_FIELDS: &[&str] = &[
    "type",
    "isTrusted",
    "altKey",
    "ctrlKey",
    "metaKey",
    "shiftKey",
    "key",
    "code",
    "location",
    "repeat",
    "isComposing",
];

const FOCUS_FIELDS: &[&str] = &["type", "isTrusted"];

/// Every event kind the engine side forwards, in a stable order.
pub const EVENT_KINDS: &[(&str, EventFamily)] = &[
    ("click", EventFamily::Mouse),
    ("contextmenu", EventFamily::Mouse),
    ("dblclick", EventFamily::Mouse),
    ("mousedown", EventFamily::Mouse),
    ("mouseenter", EventFamily::Mouse),
    ("mouseleave", EventFamily::Mouse),
    ("mousemove", EventFamily::Mouse),
    ("mouseout", EventFamily::Mouse),
    ("mouseover", EventFamily::Mouse),
    ("mouseup", EventFamily::Mouse),
    ("keydown", EventFamily::Keyboard),
    ("keyup", EventFamily::Keyboard),
    ("keypress", EventFamily::Keyboard),
    ("focus", EventFamily::Focus),
    ("blur", EventFamily::Focus),
];

impl EventFamily {
    /// Engine-native field names serialised for every event of this family.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Mouse => MOUSE_FIELDS,
            Self::Keyboard => KEYBOARD_FIELDS,
            Self::Focus => FOCUS_FIELDS,
        }
    }

    pub fn for_kind(kind: &str) -> Option<Self> {
        EVENT_KINDS
            .iter()
            .find(|(name, _)| *name == kind)
            .map(|(_, family)| *family)
    }
}

/// Kind -> field list mapping handed to the engine-side forwarding listeners.
pub fn forwarding_table() -> JsonValue {
    let table: JsonMap<String, JsonValue> = EVENT_KINDS
        .iter()
        .map(|(kind, family)| {
            let fields = family
                .fields()
                .iter()
                .map(|field| JsonValue::String((*field).to_string()))
                .collect();
            ((*kind).to_string(), JsonValue::Array(fields))
        })
        .collect();
    JsonValue::Object(table)
}

/// Coordinates are fractional on zoomed or high-DPI pages.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MouseEventArgs {
    #[serde(rename = "type")]
    pub event_type: String,
    pub is_trusted: bool,
    pub alt_key: bool,
    pub button: i32,
    pub buttons: i32,
    pub client_x: f64,
    pub client_y: f64,
    pub ctrl_key: bool,
    pub meta_key: bool,
    pub movement_x: f64,
    pub movement_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub page_x: f64,
    pub page_y: f64,
    pub screen_x: f64,
    pub screen_y: f64,
    pub shift_key: bool,
    pub which: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyboardEventArgs {
    #[serde(rename = "type")]
    pub event_type: String,
    pub is_trusted: bool,
    pub alt_key: bool,
    pub ctrl_key: bool,
    pub meta_key: bool,
    pub shift_key: bool,
    pub key: String,
    pub code: String,
    pub location: i32,
    pub repeat: bool,
    pub is_composing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusEventArgs {
    #[serde(rename = "type")]
    pub event_type: String,
    pub is_trusted: bool,
}

/// Typed arguments passed to host event handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum EventArgs {
    Mouse(MouseEventArgs),
    Keyboard(KeyboardEventArgs),
    Focus(FocusEventArgs),
}

impl EventArgs {
    /// Build the arguments for `kind` from an engine field mapping.
    ///
    /// Declared fields are matched case-insensitively; missing ones keep their
    /// defaults and undeclared ones are ignored.
    pub fn from_fields(kind: &str, fields: &JsonMap<String, JsonValue>) -> Result<Self> {
        let family = EventFamily::for_kind(kind).ok_or_else(|| BridgeError::UnknownEvent {
            kind: kind.to_string(),
        })?;

        let mut normalized = JsonMap::new();
        for declared in family.fields() {
            let value = fields
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(declared))
                .map(|(_, value)| value);
            // null keeps the field default
            if let Some(value) = value.filter(|value| !value.is_null()) {
                normalized.insert((*declared).to_string(), value.clone());
            }
        }
        let normalized = JsonValue::Object(normalized);

        let args = match family {
            EventFamily::Mouse => decode(normalized).map(Self::Mouse),
            EventFamily::Keyboard => decode(normalized).map(Self::Keyboard),
            EventFamily::Focus => decode(normalized).map(Self::Focus),
        }?;
        Ok(args)
    }

    pub fn event_type(&self) -> &str {
        match self {
            Self::Mouse(args) => &args.event_type,
            Self::Keyboard(args) => &args.event_type,
            Self::Focus(args) => &args.event_type,
        }
    }

    pub fn as_mouse(&self) -> Option<&MouseEventArgs> {
        match self {
            Self::Mouse(args) => Some(args),
            _ => None,
        }
    }

    pub fn as_keyboard(&self) -> Option<&KeyboardEventArgs> {
        match self {
            Self::Keyboard(args) => Some(args),
            _ => None,
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: JsonValue) -> Result<T> {
    serde_json::from_value(value.clone()).map_err(|err| BridgeError::Deserialization {
        expected: std::any::type_name::<T>(),
        payload: value.to_string(),
        reason: err.to_string(),
    })
}
