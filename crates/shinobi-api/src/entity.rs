// Entity base.
//
// Every API object is a thin wrapper over the raw field mapping the
// server sent, with typed accessors on top. The raw map is kept whole so
// fields this crate doesn't model remain reachable.

use serde_json::{Map, Value};

/// An API entity backed by its raw field mapping.
///
/// `ID_FIELD` names the field that identifies the entity; `LIST_FIELD`
/// names the envelope field its list endpoint returns (`"list"` for most
/// actions). Construction receives the connection's base URL so relative
/// asset paths can be resolved into absolute ones.
pub trait Entity: Sized {
    /// Field used as this entity's identifier.
    const ID_FIELD: &'static str;

    /// Envelope field holding the elements of a list response.
    const LIST_FIELD: &'static str = "list";

    /// Build the entity from a raw field mapping.
    fn from_raw(raw: Map<String, Value>, base_url: &str) -> Self;

    /// The raw field mapping as the server sent it.
    fn raw(&self) -> &Map<String, Value>;

    /// Identifier, read from [`ID_FIELD`](Self::ID_FIELD).
    fn id(&self) -> Option<&str> {
        str_field(self.raw(), Self::ID_FIELD)
    }

    /// Group (tenant) identifier, read from the `ke` field.
    fn group(&self) -> Option<&str> {
        str_field(self.raw(), "ke")
    }
}

// ── Raw field helpers ────────────────────────────────────────────────
// The server is loose with types: numbers arrive both as JSON numbers
// and as numeric strings, depending on endpoint and version.

pub(crate) fn str_field<'a>(raw: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    raw.get(field).and_then(Value::as_str)
}

pub(crate) fn int_field(raw: &Map<String, Value>, field: &str) -> Option<i64> {
    match raw.get(field)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

pub(crate) fn float_field(raw: &Map<String, Value>, field: &str) -> Option<f64> {
    match raw.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
