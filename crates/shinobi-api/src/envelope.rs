// Response envelope handling.
//
// Every Shinobi JSON response may carry an `ok` flag and a `msg` alongside
// the actual payload. The envelope is decoded exactly once per response;
// only a literal `ok: false` is a failure — `ok: true` and an absent `ok`
// both count as success, regardless of HTTP status.

use serde_json::{Map, Value};

use crate::error::Error;

/// A decoded JSON response body.
///
/// Wraps the full field map plus the raw body text, which is retained so
/// shape mismatches can report what the server actually sent.
#[derive(Debug)]
pub(crate) struct Envelope {
    fields: Map<String, Value>,
    raw: String,
}

impl Envelope {
    /// Decode a response body. Non-object bodies are a decode error.
    pub(crate) fn decode(body: &str) -> Result<Self, Error> {
        let value: Value = serde_json::from_str(body).map_err(|e| Error::Decode {
            message: e.to_string(),
            body: body.to_owned(),
        })?;

        match value {
            Value::Object(fields) => Ok(Self {
                fields,
                raw: body.to_owned(),
            }),
            other => Err(Error::Decode {
                message: format!("expected a JSON object, got {}", kind_of(&other)),
                body: body.to_owned(),
            }),
        }
    }

    /// Fail with [`Error::NotOk`] if the envelope says `ok: false`.
    pub(crate) fn ensure_ok(&self) -> Result<(), Error> {
        if matches!(self.fields.get("ok"), Some(Value::Bool(false))) {
            return Err(Error::NotOk {
                message: self
                    .fields
                    .get("msg")
                    .and_then(Value::as_str)
                    .unwrap_or("no error message supplied")
                    .to_owned(),
            });
        }
        Ok(())
    }

    /// The full body, optionally projected down to one sub-object.
    pub(crate) fn into_body(self, subkey: Option<&str>) -> Result<Value, Error> {
        project(self.fields, subkey, self.raw)
    }

    /// The body with the `ok` flag stripped, optionally projected down to
    /// one sub-object.
    pub(crate) fn into_payload(mut self, subkey: Option<&str>) -> Result<Value, Error> {
        self.fields.remove("ok");
        project(self.fields, subkey, self.raw)
    }
}

fn project(fields: Map<String, Value>, subkey: Option<&str>, raw: String) -> Result<Value, Error> {
    match subkey {
        None => Ok(Value::Object(fields)),
        Some(key) => match fields.get(key) {
            Some(value) => Ok(value.clone()),
            None => Err(Error::Decode {
                message: format!("response has no `{key}` field"),
                body: raw,
            }),
        },
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ok_false_is_a_failure() {
        let envelope = Envelope::decode(r#"{"ok": false, "msg": "bad token"}"#).unwrap();
        let err = envelope.ensure_ok().unwrap_err();
        assert!(err.is_not_ok());
        assert_eq!(err.server_message(), Some("bad token"));
    }

    #[test]
    fn ok_absent_is_a_success() {
        let envelope = Envelope::decode(r#"{"list": []}"#).unwrap();
        envelope.ensure_ok().unwrap();
    }

    #[test]
    fn ok_true_is_a_success() {
        let envelope = Envelope::decode(r#"{"ok": true}"#).unwrap();
        envelope.ensure_ok().unwrap();
    }

    #[test]
    fn ok_false_without_msg_still_fails() {
        let envelope = Envelope::decode(r#"{"ok": false}"#).unwrap();
        assert!(envelope.ensure_ok().unwrap_err().is_not_ok());
    }

    #[test]
    fn payload_strips_ok_but_body_keeps_it() {
        let body = r#"{"ok": true, "rows": 3}"#;

        let payload = Envelope::decode(body).unwrap().into_payload(None).unwrap();
        assert!(payload.get("ok").is_none());
        assert_eq!(payload.get("rows").and_then(Value::as_i64), Some(3));

        let full = Envelope::decode(body).unwrap().into_body(None).unwrap();
        assert_eq!(full.get("ok"), Some(&Value::Bool(true)));
    }

    #[test]
    fn projection_returns_only_the_subkey() {
        let body = r#"{"ok": true, "api": {"code": "abc"}}"#;
        let payload = Envelope::decode(body)
            .unwrap()
            .into_payload(Some("api"))
            .unwrap();
        assert_eq!(payload.get("code").and_then(Value::as_str), Some("abc"));
    }

    #[test]
    fn missing_projection_key_is_a_decode_error() {
        let envelope = Envelope::decode(r#"{"ok": true}"#).unwrap();
        let err = envelope.into_body(Some("$user")).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn non_object_body_is_a_decode_error() {
        let err = Envelope::decode("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }
}
