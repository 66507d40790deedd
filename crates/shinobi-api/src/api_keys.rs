// API key management.
//
// Keys carry a permission detail block whose flags travel as the
// single-character strings "0"/"1", not JSON booleans. That wire shape is
// load-bearing for the server and is preserved exactly; the accessors
// translate to and from `bool` at the edge.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::connection::Connection;
use crate::entity::{Entity, str_field};
use crate::error::Error;
use crate::manager::Manager;

const ACTION: &str = "api";
const DEFAULT_IP: &str = "0.0.0.0";

fn flag_on() -> String {
    "1".to_owned()
}

fn flag_off() -> String {
    "0".to_owned()
}

fn flag(value: bool) -> String {
    if value { flag_on() } else { flag_off() }
}

// ── Key details ──────────────────────────────────────────────────────

/// Permission flags attached to an API key.
///
/// Defaults allow everything except socket auth, matching what the server
/// seeds for a new key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDetails {
    #[serde(default = "flag_off")]
    auth_socket: String,
    #[serde(default = "flag_on")]
    control_monitors: String,
    #[serde(default = "flag_on")]
    delete_videos: String,
    #[serde(default = "flag_on")]
    get_logs: String,
    #[serde(default = "flag_on")]
    get_monitors: String,
    #[serde(default = "flag_on")]
    watch_snapshot: String,
    #[serde(default = "flag_on")]
    watch_stream: String,
    #[serde(default = "flag_on")]
    watch_videos: String,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Default for KeyDetails {
    fn default() -> Self {
        Self {
            auth_socket: flag_off(),
            control_monitors: flag_on(),
            delete_videos: flag_on(),
            get_logs: flag_on(),
            get_monitors: flag_on(),
            watch_snapshot: flag_on(),
            watch_stream: flag_on(),
            watch_videos: flag_on(),
            extra: Map::new(),
        }
    }
}

impl KeyDetails {
    pub fn auth_socket(&self) -> bool {
        self.auth_socket == "1"
    }

    pub fn set_auth_socket(&mut self, value: bool) {
        self.auth_socket = flag(value);
    }

    pub fn control_monitors(&self) -> bool {
        self.control_monitors == "1"
    }

    pub fn set_control_monitors(&mut self, value: bool) {
        self.control_monitors = flag(value);
    }

    pub fn delete_videos(&self) -> bool {
        self.delete_videos == "1"
    }

    pub fn set_delete_videos(&mut self, value: bool) {
        self.delete_videos = flag(value);
    }

    pub fn get_logs(&self) -> bool {
        self.get_logs == "1"
    }

    pub fn set_get_logs(&mut self, value: bool) {
        self.get_logs = flag(value);
    }

    pub fn get_monitors(&self) -> bool {
        self.get_monitors == "1"
    }

    pub fn set_get_monitors(&mut self, value: bool) {
        self.get_monitors = flag(value);
    }

    pub fn watch_snapshot(&self) -> bool {
        self.watch_snapshot == "1"
    }

    pub fn set_watch_snapshot(&mut self, value: bool) {
        self.watch_snapshot = flag(value);
    }

    pub fn watch_stream(&self) -> bool {
        self.watch_stream == "1"
    }

    pub fn set_watch_stream(&mut self, value: bool) {
        self.watch_stream = flag(value);
    }

    pub fn watch_videos(&self) -> bool {
        self.watch_videos == "1"
    }

    pub fn set_watch_videos(&mut self, value: bool) {
        self.watch_videos = flag(value);
    }
}

// ── Key ──────────────────────────────────────────────────────────────

/// An API key.
#[derive(Debug, Clone, Default)]
pub struct Key {
    raw: Map<String, Value>,
}

impl Entity for Key {
    const ID_FIELD: &'static str = "code";

    fn from_raw(raw: Map<String, Value>, _base_url: &str) -> Self {
        Self { raw }
    }

    fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

impl Key {
    /// A blank key, ready to be filled in and added.
    pub fn new() -> Self {
        Self::default()
    }

    /// The key code — the credential itself. Absent until the server has
    /// issued the key.
    pub fn code(&self) -> Option<&str> {
        str_field(&self.raw, "code")
    }

    /// Allowed source IP. `0.0.0.0` (any) when unset.
    pub fn ip(&self) -> &str {
        str_field(&self.raw, "ip").unwrap_or(DEFAULT_IP)
    }

    pub fn set_ip(&mut self, ip: impl Into<String>) {
        self.raw.insert("ip".to_owned(), Value::String(ip.into()));
    }

    /// Permission details. Tolerates the block arriving as either a JSON
    /// object or a JSON-encoded string; missing or malformed details fall
    /// back to the defaults.
    pub fn details(&self) -> KeyDetails {
        match self.raw.get("details") {
            Some(Value::Object(map)) => {
                serde_json::from_value(Value::Object(map.clone())).unwrap_or_default()
            }
            Some(Value::String(s)) => serde_json::from_str(s).unwrap_or_default(),
            _ => KeyDetails::default(),
        }
    }

    pub fn set_details(&mut self, details: &KeyDetails) {
        self.raw.insert(
            "details".to_owned(),
            serde_json::to_value(details).expect("serialize key details"),
        );
    }
}

// ── Manager ──────────────────────────────────────────────────────────

/// API key operations.
pub struct KeyManager {
    manager: Manager<Key>,
}

impl KeyManager {
    pub(crate) fn new(connection: Arc<Connection>) -> Self {
        Self {
            manager: Manager::new(connection, ACTION),
        }
    }

    /// List the API keys of the current group.
    ///
    /// `GET /{token}/api/{group}/list`
    pub async fn list(&self) -> Result<Vec<Key>, Error> {
        self.manager.list_at(ACTION, Some("list")).await
    }

    /// Register a new API key and return it as issued by the server.
    ///
    /// `POST /{token}/api/{group}/add` with `{"data": {"ip", "details"}}`.
    /// Every permission flag is sent explicitly, defaults filled in.
    pub async fn add(&self, key: &Key) -> Result<Key, Error> {
        let connection = self.manager.connection();
        let url = connection.action_url(ACTION, Some("add"))?;
        let body = json!({
            "data": {
                "ip": key.ip(),
                "details": key.details(),
            }
        });

        debug!("adding API key");
        let payload = connection.post(&url, Some(&body), Some("api")).await?;
        match payload {
            Value::Object(raw) => Ok(Key::from_raw(raw, &connection.base_url())),
            other => Err(Error::Decode {
                message: "expected the issued key as an object".to_owned(),
                body: other.to_string(),
            }),
        }
    }

    /// Delete an API key by its code.
    ///
    /// `POST /{token}/api/{group}/delete` with `{"data": {"code"}}`
    pub async fn delete(&self, code: &str) -> Result<(), Error> {
        let connection = self.manager.connection();
        let url = connection.action_url(ACTION, Some("delete"))?;
        let body = json!({ "data": { "code": code } });

        debug!("deleting API key");
        connection.post(&url, Some(&body), None).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_allow_everything_but_socket_auth() {
        let details = KeyDetails::default();
        assert!(!details.auth_socket());
        assert!(details.control_monitors());
        assert!(details.delete_videos());
        assert!(details.get_logs());
        assert!(details.get_monitors());
        assert!(details.watch_snapshot());
        assert!(details.watch_stream());
        assert!(details.watch_videos());
    }

    #[test]
    fn flags_round_trip_through_wire_strings() {
        let mut details = KeyDetails::default();
        details.set_auth_socket(true);
        details.set_watch_videos(false);

        let wire = serde_json::to_value(&details).unwrap();
        assert_eq!(wire.get("auth_socket"), Some(&json!("1")));
        assert_eq!(wire.get("watch_videos"), Some(&json!("0")));
        assert_eq!(wire.get("watch_stream"), Some(&json!("1")));

        let back: KeyDetails = serde_json::from_value(wire).unwrap();
        assert!(back.auth_socket());
        assert!(!back.watch_videos());
        assert!(back.watch_stream());
        assert_eq!(back, details);
    }

    #[test]
    fn partial_wire_details_fill_in_defaults() {
        let details: KeyDetails =
            serde_json::from_value(json!({ "auth_socket": "1" })).unwrap();
        assert!(details.auth_socket());
        assert!(details.get_monitors());
    }

    #[test]
    fn key_accessors_default_sensibly() {
        let mut key = Key::new();
        assert_eq!(key.code(), None);
        assert_eq!(key.ip(), "0.0.0.0");

        key.set_ip("10.0.0.7");
        assert_eq!(key.ip(), "10.0.0.7");

        let mut details = key.details();
        details.set_get_logs(false);
        key.set_details(&details);
        assert!(!key.details().get_logs());
    }

    #[test]
    fn key_details_accept_a_json_string_block() {
        let raw = json!({ "code": "abc", "details": "{\"auth_socket\":\"1\"}" });
        let Value::Object(raw) = raw else { unreachable!() };
        let key = Key::from_raw(raw, "http://cam");
        assert!(key.details().auth_socket());
    }
}
