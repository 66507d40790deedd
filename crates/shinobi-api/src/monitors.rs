// Monitors (cameras).
//
// The server sends a monitor's `details` as a JSON-encoded string inside
// the JSON response; it is parsed on first access and cached. Asset paths
// (snapshot, streams) arrive relative to the server root.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use serde_json::{Map, Value};

use crate::connection::{Connection, resolve_url};
use crate::entity::{Entity, float_field, int_field, str_field};
use crate::error::Error;
use crate::manager::Manager;

const ACTION: &str = "monitor";
const STARTED_ACTION: &str = "smonitor";

/// A camera configured on the server.
#[derive(Debug, Clone)]
pub struct Monitor {
    raw: Map<String, Value>,
    base_url: String,
    details: OnceLock<Option<Value>>,
}

impl Entity for Monitor {
    const ID_FIELD: &'static str = "mid";

    fn from_raw(raw: Map<String, Value>, base_url: &str) -> Self {
        Self {
            raw,
            base_url: base_url.to_owned(),
            details: OnceLock::new(),
        }
    }

    fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

impl Monitor {
    pub fn name(&self) -> Option<&str> {
        str_field(&self.raw, "name")
    }

    /// Input type (`h264`, `mjpeg`, `jpeg`, …). Wire field `type`.
    pub fn monitor_type(&self) -> Option<&str> {
        str_field(&self.raw, "type")
    }

    pub fn ext(&self) -> Option<&str> {
        str_field(&self.raw, "ext")
    }

    pub fn protocol(&self) -> Option<&str> {
        str_field(&self.raw, "protocol")
    }

    /// Camera host, as configured on the server.
    pub fn host(&self) -> Option<&str> {
        str_field(&self.raw, "host")
    }

    pub fn path(&self) -> Option<&str> {
        str_field(&self.raw, "path")
    }

    /// Camera port, as configured on the server.
    pub fn port(&self) -> Option<i64> {
        int_field(&self.raw, "port")
    }

    pub fn fps(&self) -> Option<f64> {
        float_field(&self.raw, "fps")
    }

    /// Recording mode (`record`, `start`, `stop`, …).
    pub fn mode(&self) -> Option<&str> {
        str_field(&self.raw, "mode")
    }

    pub fn width(&self) -> Option<i64> {
        int_field(&self.raw, "width")
    }

    pub fn height(&self) -> Option<i64> {
        int_field(&self.raw, "height")
    }

    pub fn status(&self) -> Option<&str> {
        str_field(&self.raw, "status")
    }

    /// The monitor's configuration detail blob.
    ///
    /// Arrives as a JSON-encoded string; parsed on first access and cached
    /// for the life of the monitor. `None` when absent or unparsable.
    pub fn details(&self) -> Option<&Value> {
        self.details
            .get_or_init(|| match self.raw.get("details") {
                Some(Value::String(s)) => serde_json::from_str(s).ok(),
                Some(value @ Value::Object(_)) => Some(value.clone()),
                _ => None,
            })
            .as_ref()
    }

    /// Snapshot URL, resolved against the connection's base URL.
    pub fn snapshot(&self) -> Option<String> {
        str_field(&self.raw, "snapshot").map(|path| resolve_url(&self.base_url, path))
    }

    /// Stream paths as the server sent them, relative to the server root.
    pub fn streams(&self) -> Vec<&str> {
        self.raw
            .get("streams")
            .and_then(Value::as_array)
            .map(|paths| paths.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Stream paths grouped by stream type, each list in server order.
    pub fn streams_sorted_by_type(&self) -> HashMap<String, Vec<String>> {
        let Some(Value::Object(map)) = self.raw.get("streamsSortedByType") else {
            return HashMap::new();
        };
        map.iter()
            .map(|(stream_type, paths)| {
                let paths = paths
                    .as_array()
                    .map(|paths| {
                        paths
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_owned)
                            .collect()
                    })
                    .unwrap_or_default();
                (stream_type.clone(), paths)
            })
            .collect()
    }

    /// Resolve a relative stream path against the connection's base URL.
    pub fn resolve_stream(&self, path: &str) -> String {
        resolve_url(&self.base_url, path)
    }
}

// ── Manager ──────────────────────────────────────────────────────────

/// Monitor listing and lookup.
pub struct MonitorManager {
    manager: Manager<Monitor>,
}

impl MonitorManager {
    pub(crate) fn new(connection: Arc<Connection>) -> Self {
        Self {
            manager: Manager::new(connection, ACTION),
        }
    }

    /// List all monitors of the current group.
    ///
    /// `GET /{token}/monitor/{group}`
    pub async fn list(&self) -> Result<Vec<Monitor>, Error> {
        self.manager.list().await
    }

    /// List only the monitors that are currently started.
    ///
    /// `GET /{token}/smonitor/{group}`
    pub async fn started(&self) -> Result<Vec<Monitor>, Error> {
        self.manager.list_at(STARTED_ACTION, None).await
    }

    /// Fetch one monitor by id.
    pub async fn get(&self, id: &str) -> Result<Monitor, Error> {
        self.manager.get(id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn monitor(fields: Value) -> Monitor {
        let Value::Object(raw) = fields else {
            unreachable!()
        };
        Monitor::from_raw(raw, "http://cam.example.org:8080")
    }

    #[test]
    fn details_parse_once_and_cache() {
        let m = monitor(json!({ "mid": "m1", "details": "{\"foo\": 1}" }));

        let first = m.details().unwrap();
        assert_eq!(first.get("foo").and_then(Value::as_i64), Some(1));

        // Same allocation on every subsequent access — parsed exactly once.
        let second = m.details().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn details_tolerate_an_object_block() {
        let m = monitor(json!({ "mid": "m1", "details": { "foo": 2 } }));
        assert_eq!(
            m.details().unwrap().get("foo").and_then(Value::as_i64),
            Some(2)
        );
    }

    #[test]
    fn unparsable_details_are_none() {
        let m = monitor(json!({ "mid": "m1", "details": "{not json" }));
        assert_eq!(m.details(), None);

        let m = monitor(json!({ "mid": "m1" }));
        assert_eq!(m.details(), None);
    }

    #[test]
    fn snapshot_resolves_against_the_base_url() {
        let m = monitor(json!({ "mid": "m1", "snapshot": "/T1/jpeg/G1/m1/s.jpg" }));
        assert_eq!(
            m.snapshot().unwrap(),
            "http://cam.example.org:8080/T1/jpeg/G1/m1/s.jpg"
        );

        let m = monitor(json!({ "mid": "m1" }));
        assert_eq!(m.snapshot(), None);
    }

    #[test]
    fn streams_keep_server_order() {
        let m = monitor(json!({
            "mid": "m1",
            "streams": ["/b.m3u8", "/a.m3u8"],
            "streamsSortedByType": {
                "hls": ["/b.m3u8", "/a.m3u8"],
                "mjpeg": ["/c.mjpeg"],
            },
        }));

        assert_eq!(m.streams(), ["/b.m3u8", "/a.m3u8"]);

        let by_type = m.streams_sorted_by_type();
        assert_eq!(by_type["hls"], ["/b.m3u8", "/a.m3u8"]);
        assert_eq!(by_type["mjpeg"], ["/c.mjpeg"]);
        assert_eq!(
            m.resolve_stream("/c.mjpeg"),
            "http://cam.example.org:8080/c.mjpeg"
        );
    }

    #[test]
    fn numeric_accessors_tolerate_string_values() {
        let m = monitor(json!({
            "mid": "m1",
            "type": "h264",
            "fps": "15",
            "width": 1920,
            "height": "1080",
            "status": "Watching",
        }));

        assert_eq!(m.id(), Some("m1"));
        assert_eq!(m.monitor_type(), Some("h264"));
        assert_eq!(m.fps(), Some(15.0));
        assert_eq!(m.width(), Some(1920));
        assert_eq!(m.height(), Some(1080));
        assert_eq!(m.status(), Some("Watching"));
    }
}
