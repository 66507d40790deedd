// Video clips.
//
// The videos action supports optional start/end time filters, passed as
// ISO-8601 query parameters on the list URL. List responses arrive under
// a `videos` field rather than the usual `list`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::connection::{Connection, resolve_url};
use crate::entity::{Entity, int_field, str_field};
use crate::error::Error;
use crate::manager::Manager;

const ACTION: &str = "videos";

/// A recorded clip.
#[derive(Debug, Clone)]
pub struct Video {
    raw: Map<String, Value>,
    base_url: String,
}

impl Entity for Video {
    const ID_FIELD: &'static str = "filename";
    const LIST_FIELD: &'static str = "videos";

    fn from_raw(raw: Map<String, Value>, base_url: &str) -> Self {
        Self {
            raw,
            base_url: base_url.to_owned(),
        }
    }

    fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

impl Video {
    /// The monitor this clip was recorded from. Wire field `mid`.
    pub fn monitor_id(&self) -> Option<&str> {
        str_field(&self.raw, "mid")
    }

    pub fn filename(&self) -> Option<&str> {
        str_field(&self.raw, "filename")
    }

    /// Recording start time.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        parse_time(&self.raw, "time")
    }

    /// Recording end time.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        parse_time(&self.raw, "end")
    }

    /// Clip size in bytes.
    pub fn size(&self) -> Option<i64> {
        int_field(&self.raw, "size")
    }

    /// Read status marker (`1` unread, `2` read).
    pub fn status(&self) -> Option<i64> {
        int_field(&self.raw, "status")
    }

    /// Download URL, resolved against the connection's base URL.
    pub fn href(&self) -> Option<String> {
        str_field(&self.raw, "href").map(|path| resolve_url(&self.base_url, path))
    }
}

fn parse_time(raw: &Map<String, Value>, field: &str) -> Option<DateTime<Utc>> {
    str_field(raw, field)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

// ── Manager ──────────────────────────────────────────────────────────

/// Video clip listing.
pub struct VideoManager {
    manager: Manager<Video>,
}

impl VideoManager {
    pub(crate) fn new(connection: Arc<Connection>) -> Self {
        Self {
            manager: Manager::new(connection, ACTION),
        }
    }

    /// List clips of the current group, optionally bounded in time.
    ///
    /// `GET /{token}/videos/{group}[?start=ISO8601][&end=ISO8601]`
    pub async fn list(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Video>, Error> {
        let url = self.manager.connection().action_url(ACTION, None)?;
        self.manager.list_url(&time_filtered(url, start, end)).await
    }
}

fn time_filtered(mut url: String, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> String {
    if let Some(start) = start {
        url.push_str(&format!("?start={}", start.to_rfc3339()));
    }
    if let Some(end) = end {
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&format!("end={}", end.to_rfc3339()));
    }
    url
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn at(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn time_filter_query_shapes() {
        let url = "/T1/videos/G1".to_owned();

        assert_eq!(time_filtered(url.clone(), None, None), "/T1/videos/G1");
        assert_eq!(
            time_filtered(url.clone(), Some(at(2024, 6, 1)), None),
            "/T1/videos/G1?start=2024-06-01T00:00:00+00:00"
        );
        assert_eq!(
            time_filtered(url.clone(), None, Some(at(2024, 6, 2))),
            "/T1/videos/G1?end=2024-06-02T00:00:00+00:00"
        );
        assert_eq!(
            time_filtered(url, Some(at(2024, 6, 1)), Some(at(2024, 6, 2))),
            "/T1/videos/G1?start=2024-06-01T00:00:00+00:00&end=2024-06-02T00:00:00+00:00"
        );
    }

    #[test]
    fn video_accessors() {
        let Value::Object(raw) = json!({
            "mid": "m1",
            "ke": "G1",
            "filename": "2024-06-01T00-00-00.mp4",
            "time": "2024-06-01T00:00:00.000Z",
            "end": "2024-06-01T00:01:00.000Z",
            "size": 1048576,
            "status": 1,
            "href": "/T1/videos/G1/m1/2024-06-01T00-00-00.mp4",
        }) else {
            unreachable!()
        };
        let video = Video::from_raw(raw, "http://cam.example.org:8080");

        assert_eq!(video.id(), Some("2024-06-01T00-00-00.mp4"));
        assert_eq!(video.monitor_id(), Some("m1"));
        assert_eq!(video.group(), Some("G1"));
        assert_eq!(video.time().unwrap(), at(2024, 6, 1));
        assert_eq!(video.size(), Some(1_048_576));
        assert_eq!(video.status(), Some(1));
        assert_eq!(
            video.href().unwrap(),
            "http://cam.example.org:8080/T1/videos/G1/m1/2024-06-01T00-00-00.mp4"
        );
    }
}
