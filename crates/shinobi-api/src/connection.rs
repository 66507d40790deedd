// HTTP connection to one Shinobi server instance.
//
// Wraps `reqwest::Client` with Shinobi-specific URL construction, lazy
// scheme/port resolution, and envelope unwrapping. The login flow lives in
// `auth.rs` as inherent methods, keeping this module focused on transport
// mechanics.

use std::sync::RwLock;

use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderValue, LOCATION};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::envelope::Envelope;
use crate::error::Error;
use crate::transport::TransportConfig;

// ── Connection facts ─────────────────────────────────────────────────

/// Mutable connection facts, learned lazily.
///
/// `port` is written at most once by the probe and never overwritten;
/// `token` and `group` are written by login (or seeded at construction).
#[derive(Debug)]
struct ConnectionState {
    host: String,
    port: Option<u16>,
    token: Option<String>,
    group: Option<String>,
}

/// Read-only snapshot of a connection's facts.
///
/// Taken at call time via [`Connection::info`]; it does not track later
/// mutations (a snapshot captured before login won't gain the token).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    host: String,
    port: Option<u16>,
    token: Option<String>,
    group: Option<String>,
}

impl ConnectionInfo {
    /// Server host, without any scheme prefix.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Resolved server port, if known.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Auth token, once logged in or seeded.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Group (tenant) identifier, once logged in or seeded.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Whether both token and group are known.
    pub fn is_connected(&self) -> bool {
        self.token.is_some() && self.group.is_some()
    }

    /// Base URL for building requests.
    ///
    /// Scheme is `https` iff the port is 443; the port suffix appears only
    /// when the port is known and is neither 80 nor 443.
    pub fn base_url(&self) -> String {
        let scheme = if self.port == Some(443) { "https" } else { "http" };
        match self.port {
            Some(port) if port != 80 && port != 443 => format!("{scheme}://{}:{port}", self.host),
            _ => format!("{scheme}://{}", self.host),
        }
    }

    /// API path for the requested action: `/{token}/{action}/{group}`,
    /// optionally suffixed with `/{command}`.
    ///
    /// Fails with [`Error::NotConnected`] until both token and group are
    /// known — this is a local precondition, never a server round-trip.
    pub fn action_url(&self, action: &str, command: Option<&str>) -> Result<String, Error> {
        let (Some(token), Some(group)) = (self.token.as_deref(), self.group.as_deref()) else {
            return Err(Error::NotConnected);
        };
        Ok(match command {
            Some(command) => format!("/{token}/{action}/{group}/{command}"),
            None => format!("/{token}/{action}/{group}"),
        })
    }
}

// ── Session ──────────────────────────────────────────────────────────

/// An HTTP session plus who is responsible for it. A borrowed session
/// (caller-supplied) is released but never torn down by this connection;
/// an owned one (lazily created) is torn down on close.
#[derive(Debug, Clone)]
struct Session {
    http: reqwest::Client,
    owned: bool,
}

// ── Connection ───────────────────────────────────────────────────────

/// One logical session to one Shinobi server.
///
/// Resolves ambiguous connection parameters (scheme, port) via a probe
/// request, performs authenticated GET/POST calls, and unwraps the
/// server's `{ok, msg, …}` JSON envelope.
///
/// All methods take `&self`; the late-learned facts live behind a lock.
/// Port resolution and login are not coalesced, though — callers issuing
/// concurrent requests before those facts are known should serialize
/// them. This is a usage constraint, not an internal guarantee.
pub struct Connection {
    state: RwLock<ConnectionState>,
    session: RwLock<Option<Session>>,
    transport: TransportConfig,
}

impl Connection {
    /// Create a connection to `host`.
    ///
    /// The host may carry an explicit `http://` or `https://` prefix; the
    /// prefix is stripped, and `https://` fixes the port to 443 regardless
    /// of the `port` argument. Without a prefix, `port` is used as given,
    /// or left to the probe when `None`.
    pub fn new(host: &str, port: Option<u16>, transport: TransportConfig) -> Self {
        let (host, forced_port) = split_scheme(host);
        Self {
            state: RwLock::new(ConnectionState {
                host,
                port: forced_port.or(port),
                token: None,
                group: None,
            }),
            session: RwLock::new(None),
            transport,
        }
    }

    /// Seed the auth token and group, skipping login entirely.
    pub fn with_auth(self, token: impl Into<String>, group: impl Into<String>) -> Self {
        {
            let mut state = self.state.write().expect("connection state lock poisoned");
            state.token = Some(token.into());
            state.group = Some(group.into());
        }
        self
    }

    /// Use a caller-owned `reqwest::Client` instead of lazily creating one.
    ///
    /// The connection borrows it: [`close`](Self::close) releases the
    /// handle but leaves the client alive for its owner.
    pub fn with_client(self, http: reqwest::Client) -> Self {
        *self.session.write().expect("session lock poisoned") = Some(Session { http, owned: false });
        self
    }

    /// Snapshot the current connection facts.
    pub fn info(&self) -> ConnectionInfo {
        let state = self.state.read().expect("connection state lock poisoned");
        ConnectionInfo {
            host: state.host.clone(),
            port: state.port,
            token: state.token.clone(),
            group: state.group.clone(),
        }
    }

    /// Whether both token and group are known.
    pub fn is_connected(&self) -> bool {
        self.info().is_connected()
    }

    /// Base URL for building requests. See [`ConnectionInfo::base_url`].
    pub fn base_url(&self) -> String {
        self.info().base_url()
    }

    /// API path for an action. See [`ConnectionInfo::action_url`].
    pub fn action_url(&self, action: &str, command: Option<&str>) -> Result<String, Error> {
        self.info().action_url(action, command)
    }

    // ── Session lifecycle ────────────────────────────────────────────

    fn ensure_session(&self) -> Result<reqwest::Client, Error> {
        {
            let session = self.session.read().expect("session lock poisoned");
            if let Some(session) = session.as_ref() {
                return Ok(session.http.clone());
            }
        }

        let http = self.transport.build_client()?;
        let mut session = self.session.write().expect("session lock poisoned");
        // First writer wins if two callers raced the lazy creation.
        let session = session.get_or_insert_with(|| {
            debug!("created owned HTTP session");
            Session { http, owned: true }
        });
        Ok(session.http.clone())
    }

    /// Release the session. An owned session is torn down; a borrowed one
    /// is left alive for its owner. Safe to call repeatedly.
    pub fn close(&self) {
        let mut session = self.session.write().expect("session lock poisoned");
        match session.take() {
            Some(Session { owned: true, .. }) => debug!("closed owned HTTP session"),
            Some(_) => debug!("released borrowed HTTP session"),
            None => {}
        }
    }

    #[cfg(test)]
    fn has_session(&self) -> bool {
        self.session.read().expect("session lock poisoned").is_some()
    }

    // ── Port resolution ──────────────────────────────────────────────

    /// Resolve the server port if it isn't known yet.
    ///
    /// Issues a HEAD request to the bare `http://{host}` URL and inspects
    /// where the server sends us: a redirect's `Location`, or the final
    /// response URL. Runs automatically before login and before any
    /// GET/POST while the port is unknown.
    pub async fn resolve_port(&self) -> Result<(), Error> {
        if self.info().port().is_some() {
            return Ok(());
        }

        let http = self.ensure_session()?;
        let probe_url = format!("http://{}", self.info().host());
        debug!(url = %probe_url, "probing server scheme and port");

        let resp = http.head(probe_url.as_str()).send().await?;
        let port = probe_port(resp.status(), resp.headers().get(LOCATION), resp.url())?;
        self.adopt_port(port);
        Ok(())
    }

    /// Store the auth token and group learned at login.
    pub(crate) fn set_auth(&self, token: String, group: String) {
        let mut state = self.state.write().expect("connection state lock poisoned");
        state.token = Some(token);
        state.group = Some(group);
        debug!("stored auth token and group");
    }

    /// Record a resolved port. The first determination sticks: once set
    /// (by probe or constructor), the port is never overwritten.
    fn adopt_port(&self, port: u16) {
        let mut state = self.state.write().expect("connection state lock poisoned");
        if state.port.is_none() {
            debug!(port, "resolved server port");
            state.port = Some(port);
        }
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// GET a URL and unwrap the envelope.
    ///
    /// Relative URLs are resolved against [`base_url`](Self::base_url).
    /// A non-2xx status propagates as a transport error; an `ok: false`
    /// envelope raises [`Error::NotOk`]. Returns the full body, or only
    /// the `subkey` sub-object when one is given.
    pub async fn get(&self, url: &str, subkey: Option<&str>) -> Result<Value, Error> {
        let envelope = self.request(Method::GET, url, None).await?;
        envelope.ensure_ok()?;
        envelope.into_body(subkey)
    }

    /// POST a JSON body and unwrap the envelope.
    ///
    /// Same URL resolution and failure contract as [`get`](Self::get),
    /// except the `ok` flag is stripped from the returned payload.
    pub async fn post(
        &self,
        url: &str,
        body: Option<&Value>,
        subkey: Option<&str>,
    ) -> Result<Value, Error> {
        let envelope = self.request(Method::POST, url, body).await?;
        envelope.ensure_ok()?;
        envelope.into_payload(subkey)
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Envelope, Error> {
        let http = self.ensure_session()?;
        self.resolve_port().await?;

        let url = resolve_url(&self.base_url(), url);
        debug!("{method} {url}");

        let mut request = http
            .request(method, url.as_str())
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await?.error_for_status()?;
        // While the port is unknown every response doubles as a hint.
        self.adopt_port(port_of(resp.url()));

        let text = resp.text().await?;
        Envelope::decode(&text)
    }
}

impl Drop for Connection {
    /// Scope exit follows the same rules as an explicit close, so an
    /// owned session is released on every exit path.
    fn drop(&mut self) {
        self.close();
    }
}

// ── URL helpers ──────────────────────────────────────────────────────

/// Strip a scheme prefix off a host. `https://` fixes the port to 443.
fn split_scheme(host: &str) -> (String, Option<u16>) {
    if host.get(..8).is_some_and(|p| p.eq_ignore_ascii_case("https://")) {
        (host[8..].to_owned(), Some(443))
    } else if host.get(..7).is_some_and(|p| p.eq_ignore_ascii_case("http://")) {
        (host[7..].to_owned(), None)
    } else {
        (host.to_owned(), None)
    }
}

/// Resolve a request URL: root-relative paths are prefixed with the base
/// URL, bare strings are joined onto it, absolute URLs pass through.
pub(crate) fn resolve_url(base_url: &str, url: &str) -> String {
    if url.starts_with('/') {
        format!("{base_url}{url}")
    } else if url.get(..4).is_none_or(|p| !p.eq_ignore_ascii_case("http")) {
        format!("{base_url}/{url}")
    } else {
        url.to_owned()
    }
}

/// Extract the port hint from a probe response: the `Location` target on
/// a redirect, the final response URL otherwise.
fn probe_port(
    status: StatusCode,
    location: Option<&HeaderValue>,
    final_url: &Url,
) -> Result<u16, Error> {
    if status.is_redirection() {
        if let Some(location) = location.and_then(|v| v.to_str().ok()) {
            let target = match Url::parse(location) {
                Ok(url) => url,
                Err(url::ParseError::RelativeUrlWithoutBase) => final_url.join(location)?,
                Err(e) => return Err(Error::InvalidUrl(e)),
            };
            return Ok(port_of(&target));
        }
    }
    Ok(port_of(final_url))
}

/// Explicit port if the URL names one, else 443 for https, else 80.
fn port_of(url: &Url) -> u16 {
    url.port()
        .unwrap_or(if url.scheme() == "https" { 443 } else { 80 })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn conn(host: &str, port: Option<u16>) -> Connection {
        Connection::new(host, port, TransportConfig::default())
    }

    #[test]
    fn https_prefix_fixes_port_to_443() {
        let c = conn("https://cam.example.org", Some(8080));
        assert_eq!(c.info().port(), Some(443));
        assert_eq!(c.base_url(), "https://cam.example.org");
    }

    #[test]
    fn http_prefix_is_stripped_and_port_kept() {
        let c = conn("HTTP://cam.example.org", Some(8080));
        assert_eq!(c.info().host(), "cam.example.org");
        assert_eq!(c.base_url(), "http://cam.example.org:8080");
    }

    #[test]
    fn base_url_omits_well_known_ports() {
        assert_eq!(conn("cam", Some(80)).base_url(), "http://cam");
        assert_eq!(conn("cam", Some(443)).base_url(), "https://cam");
        assert_eq!(conn("cam", Some(9000)).base_url(), "http://cam:9000");
        assert_eq!(conn("cam", None).base_url(), "http://cam");
    }

    #[test]
    fn action_url_requires_token_and_group() {
        let c = conn("cam", None);
        assert!(matches!(
            c.action_url("monitor", None),
            Err(Error::NotConnected)
        ));

        let c = c.with_auth("T1", "G1");
        assert_eq!(c.action_url("monitor", None).unwrap(), "/T1/monitor/G1");
        assert_eq!(
            c.action_url("monitor", Some("m7")).unwrap(),
            "/T1/monitor/G1/m7"
        );
    }

    #[test]
    fn url_resolution() {
        let base = "http://cam:8080";
        assert_eq!(resolve_url(base, "/a/b"), "http://cam:8080/a/b");
        assert_eq!(resolve_url(base, "?json=true"), "http://cam:8080/?json=true");
        assert_eq!(resolve_url(base, "x.jpg"), "http://cam:8080/x.jpg");
        assert_eq!(resolve_url(base, "https://other/y"), "https://other/y");
    }

    #[test]
    fn close_is_idempotent() {
        let c = conn("cam", None).with_client(reqwest::Client::new());
        assert!(c.has_session());
        c.close();
        assert!(!c.has_session());
        c.close();
        assert!(!c.has_session());
    }

    #[test]
    fn probe_reads_redirect_location() {
        let from = Url::parse("http://cam.example.org/").unwrap();

        let loc = HeaderValue::from_static("https://cam.example.org/");
        let port = probe_port(StatusCode::MOVED_PERMANENTLY, Some(&loc), &from).unwrap();
        assert_eq!(port, 443);

        let loc = HeaderValue::from_static("http://cam.example.org:8080/");
        let port = probe_port(StatusCode::FOUND, Some(&loc), &from).unwrap();
        assert_eq!(port, 8080);

        // Relative Location joins onto the probe URL.
        let loc = HeaderValue::from_static("/login");
        let port = probe_port(StatusCode::FOUND, Some(&loc), &from).unwrap();
        assert_eq!(port, 80);
    }

    #[test]
    fn probe_falls_back_to_final_url() {
        let hit = Url::parse("https://cam.example.org/").unwrap();
        assert_eq!(probe_port(StatusCode::OK, None, &hit).unwrap(), 443);

        let hit = Url::parse("http://cam.example.org:8080/").unwrap();
        assert_eq!(probe_port(StatusCode::OK, None, &hit).unwrap(), 8080);
    }
}
