// Client facade.
//
// One connection plus the domain managers, each constructed on first
// access and cached for the life of the client.

use std::sync::{Arc, OnceLock};

use secrecy::SecretString;

use crate::api_keys::KeyManager;
use crate::connection::Connection;
use crate::error::Error;
use crate::monitors::MonitorManager;
use crate::transport::TransportConfig;
use crate::videos::VideoManager;

/// Top-level Shinobi API client.
pub struct Client {
    connection: Arc<Connection>,
    api: OnceLock<KeyManager>,
    monitors: OnceLock<MonitorManager>,
    videos: OnceLock<VideoManager>,
}

impl Client {
    /// Wrap an existing connection.
    ///
    /// The connection may be pre-authenticated (seeded token and group)
    /// or logged in afterwards via [`connection()`](Self::connection).
    pub fn new(connection: Connection) -> Self {
        Self {
            connection: Arc::new(connection),
            api: OnceLock::new(),
            monitors: OnceLock::new(),
            videos: OnceLock::new(),
        }
    }

    /// Log in against a fresh connection and return a ready client.
    ///
    /// With `port` left as `None`, the port is taken from the host's
    /// scheme prefix or resolved by the probe. The client is handed back
    /// only once login has succeeded.
    pub async fn login(
        host: &str,
        port: Option<u16>,
        email: &str,
        password: &SecretString,
        transport: TransportConfig,
    ) -> Result<Self, Error> {
        let connection = Connection::new(host, port, transport);
        connection.login(email, password, None).await?;
        Ok(Self::new(connection))
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// API key operations.
    pub fn api(&self) -> &KeyManager {
        self.api
            .get_or_init(|| KeyManager::new(Arc::clone(&self.connection)))
    }

    /// Monitor operations.
    pub fn monitors(&self) -> &MonitorManager {
        self.monitors
            .get_or_init(|| MonitorManager::new(Arc::clone(&self.connection)))
    }

    /// Video operations.
    pub fn videos(&self) -> &VideoManager {
        self.videos
            .get_or_init(|| VideoManager::new(Arc::clone(&self.connection)))
    }

    /// Release the connection's session. See [`Connection::close`].
    pub fn close(&self) {
        self.connection.close();
    }
}
