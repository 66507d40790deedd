//! Async Rust client for the [Shinobi](https://shinobi.video) CCTV
//! server's HTTP/JSON API.
//!
//! Typed access to authentication, API-key management, monitor (camera)
//! listing, and video-clip listing. The connection layer resolves the
//! server's scheme and port lazily, normalizes URLs, and unwraps the
//! server's `{ok, msg, …}` JSON envelope into a uniform `Result`
//! contract; the domain managers sit on top of one generic list/get
//! [`Manager`].
//!
//! ```no_run
//! use secrecy::SecretString;
//! use shinobi_api::{Client, TransportConfig};
//!
//! async fn demo() -> Result<(), shinobi_api::Error> {
//!     let password = SecretString::from("hunter2".to_string());
//!     let client = Client::login(
//!         "https://cctv.example.org",
//!         None,
//!         "me@example.org",
//!         &password,
//!         TransportConfig::default(),
//!     )
//!     .await?;
//!
//!     for monitor in client.monitors().list().await? {
//!         println!("{:?}: {:?}", monitor.name(), monitor.status());
//!     }
//!
//!     client.close();
//!     Ok(())
//! }
//! ```

pub mod api_keys;
pub mod auth;
pub mod client;
pub mod connection;
pub mod entity;
mod envelope;
pub mod error;
pub mod manager;
pub mod monitors;
pub mod transport;
pub mod videos;

// ── Primary re-exports ──────────────────────────────────────────────
pub use api_keys::{Key, KeyDetails, KeyManager};
pub use auth::{TwoFactorResponder, User};
pub use client::Client;
pub use connection::{Connection, ConnectionInfo};
pub use entity::Entity;
pub use error::Error;
pub use manager::Manager;
pub use monitors::{Monitor, MonitorManager};
pub use transport::{TlsMode, TransportConfig};
pub use videos::{Video, VideoManager};
