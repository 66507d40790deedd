// Authentication.
//
// Credentials POST against the server root, `$user` extraction, and the
// two-factor surface. The token and group stored here are what every
// action URL is built from.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::connection::Connection;
use crate::error::Error;

/// Supplies the one-time code for a two-factor login challenge.
///
/// Passing a responder makes login send a fresh per-attempt machine
/// identifier with the credentials. The follow-up challenge round is not
/// implemented yet: the responder is never invoked, and accounts that
/// require a second factor fail with [`Error::Unauthorized`].
pub type TwoFactorResponder = dyn Fn(&str) -> String + Send + Sync;

/// The `$user` payload returned by a successful login.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    #[serde(default)]
    auth_token: Option<String>,
    #[serde(default)]
    mail: Option<String>,
    #[serde(default)]
    uid: Option<String>,
    #[serde(default, rename = "ke")]
    group: Option<String>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl User {
    /// Account email address.
    pub fn email(&self) -> Option<&str> {
        self.mail.as_deref()
    }

    /// Server-side user identifier.
    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    /// Group (tenant) the account belongs to.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Auth token issued for this session.
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// Raw fields beyond the modeled ones.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

impl Connection {
    /// Log in with email and password.
    ///
    /// A no-op when the token and group are already known (seeded at
    /// construction or from an earlier login) — the known facts come back
    /// as a [`User`] without a server round-trip. Otherwise the port is
    /// resolved first, then the credentials are POSTed to the server root
    /// and the returned `$user` object's token and group are stored.
    ///
    /// An `ok: false` envelope on this POST surfaces as
    /// [`Error::Unauthorized`], not [`Error::NotOk`].
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
        two_factor: Option<&TwoFactorResponder>,
    ) -> Result<User, Error> {
        let info = self.info();
        if info.is_connected() {
            debug!("token and group already known; skipping login");
            return Ok(User {
                auth_token: info.token().map(ToOwned::to_owned),
                group: info.group().map(ToOwned::to_owned),
                ..User::default()
            });
        }

        self.resolve_port().await?;

        let mut body = json!({
            "mail": email,
            "pass": password.expose_secret(),
        });
        if two_factor.is_some() {
            // A fresh identifier per attempt, so the server treats each
            // login as a new device.
            body["machineID"] = json!(Uuid::new_v4().to_string());
        }

        debug!(email, "logging in");

        let payload = match self.post("?json=true", Some(&body), Some("$user")).await {
            Ok(payload) => payload,
            Err(Error::NotOk { message }) => return Err(Error::Unauthorized { message }),
            Err(e) => return Err(e),
        };

        let user: User = serde_json::from_value(payload.clone()).map_err(|e| Error::Decode {
            message: e.to_string(),
            body: payload.to_string(),
        })?;

        let (Some(token), Some(group)) = (user.auth_token(), user.group()) else {
            return Err(Error::Decode {
                message: "login response is missing `auth_token` or `ke`".into(),
                body: payload.to_string(),
            });
        };
        self.set_auth(token.to_owned(), group.to_owned());

        debug!("login successful");
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn user_reads_wire_field_names() {
        let user: User = serde_json::from_value(json!({
            "auth_token": "T1",
            "ke": "G1",
            "mail": "a@b.com",
            "uid": "u1",
            "lang": "en",
        }))
        .unwrap();

        assert_eq!(user.auth_token(), Some("T1"));
        assert_eq!(user.group(), Some("G1"));
        assert_eq!(user.email(), Some("a@b.com"));
        assert_eq!(user.uid(), Some("u1"));
        assert_eq!(
            user.extra().get("lang").and_then(Value::as_str),
            Some("en")
        );
    }

    #[test]
    fn user_tolerates_missing_fields() {
        let user: User = serde_json::from_value(json!({})).unwrap();
        assert_eq!(user.auth_token(), None);
        assert_eq!(user.group(), None);
    }
}
