// Generic entity manager.
//
// List/get over one named action endpoint, parameterized by the entity
// type. Domain managers wrap this with their own endpoints on top.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use crate::connection::Connection;
use crate::entity::Entity;
use crate::error::Error;

/// Generic list/get operations over a named action endpoint.
///
/// Ordering and de-duplication of list responses are the server's
/// responsibility — elements come back exactly as sent.
pub struct Manager<E: Entity> {
    connection: Arc<Connection>,
    action: &'static str,
    _entity: PhantomData<E>,
}

impl<E: Entity> Manager<E> {
    pub(crate) fn new(connection: Arc<Connection>, action: &'static str) -> Self {
        Self {
            connection,
            action,
            _entity: PhantomData,
        }
    }

    pub(crate) fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// List all entities of this action.
    pub async fn list(&self) -> Result<Vec<E>, Error> {
        self.list_at(self.action, None).await
    }

    /// List from an alternate action or sub-command of the same entity
    /// shape (e.g. the started-monitors action).
    pub(crate) async fn list_at(&self, action: &str, command: Option<&str>) -> Result<Vec<E>, Error> {
        let url = self.connection.action_url(action, command)?;
        self.list_url(&url).await
    }

    /// List from a fully-built URL (used when query parameters apply).
    pub(crate) async fn list_url(&self, url: &str) -> Result<Vec<E>, Error> {
        let body = self.connection.get(url, None).await?;
        self.collect(&body)
    }

    /// Fetch one entity by id.
    ///
    /// The id rides as the path command; the response is expected to hold
    /// exactly one element. Zero elements is [`Error::NotFound`] — there
    /// is no default entity.
    pub async fn get(&self, id: &str) -> Result<E, Error> {
        let url = self.connection.action_url(self.action, Some(id))?;
        let body = self.connection.get(&url, None).await?;
        let mut entities = self.collect(&body)?;
        if entities.is_empty() {
            return Err(Error::NotFound {
                action: self.action.to_owned(),
                id: id.to_owned(),
            });
        }
        Ok(entities.remove(0))
    }

    fn collect(&self, body: &Value) -> Result<Vec<E>, Error> {
        let base_url = self.connection.base_url();
        let Some(items) = body.get(E::LIST_FIELD).and_then(Value::as_array) else {
            return Err(Error::Decode {
                message: format!("response has no `{}` array", E::LIST_FIELD),
                body: body.to_string(),
            });
        };

        items
            .iter()
            .map(|item| match item {
                Value::Object(raw) => Ok(E::from_raw(raw.clone(), &base_url)),
                other => Err(Error::Decode {
                    message: format!("expected `{}` elements to be objects", E::LIST_FIELD),
                    body: other.to_string(),
                }),
            })
            .collect()
    }
}
