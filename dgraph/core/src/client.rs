use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dgraph_common::constants::DEFAULT_QUERY_TIMEOUT_SECS;
use dgraph_common::types::{Operation, Payload, UiKeywords};
use dgraph_transaction::TxnOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::selector::{RandomSelector, StubSelector};
use crate::stub::ServerStub;
use crate::txn::Txn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Timeout forwarded to the server with every query.
    pub query_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
        }
    }
}

/// A transaction-aware client backed by one or more server stubs.
///
/// The stubs may point at the same server or at several servers of one
/// cluster. Each call is served by one stub picked by the client's
/// [`StubSelector`].
pub struct Client {
    stubs: Vec<Arc<dyn ServerStub>>,
    selector: Box<dyn StubSelector>,
    config: ClientConfig,
}

impl Client {
    pub fn new(stubs: Vec<Arc<dyn ServerStub>>) -> Result<Self> {
        Self::with_config(stubs, ClientConfig::default())
    }

    pub fn with_config(stubs: Vec<Arc<dyn ServerStub>>, config: ClientConfig) -> Result<Self> {
        if stubs.is_empty() {
            return Err(Error::NoClients);
        }
        Ok(Self {
            stubs,
            selector: Box::new(RandomSelector),
            config,
        })
    }

    /// Replaces the pool selection strategy.
    pub fn with_selector(mut self, selector: impl StubSelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    pub fn set_query_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.config.query_timeout = timeout;
        self
    }

    #[inline]
    pub fn query_timeout(&self) -> Duration {
        self.config.query_timeout
    }

    /// The query timeout in whole seconds as sent to the server. Fractions
    /// round up, since a zero timeout means none at all.
    pub fn query_timeout_secs(&self) -> u64 {
        let timeout = self.config.query_timeout;
        timeout
            .as_secs()
            .saturating_add(u64::from(timeout.subsec_nanos() > 0))
    }

    #[inline]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[inline]
    pub fn stubs(&self) -> &[Arc<dyn ServerStub>] {
        &self.stubs
    }

    /// Picks the stub that serves the next call.
    pub fn any_stub(&self) -> &Arc<dyn ServerStub> {
        let index = self.selector.select(self.stubs.len()) % self.stubs.len();
        tracing::trace!(index, "selected stub");
        &self.stubs[index]
    }

    /// Modifies the schema, drops a predicate or drops all data.
    pub async fn alter(&self, op: &Operation) -> Result<Payload> {
        tracing::debug!("Alter request:\n{}", render(op));
        Ok(self.any_stub().alter(op).await?)
    }

    pub async fn login(&self, userid: &str, password: &str) -> Result<()> {
        tracing::debug!("Login request:\nuserid: {userid}");
        Ok(self.any_stub().login(userid, password).await?)
    }

    pub async fn login_into_namespace(
        &self,
        userid: &str,
        password: &str,
        namespace: Option<u64>,
    ) -> Result<()> {
        tracing::debug!("Login request:\nuserid: {userid}, namespace: {namespace:?}");
        Ok(self
            .any_stub()
            .login_into_namespace(userid, password, namespace)
            .await?)
    }

    /// Forgets the access tokens of every stub in the pool.
    pub fn logout(&self) {
        tracing::debug!("Logout");
        self.stubs.iter().for_each(|stub| stub.logout());
    }

    pub fn set_alpha_auth_token(&self, token: &str) {
        self.stubs
            .iter()
            .for_each(|stub| stub.set_alpha_auth_token(token));
    }

    pub fn set_cloud_api_key(&self, api_key: &str) {
        self.stubs
            .iter()
            .for_each(|stub| stub.set_cloud_api_key(api_key));
    }

    /// Creates a new transaction bound to this client.
    pub fn new_txn(&self, options: TxnOptions) -> Result<Txn<'_>> {
        Txn::new(self, options)
    }

    pub async fn fetch_ui_keywords(&self) -> Result<UiKeywords> {
        Ok(self.any_stub().fetch_ui_keywords().await?)
    }

    /// Fetches the health of the serving node, or of the whole cluster if
    /// `all` is set.
    pub async fn get_health(&self, all: bool) -> Result<Value> {
        Ok(self.any_stub().get_health(all).await?)
    }

    pub async fn get_state(&self) -> Result<Value> {
        Ok(self.any_stub().get_state().await?)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("stubs", &self.stubs.len())
            .field("selector", &self.selector)
            .field("config", &self.config)
            .finish()
    }
}

/// Renders a request or response body for debug logging.
pub(crate) fn render<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}
