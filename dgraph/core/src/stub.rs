use async_trait::async_trait;
use dgraph_common::error::StubResult;
use dgraph_common::types::{
    Assigned, Mutation, Operation, Payload, Request, Response, TxnContext, UiKeywords,
};
use serde_json::Value;

/// A connection to one server endpoint.
///
/// A stub performs exactly one server operation per call and keeps no
/// transaction state. Authentication state (tokens, API keys) lives inside the
/// stub and is updated through `&self`, so implementations use interior
/// mutability for it.
#[async_trait]
pub trait ServerStub: Send + Sync {
    /// Changes the schema or drops data.
    async fn alter(&self, op: &Operation) -> StubResult<Payload>;

    async fn query(&self, req: &Request) -> StubResult<Response>;

    async fn mutate(&self, mu: &Mutation) -> StubResult<Assigned>;

    /// Commits the transaction described by `ctx`. An abort reported here
    /// means the transaction lost a conflict.
    async fn commit(&self, ctx: &TxnContext) -> StubResult<()>;

    async fn abort(&self, ctx: &TxnContext) -> StubResult<()>;

    async fn login(&self, userid: &str, password: &str) -> StubResult<()>;

    async fn login_into_namespace(
        &self,
        userid: &str,
        password: &str,
        namespace: Option<u64>,
    ) -> StubResult<()>;

    /// Forgets all access tokens.
    fn logout(&self);

    fn set_alpha_auth_token(&self, token: &str);

    fn set_cloud_api_key(&self, api_key: &str);

    async fn fetch_ui_keywords(&self) -> StubResult<UiKeywords>;

    async fn get_health(&self, all: bool) -> StubResult<Value>;

    async fn get_state(&self) -> StubResult<Value>;
}
