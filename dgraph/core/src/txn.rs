use std::collections::BTreeMap;

use dgraph_common::error::StubError;
use dgraph_common::predicate_map::convert_query_data;
use dgraph_common::types::{Assigned, GraphQlMutation, Mutation, QueryOptions, Request, Response};
use dgraph_transaction::{CommitAction, DiscardAction, Lifecycle, TransactionContext, TxnOptions};
use serde_json::{Map, Value};

use crate::client::{Client, render};
use crate::error::{Error, Result};

/// A single-use transaction.
///
/// Queries and mutations run inside the transaction until it is finished by
/// [`commit`](Txn::commit) or [`discard`](Txn::discard). Every operation takes
/// `&mut self`, so calls on one transaction are always issued one after
/// another; independent transactions of the same client share no state.
#[derive(Debug)]
pub struct Txn<'a> {
    client: &'a Client,
    ctx: TransactionContext,
    lifecycle: Lifecycle,
}

impl<'a> Txn<'a> {
    pub(crate) fn new(client: &'a Client, options: TxnOptions) -> Result<Self> {
        let ctx = TransactionContext::new(options).inspect_err(|_| {
            tracing::debug!(
                "best-effort transaction requested without setting it read-only"
            )
        })?;
        Ok(Self {
            client,
            ctx,
            lifecycle: Lifecycle::new(),
        })
    }

    #[inline]
    pub fn context(&self) -> &TransactionContext {
        &self.ctx
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.lifecycle.is_finished()
    }

    #[inline]
    pub fn is_mutated(&self) -> bool {
        self.lifecycle.is_mutated()
    }

    pub async fn query(&mut self, query: &str) -> Result<Response> {
        self.do_query(query, None, QueryOptions::default()).await
    }

    pub async fn query_with_options(
        &mut self,
        query: &str,
        options: QueryOptions,
    ) -> Result<Response> {
        self.do_query(query, None, options).await
    }

    /// Runs a query with variables. Only string values are sent; the server
    /// binds variables as strings, so other values are dropped.
    pub async fn query_with_vars(
        &mut self,
        query: &str,
        vars: &Map<String, Value>,
        options: QueryOptions,
    ) -> Result<Response> {
        let vars = vars
            .iter()
            .filter_map(|(name, value)| value.as_str().map(|v| (name.clone(), v.to_owned())))
            .collect();
        self.do_query(query, Some(vars), options).await
    }

    /// Runs a query and converts every result list from predicate-map form.
    pub async fn query_graphql(&mut self, query: &str) -> Result<Map<String, Value>> {
        let response = self.query(query).await?;
        Ok(convert_query_data(&response.data)?)
    }

    async fn do_query(
        &mut self,
        query: &str,
        vars: Option<BTreeMap<String, String>>,
        options: QueryOptions,
    ) -> Result<Response> {
        if let Err(e) = self.lifecycle.check_active() {
            tracing::debug!("Query request (ERR_FINISHED):\nquery = {query}\nvars = {vars:?}");
            return Err(e.into());
        }
        let req = Request {
            query: query.to_owned(),
            vars,
            start_ts: self.ctx.start_ts().raw(),
            timeout: self.client.query_timeout_secs(),
            debug: options.debug,
            read_only: self.ctx.is_read_only(),
            best_effort: self.ctx.is_best_effort(),
            hash: self.ctx.hash().to_owned(),
        };
        tracing::debug!("Query request:\n{}", render(&req));

        let response = self.client.any_stub().query(&req).await?;
        self.ctx = self.ctx.merge(response.txn())?;
        tracing::debug!("Query response:\n{}", render(&response));
        Ok(response)
    }

    /// Runs a mutation.
    ///
    /// If the mutation fails the transaction is discarded. Server aborts and
    /// conflicts are reported as [`Error::Aborted`]; any other error is
    /// returned as is.
    pub async fn mutate(&mut self, mut mutation: Mutation) -> Result<Assigned> {
        self.lifecycle = match self.lifecycle.begin_mutate() {
            Ok(lifecycle) => lifecycle,
            Err(e) => {
                tracing::debug!(
                    "Mutate request (ERR_FINISHED):\nmutation = {}",
                    render(&mutation)
                );
                return Err(e.into());
            }
        };
        mutation.start_ts = self.ctx.start_ts().raw();
        mutation.hash = self.ctx.hash().to_owned();
        tracing::debug!("Mutate request:\n{}", render(&mutation));

        match self.dispatch_mutation(&mutation).await {
            Ok(assigned) => Ok(assigned),
            Err(err) => {
                if let Err(discard_err) = self.discard().await {
                    tracing::warn!("Discard after failed mutation failed: {discard_err}");
                }
                Err(normalize_mutate_error(err))
            }
        }
    }

    /// Runs `set_json` mutation built from a predicate-map object.
    pub async fn mutate_graphql(&mut self, mutation: GraphQlMutation) -> Result<Assigned> {
        self.mutate(mutation.into()).await
    }

    async fn dispatch_mutation(&mut self, mutation: &Mutation) -> Result<Assigned> {
        let assigned = self.client.any_stub().mutate(mutation).await?;
        self.lifecycle = self.lifecycle.finish_mutate(mutation.commit_now);
        self.ctx = self.ctx.merge(assigned.txn())?;
        tracing::debug!("Mutate response:\n{}", render(&assigned));
        Ok(assigned)
    }

    /// Commits the transaction. Without prior mutations nothing is sent to
    /// the server.
    pub async fn commit(&mut self) -> Result<()> {
        let (lifecycle, action) = self.lifecycle.begin_commit()?;
        self.lifecycle = lifecycle;
        if action == CommitAction::Skip {
            return Ok(());
        }
        match self.client.any_stub().commit(&self.ctx.to_wire()).await {
            Ok(()) => Ok(()),
            // The server reports commit-time conflicts with abort phrasing.
            Err(StubError::Api(api)) if api.is_aborted() => Err(Error::Aborted),
            Err(e) => Err(e.into()),
        }
    }

    /// Discards the transaction. Calling it on a finished transaction does
    /// nothing, so it is safe to call unconditionally on cleanup paths.
    pub async fn discard(&mut self) -> Result<()> {
        let (lifecycle, action) = self.lifecycle.begin_discard();
        self.lifecycle = lifecycle;
        if action == DiscardAction::Skip {
            return Ok(());
        }
        self.ctx = std::mem::take(&mut self.ctx).into_aborted();
        self.client.any_stub().abort(&self.ctx.to_wire()).await?;
        Ok(())
    }
}

fn normalize_mutate_error(err: Error) -> Error {
    match err {
        Error::Api(api) if api.is_aborted() || api.is_conflict() => Error::Aborted,
        other => other,
    }
}
