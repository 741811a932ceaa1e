//! Request and response shapes exchanged with a server endpoint.
//!
//! The field names follow the server's JSON: transaction context fragments use
//! `start_ts`/`keys`/`preds`/`hash`, while client-side request options are
//! camelCase.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A schema change or drop directive sent through `alter`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_attr: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub drop_all: bool,
}

impl Operation {
    pub fn schema(schema: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            ..Default::default()
        }
    }

    pub fn drop_attr(attr: impl Into<String>) -> Self {
        Self {
            drop_attr: Some(attr.into()),
            ..Default::default()
        }
    }

    pub fn drop_all() -> Self {
        Self {
            drop_all: true,
            ..Default::default()
        }
    }

    /// Returns true if the operation carries no directive at all.
    pub fn is_empty(&self) -> bool {
        self.schema.is_none() && self.drop_attr.is_none() && !self.drop_all
    }
}

/// Opaque payload returned by `alter`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub data: Value,
}

/// Per-query options chosen by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Ask the server to return debug information (e.g. uids) with the result.
    pub debug: bool,
}

impl QueryOptions {
    pub fn debug() -> Self {
        Self { debug: true }
    }
}

/// A fully stamped query request handed to a stub.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars: Option<BTreeMap<String, String>>,
    pub start_ts: u64,
    /// Advisory server-side timeout, in seconds.
    pub timeout: u64,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub best_effort: bool,
    #[serde(default)]
    pub hash: String,
}

/// Server-side latency breakdown, in nanoseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Latency {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsing_ns: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_ns: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding_ns: Option<u64>,
}

/// The transaction context fragment a server attaches to a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnContext {
    #[serde(default)]
    pub start_ts: u64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub aborted: bool,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub preds: Vec<String>,
    #[serde(default, rename = "readOnly")]
    pub read_only: bool,
    #[serde(default, rename = "bestEffort")]
    pub best_effort: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_latency: Option<Latency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txn: Option<TxnContext>,
}

/// Result of a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Extensions>,
}

impl Response {
    #[inline]
    pub fn txn(&self) -> Option<&TxnContext> {
        self.extensions.as_ref().and_then(|e| e.txn.as_ref())
    }
}

/// A set of writes. Exactly one of the body shapes is normally populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mutation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_json: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_json: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_nquads: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_nquads: Option<String>,
    /// Raw mutation text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<String>,
    /// Whether `mutation` holds JSON. Detected from the text when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_json_string: Option<bool>,
    #[serde(default)]
    pub start_ts: u64,
    #[serde(default)]
    pub commit_now: bool,
    #[serde(default)]
    pub hash: String,
}

impl Mutation {
    pub fn set_json(obj: Value) -> Self {
        Self {
            set_json: Some(obj),
            ..Default::default()
        }
    }

    pub fn delete_json(obj: Value) -> Self {
        Self {
            delete_json: Some(obj),
            ..Default::default()
        }
    }

    pub fn set_nquads(nquads: impl Into<String>) -> Self {
        Self {
            set_nquads: Some(nquads.into()),
            ..Default::default()
        }
    }

    pub fn delete_nquads(nquads: impl Into<String>) -> Self {
        Self {
            delete_nquads: Some(nquads.into()),
            ..Default::default()
        }
    }

    pub fn raw(mutation: impl Into<String>) -> Self {
        Self {
            mutation: Some(mutation.into()),
            ..Default::default()
        }
    }

    pub fn with_commit_now(mut self) -> Self {
        self.commit_now = true;
        self
    }

    pub fn has_data(&self) -> bool {
        self.set_json.is_some()
            || self.delete_json.is_some()
            || self.set_nquads.is_some()
            || self.delete_nquads.is_some()
            || self.mutation.is_some()
    }
}

/// A JSON object mutation in predicate-map form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphQlMutation {
    pub obj: Value,
    pub commit_now: bool,
}

impl From<GraphQlMutation> for Mutation {
    fn from(mutation: GraphQlMutation) -> Self {
        Self {
            set_json: Some(mutation.obj),
            commit_now: mutation.commit_now,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedData {
    /// Blank node names mapped to the uids the server assigned to them.
    #[serde(default)]
    pub uids: BTreeMap<String, String>,
}

/// Result of a mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assigned {
    #[serde(default)]
    pub data: AssignedData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Extensions>,
}

impl Assigned {
    #[inline]
    pub fn txn(&self) -> Option<&TxnContext> {
        self.extensions.as_ref().and_then(|e| e.txn.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

/// Keywords the server exposes for editor integrations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiKeywords {
    #[serde(default)]
    pub keywords: Vec<Keyword>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_txn_context_from_server_json() {
        let ctx: TxnContext = serde_json::from_value(json!({
            "start_ts": 42,
            "keys": ["k1", "k2"],
            "preds": ["1-name"],
            "hash": "abc"
        }))
        .unwrap();
        assert_eq!(ctx.start_ts, 42);
        assert_eq!(ctx.keys, vec!["k1", "k2"]);
        assert_eq!(ctx.preds, vec!["1-name"]);
        assert_eq!(ctx.hash.as_deref(), Some("abc"));
        assert!(!ctx.read_only);
    }

    #[test]
    fn test_response_without_extensions() {
        let res: Response = serde_json::from_value(json!({ "data": { "me": [] } })).unwrap();
        assert!(res.txn().is_none());
        assert_eq!(res.data, json!({ "me": [] }));
    }

    #[test]
    fn test_mutation_has_data() {
        assert!(!Mutation::default().has_data());
        assert!(Mutation::set_nquads("_:a <name> \"A\" .").has_data());
        assert!(Mutation::raw("{}").with_commit_now().commit_now);
    }

    #[test]
    fn test_operation_constructors() {
        assert!(Operation::default().is_empty());
        assert!(Operation::drop_all().drop_all);
        assert_eq!(
            serde_json::to_value(Operation::drop_attr("name")).unwrap(),
            json!({ "dropAttr": "name" })
        );
    }
}
