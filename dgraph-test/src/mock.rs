use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use dgraph::common::error::{ApiError, StubError, StubResult};
use dgraph::common::types::{
    Assigned, AssignedData, Extensions, Keyword, Latency, Mutation, Operation, Payload, Request,
    Response, TxnContext, UiKeywords,
};
use dgraph::{Client, ServerStub};
use parking_lot::Mutex;
use serde_json::{Value, json};

pub const ABORTED_MESSAGE: &str = "Transaction has been aborted. Please retry";

/// Server operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Alter,
    Query,
    Mutate,
    Commit,
    Abort,
    Login,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Alter(Operation),
    Query(Request),
    Mutate(Mutation),
    Commit(TxnContext),
    Abort(TxnContext),
    Login {
        userid: String,
        namespace: Option<u64>,
    },
    Health {
        all: bool,
    },
    State,
    UiKeywords,
}

impl Call {
    pub fn op(&self) -> Option<Op> {
        match self {
            Call::Alter(_) => Some(Op::Alter),
            Call::Query(_) => Some(Op::Query),
            Call::Mutate(_) => Some(Op::Mutate),
            Call::Commit(_) => Some(Op::Commit),
            Call::Abort(_) => Some(Op::Abort),
            Call::Login { .. } => Some(Op::Login),
            Call::Health { .. } | Call::State | Call::UiKeywords => None,
        }
    }
}

/// A call as seen by the server, tagged with the stub that sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub stub: usize,
    pub call: Call,
}

#[derive(Debug)]
struct ServerState {
    next_ts: u64,
    next_uid: u64,
    next_hash: u64,
    /// Commit timestamp of the latest committed write of every key.
    committed: HashMap<String, u64>,
    /// Keys written by transactions that are neither committed nor aborted.
    pending: HashMap<u64, BTreeSet<String>>,
    users: HashMap<String, String>,
    schema: Vec<String>,
    query_data: Value,
    /// Start timestamp reported by queries regardless of the request.
    skewed_start_ts: Option<u64>,
    failures: HashMap<Op, VecDeque<StubError>>,
    calls: Vec<RecordedCall>,
}

impl Default for ServerState {
    fn default() -> Self {
        Self {
            next_ts: 1,
            next_uid: 1,
            next_hash: 1,
            committed: HashMap::new(),
            pending: HashMap::new(),
            users: HashMap::from([("groot".to_owned(), "password".to_owned())]),
            schema: Vec::new(),
            query_data: json!({}),
            skewed_start_ts: None,
            failures: HashMap::new(),
            calls: Vec::new(),
        }
    }
}

impl ServerState {
    fn alloc_ts(&mut self) -> u64 {
        let ts = self.next_ts;
        self.next_ts += 1;
        ts
    }

    fn alloc_uid(&mut self) -> String {
        let uid = format!("0x{:x}", self.next_uid);
        self.next_uid += 1;
        uid
    }

    fn alloc_hash(&mut self) -> String {
        let hash = format!("{:016x}", self.next_hash);
        self.next_hash += 1;
        hash
    }

    fn take_failure(&mut self, op: Op) -> Option<StubError> {
        self.failures.get_mut(&op).and_then(VecDeque::pop_front)
    }

    fn conflicts(&self, start_ts: u64, keys: &BTreeSet<String>) -> bool {
        keys.iter()
            .any(|key| self.committed.get(key).is_some_and(|ts| *ts > start_ts))
    }

    fn commit_keys(&mut self, start_ts: u64, keys: &BTreeSet<String>) -> StubResult<()> {
        if self.conflicts(start_ts, keys) {
            self.pending.remove(&start_ts);
            return Err(ApiError::with_message("commit", ABORTED_MESSAGE).into());
        }
        let commit_ts = self.alloc_ts();
        for key in keys {
            self.committed.insert(key.clone(), commit_ts);
        }
        self.pending.remove(&start_ts);
        Ok(())
    }

    fn txn_fragment(&mut self, start_ts: u64, keys: Vec<String>, preds: Vec<String>) -> Extensions {
        Extensions {
            server_latency: Some(Latency::default()),
            txn: Some(TxnContext {
                start_ts,
                keys,
                preds,
                hash: Some(self.alloc_hash()),
                ..Default::default()
            }),
        }
    }
}

/// One `(subject, predicate)` write extracted from a mutation body.
struct Write {
    subject: String,
    predicate: String,
}

/// Simulated server shared by every [`MockStub`] of a pool.
#[derive(Debug, Default)]
pub struct MockServer {
    state: Mutex<ServerState>,
}

impl MockServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes the next call of `op` fail with `err`. Failures queue up.
    pub fn fail_next(&self, op: Op, err: impl Into<StubError>) {
        self.state
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(err.into());
    }

    /// Sets the `data` returned by every following query.
    pub fn set_query_data(&self, data: Value) {
        self.state.lock().query_data = data;
    }

    /// Makes every following query report `start_ts`, as a server that lost
    /// the transaction's read view would.
    pub fn skew_start_ts(&self, start_ts: u64) {
        self.state.lock().skewed_start_ts = Some(start_ts);
    }

    pub fn add_user(&self, userid: &str, password: &str) {
        self.state
            .lock()
            .users
            .insert(userid.to_owned(), password.to_owned());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.call.op() == Some(op))
            .count()
    }

    pub fn last_query(&self) -> Option<Request> {
        self.state
            .lock()
            .calls
            .iter()
            .rev()
            .find_map(|c| match &c.call {
                Call::Query(req) => Some(req.clone()),
                _ => None,
            })
    }

    pub fn last_mutation(&self) -> Option<Mutation> {
        self.state
            .lock()
            .calls
            .iter()
            .rev()
            .find_map(|c| match &c.call {
                Call::Mutate(mu) => Some(mu.clone()),
                _ => None,
            })
    }

    pub fn is_committed(&self, key: &str) -> bool {
        self.state.lock().committed.contains_key(key)
    }

    pub fn pending_txns(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn schema(&self) -> Vec<String> {
        self.state.lock().schema.clone()
    }

    fn record(state: &mut ServerState, stub: usize, call: Call) {
        state.calls.push(RecordedCall { stub, call });
    }

    fn alter(&self, stub: usize, op: &Operation) -> StubResult<Payload> {
        let mut state = self.state.lock();
        Self::record(&mut state, stub, Call::Alter(op.clone()));
        if let Some(err) = state.take_failure(Op::Alter) {
            return Err(err);
        }
        if op.is_empty() {
            return Err(StubError::InvalidRequest(
                "invalid op argument in alter".into(),
            ));
        }
        if let Some(schema) = &op.schema {
            state.schema.push(schema.clone());
        }
        if let Some(attr) = &op.drop_attr {
            let suffix = format!("-{attr}");
            state.committed.retain(|key, _| !key.ends_with(&suffix));
        }
        if op.drop_all {
            state.schema.clear();
            state.committed.clear();
            state.pending.clear();
        }
        Ok(Payload {
            data: json!({ "code": "Success", "message": "Done" }),
        })
    }

    fn query(&self, stub: usize, req: &Request) -> StubResult<Response> {
        let mut state = self.state.lock();
        Self::record(&mut state, stub, Call::Query(req.clone()));
        if let Some(err) = state.take_failure(Op::Query) {
            return Err(err);
        }
        let start_ts = match (state.skewed_start_ts, req.start_ts) {
            (Some(ts), _) => ts,
            (None, 0) => state.alloc_ts(),
            (None, ts) => ts,
        };
        let extensions = state.txn_fragment(start_ts, Vec::new(), Vec::new());
        Ok(Response {
            data: state.query_data.clone(),
            extensions: Some(extensions),
        })
    }

    fn mutate(&self, stub: usize, mu: &Mutation) -> StubResult<Assigned> {
        let mut state = self.state.lock();
        Self::record(&mut state, stub, Call::Mutate(mu.clone()));
        if let Some(err) = state.take_failure(Op::Mutate) {
            return Err(err);
        }
        if !mu.has_data() {
            return Err(StubError::InvalidRequest("mutation has no data".into()));
        }
        let mut uids = BTreeMap::new();
        let writes = parse_mutation(&mut state, mu, &mut uids)?;

        let start_ts = if mu.start_ts == 0 {
            state.alloc_ts()
        } else {
            mu.start_ts
        };
        let keys: BTreeSet<String> = writes
            .iter()
            .map(|w| format!("{}-{}", w.subject, w.predicate))
            .collect();
        let preds: BTreeSet<String> = writes.iter().map(|w| w.predicate.clone()).collect();
        state
            .pending
            .entry(start_ts)
            .or_default()
            .extend(keys.iter().cloned());
        if mu.commit_now {
            let all_keys = state.pending.get(&start_ts).cloned().unwrap_or_default();
            state.commit_keys(start_ts, &all_keys)?;
        }
        let extensions = state.txn_fragment(
            start_ts,
            keys.into_iter().collect(),
            preds.into_iter().collect(),
        );
        Ok(Assigned {
            data: AssignedData { uids },
            extensions: Some(extensions),
        })
    }

    fn commit(&self, stub: usize, ctx: &TxnContext) -> StubResult<()> {
        let mut state = self.state.lock();
        Self::record(&mut state, stub, Call::Commit(ctx.clone()));
        if let Some(err) = state.take_failure(Op::Commit) {
            return Err(err);
        }
        let mut keys: BTreeSet<String> = ctx.keys.iter().cloned().collect();
        if let Some(pending) = state.pending.get(&ctx.start_ts) {
            keys.extend(pending.iter().cloned());
        }
        state.commit_keys(ctx.start_ts, &keys)
    }

    fn abort(&self, stub: usize, ctx: &TxnContext) -> StubResult<()> {
        let mut state = self.state.lock();
        Self::record(&mut state, stub, Call::Abort(ctx.clone()));
        if let Some(err) = state.take_failure(Op::Abort) {
            return Err(err);
        }
        state.pending.remove(&ctx.start_ts);
        Ok(())
    }

    fn login(
        &self,
        stub: usize,
        userid: &str,
        password: &str,
        namespace: Option<u64>,
    ) -> StubResult<(String, String)> {
        let mut state = self.state.lock();
        Self::record(
            &mut state,
            stub,
            Call::Login {
                userid: userid.to_owned(),
                namespace,
            },
        );
        if let Some(err) = state.take_failure(Op::Login) {
            return Err(err);
        }
        match state.users.get(userid) {
            Some(expected) if expected == password => {
                let ns = namespace.unwrap_or(0);
                Ok((
                    format!("access-{userid}-{ns}"),
                    format!("refresh-{userid}-{ns}"),
                ))
            }
            _ => {
                let err = ApiError::with_message("login", "invalid username or password");
                Err(err.into())
            }
        }
    }

    fn health(&self, stub: usize, all: bool) -> Value {
        let mut state = self.state.lock();
        Self::record(&mut state, stub, Call::Health { all });
        let node = json!({ "instance": "alpha", "status": "healthy", "version": "v24.0.0" });
        if all { json!([node]) } else { node }
    }

    fn state(&self, stub: usize) -> Value {
        let mut state = self.state.lock();
        Self::record(&mut state, stub, Call::State);
        json!({ "counter": state.next_ts.to_string(), "groups": {} })
    }

    fn ui_keywords(&self, stub: usize) -> UiKeywords {
        let mut state = self.state.lock();
        Self::record(&mut state, stub, Call::UiKeywords);
        let keyword = |kind: &str, name: &str| Keyword {
            kind: kind.to_owned(),
            name: name.to_owned(),
        };
        UiKeywords {
            keywords: vec![
                keyword("function", "eq"),
                keyword("function", "has"),
                keyword("directive", "filter"),
            ],
        }
    }
}

fn parse_mutation(
    state: &mut ServerState,
    mu: &Mutation,
    uids: &mut BTreeMap<String, String>,
) -> StubResult<Vec<Write>> {
    let mut writes = Vec::new();
    for json_body in [&mu.set_json, &mu.delete_json].into_iter().flatten() {
        parse_json(state, json_body, uids, &mut writes);
    }
    for nquads in [&mu.set_nquads, &mu.delete_nquads].into_iter().flatten() {
        parse_nquads(state, nquads, uids, &mut writes)?;
    }
    if let Some(raw) = &mu.mutation {
        let parsed = match mu.is_json_string {
            Some(false) => None,
            _ => serde_json::from_str::<Value>(raw).ok(),
        };
        match parsed {
            Some(body) => {
                for part in ["set", "delete"] {
                    if let Some(value) = body.get(part) {
                        parse_json(state, value, uids, &mut writes);
                    }
                }
            }
            None => {
                let nquads: Vec<_> = raw
                    .lines()
                    .map(str::trim)
                    .filter(|line| line.ends_with('.'))
                    .collect();
                parse_nquads(state, &nquads.join("\n"), uids, &mut writes)?;
            }
        }
    }
    Ok(writes)
}

fn resolve_subject(
    state: &mut ServerState,
    subject: Option<&str>,
    uids: &mut BTreeMap<String, String>,
) -> String {
    match subject {
        Some(blank) if blank.starts_with("_:") => {
            let name = blank.trim_start_matches("_:").to_owned();
            if let Some(uid) = uids.get(&name) {
                return uid.clone();
            }
            let uid = state.alloc_uid();
            uids.insert(name, uid.clone());
            uid
        }
        Some(uid) => uid.to_owned(),
        None => {
            let uid = state.alloc_uid();
            uids.insert(format!("dg.{}", uids.len()), uid.clone());
            uid
        }
    }
}

fn parse_json(
    state: &mut ServerState,
    body: &Value,
    uids: &mut BTreeMap<String, String>,
    writes: &mut Vec<Write>,
) {
    match body {
        Value::Array(items) => {
            for item in items {
                parse_json(state, item, uids, writes);
            }
        }
        Value::Object(obj) => {
            let subject = resolve_subject(state, obj.get("uid").and_then(Value::as_str), uids);
            for predicate in obj.keys().filter(|k| *k != "uid") {
                writes.push(Write {
                    subject: subject.clone(),
                    predicate: predicate.clone(),
                });
            }
        }
        _ => {}
    }
}

fn parse_nquads(
    state: &mut ServerState,
    nquads: &str,
    uids: &mut BTreeMap<String, String>,
    writes: &mut Vec<Write>,
) -> StubResult<()> {
    for line in nquads.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut tokens = line.split_whitespace();
        let (Some(subject), Some(predicate)) = (tokens.next(), tokens.next()) else {
            return Err(lex_error(line, "expected a subject and a predicate"));
        };
        let subject = if subject.starts_with("_:") {
            resolve_subject(state, Some(subject), uids)
        } else if let Some(uid) = subject.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
            uid.to_owned()
        } else {
            return Err(lex_error(line, &format!("invalid subject `{subject}`")));
        };
        let predicate = predicate
            .trim_start_matches('<')
            .trim_end_matches('>')
            .to_owned();
        writes.push(Write { subject, predicate });
    }
    Ok(())
}

fn lex_error(line: &str, detail: &str) -> StubError {
    ApiError::with_message("mutate", format!("while lexing {line}: {detail}")).into()
}

#[derive(Debug, Default)]
struct AuthState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    alpha_auth_token: Option<String>,
    cloud_api_key: Option<String>,
}

/// A stub talking to a [`MockServer`].
#[derive(Debug)]
pub struct MockStub {
    id: usize,
    server: Arc<MockServer>,
    auth: Mutex<AuthState>,
}

impl MockStub {
    pub fn new(id: usize, server: Arc<MockServer>) -> Self {
        Self {
            id,
            server,
            auth: Mutex::new(AuthState::default()),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn access_token(&self) -> Option<String> {
        self.auth.lock().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.auth.lock().refresh_token.clone()
    }

    pub fn alpha_auth_token(&self) -> Option<String> {
        self.auth.lock().alpha_auth_token.clone()
    }

    pub fn cloud_api_key(&self) -> Option<String> {
        self.auth.lock().cloud_api_key.clone()
    }

    fn store_tokens(&self, (access, refresh): (String, String)) {
        let mut auth = self.auth.lock();
        auth.access_token = Some(access);
        auth.refresh_token = Some(refresh);
    }
}

#[async_trait]
impl ServerStub for MockStub {
    async fn alter(&self, op: &Operation) -> StubResult<Payload> {
        self.server.alter(self.id, op)
    }

    async fn query(&self, req: &Request) -> StubResult<Response> {
        self.server.query(self.id, req)
    }

    async fn mutate(&self, mu: &Mutation) -> StubResult<Assigned> {
        self.server.mutate(self.id, mu)
    }

    async fn commit(&self, ctx: &TxnContext) -> StubResult<()> {
        self.server.commit(self.id, ctx)
    }

    async fn abort(&self, ctx: &TxnContext) -> StubResult<()> {
        self.server.abort(self.id, ctx)
    }

    async fn login(&self, userid: &str, password: &str) -> StubResult<()> {
        let tokens = self.server.login(self.id, userid, password, None)?;
        self.store_tokens(tokens);
        Ok(())
    }

    async fn login_into_namespace(
        &self,
        userid: &str,
        password: &str,
        namespace: Option<u64>,
    ) -> StubResult<()> {
        let tokens = self.server.login(self.id, userid, password, namespace)?;
        self.store_tokens(tokens);
        Ok(())
    }

    fn logout(&self) {
        let mut auth = self.auth.lock();
        auth.access_token = None;
        auth.refresh_token = None;
    }

    fn set_alpha_auth_token(&self, token: &str) {
        self.auth.lock().alpha_auth_token = Some(token.to_owned());
    }

    fn set_cloud_api_key(&self, api_key: &str) {
        self.auth.lock().cloud_api_key = Some(api_key.to_owned());
    }

    async fn fetch_ui_keywords(&self) -> StubResult<UiKeywords> {
        Ok(self.server.ui_keywords(self.id))
    }

    async fn get_health(&self, all: bool) -> StubResult<Value> {
        Ok(self.server.health(self.id, all))
    }

    async fn get_state(&self) -> StubResult<Value> {
        Ok(self.server.state(self.id))
    }
}

/// A server together with a pool of stubs pointing at it.
#[derive(Debug)]
pub struct MockCluster {
    pub server: Arc<MockServer>,
    pub stubs: Vec<Arc<MockStub>>,
}

impl MockCluster {
    pub fn new(num_stubs: usize) -> Self {
        let server = MockServer::new();
        let stubs = (0..num_stubs)
            .map(|id| Arc::new(MockStub::new(id, server.clone())))
            .collect();
        Self { server, stubs }
    }

    pub fn dyn_stubs(&self) -> Vec<Arc<dyn ServerStub>> {
        self.stubs
            .iter()
            .map(|stub| stub.clone() as Arc<dyn ServerStub>)
            .collect()
    }

    /// Builds a client over every stub of the cluster.
    pub fn client(&self) -> Client {
        Client::new(self.dyn_stubs()).expect("cluster has at least one stub")
    }
}
