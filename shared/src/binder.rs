use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::capabilities::store::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinderSlot {
    PatientProfile,
    Medications,
    HealthMetrics,
}

impl BinderSlot {
    pub const ALL: [BinderSlot; 3] = [
        BinderSlot::PatientProfile,
        BinderSlot::Medications,
        BinderSlot::HealthMetrics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BinderSlot::PatientProfile => "patient_profile",
            BinderSlot::Medications => "medications",
            BinderSlot::HealthMetrics => "health_metrics",
        }
    }
}

/// Identifies one live store listener. The generation only ever grows, so an id
/// that is not the binder's current one always belongs to a torn-down listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId {
    pub slot: BinderSlot,
    pub generation: u64,
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.slot.as_str(), self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    ArrayContains,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOp::Equal, FilterValue::Text(value.into()))
    }
}

/// What a binder is subscribed to. Compared by value: two identities built
/// separately from the same path and filter are the same query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryIdentity {
    Collection {
        path: String,
        filter: Option<Filter>,
    },
    Document {
        path: String,
    },
}

impl QueryIdentity {
    pub fn collection(path: impl Into<String>) -> Self {
        QueryIdentity::Collection {
            path: path.into(),
            filter: None,
        }
    }

    pub fn document(path: impl Into<String>) -> Self {
        QueryIdentity::Document { path: path.into() }
    }

    #[must_use]
    pub fn with_filter(self, filter: Filter) -> Self {
        match self {
            QueryIdentity::Collection { path, .. } => QueryIdentity::Collection {
                path,
                filter: Some(filter),
            },
            doc @ QueryIdentity::Document { .. } => doc,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            QueryIdentity::Collection { path, .. } | QueryIdentity::Document { path } => path,
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self, QueryIdentity::Document { .. })
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BinderError {
    #[error("record {id} could not be decoded: {reason}")]
    Decode { id: String, reason: String },
}

/// A stored record as materialized by the store: its identifier plus the raw fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Builds a record from a JSON object. Non-object values produce an empty record.
    pub fn from_value(id: impl Into<String>, value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(id, fields)
    }

    /// Decodes the record into a typed view, with the identifier merged in as `id`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, BinderError> {
        let mut object = self.fields.clone();
        object.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(object)).map_err(|e| BinderError::Decode {
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }
}

/// A full snapshot as emitted by the store. Every emission replaces the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoundData {
    Records(Vec<Record>),
    Document(Option<Record>),
}

impl BoundData {
    pub fn records(&self) -> &[Record] {
        match self {
            BoundData::Records(records) => records,
            BoundData::Document(_) => &[],
        }
    }

    pub fn document(&self) -> Option<&Record> {
        match self {
            BoundData::Document(doc) => doc.as_ref(),
            BoundData::Records(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BoundData::Records(records) => records.len(),
            BoundData::Document(doc) => usize::from(doc.is_some()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionResult {
    pub data: Option<BoundData>,
    pub loading: bool,
    pub error: Option<StoreError>,
}

impl SubscriptionResult {
    fn loading() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
        }
    }

    pub fn decode_records<T: DeserializeOwned>(&self) -> Vec<T> {
        let Some(data) = &self.data else {
            return Vec::new();
        };
        data.records()
            .iter()
            .filter_map(|record| match record.decode() {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(error = %e, "skipping undecodable record");
                    None
                }
            })
            .collect()
    }

    pub fn decode_document<T: DeserializeOwned>(&self) -> Option<T> {
        let record = self.data.as_ref()?.document()?;
        match record.decode() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "document could not be decoded");
                None
            }
        }
    }
}

/// The store commands required to move from the previous query to the new one.
/// At most one release and at most one subscribe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindPlan {
    pub release: Option<SubscriptionId>,
    pub subscribe: Option<(SubscriptionId, QueryIdentity)>,
}

impl BindPlan {
    pub fn is_noop(&self) -> bool {
        self.release.is_none() && self.subscribe.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Applied,
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
struct LiveSubscription {
    id: SubscriptionId,
    query: QueryIdentity,
    terminated: bool,
}

/// Keeps one remote query bound to a `{data, loading, error}` snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Binder {
    slot: BinderSlot,
    generation: u64,
    live: Option<LiveSubscription>,
    result: SubscriptionResult,
}

impl Binder {
    pub fn new(slot: BinderSlot) -> Self {
        Self {
            slot,
            generation: 0,
            live: None,
            result: SubscriptionResult::default(),
        }
    }

    pub fn slot(&self) -> BinderSlot {
        self.slot
    }

    pub fn result(&self) -> &SubscriptionResult {
        &self.result
    }

    pub fn current_id(&self) -> Option<SubscriptionId> {
        self.live.as_ref().map(|live| live.id)
    }

    pub fn query(&self) -> Option<&QueryIdentity> {
        self.live.as_ref().map(|live| &live.query)
    }

    pub fn bind(&mut self, query: Option<QueryIdentity>) -> BindPlan {
        if self.live.as_ref().map(|live| &live.query) == query.as_ref() {
            return BindPlan::default();
        }

        let release = self.live.take().map(|live| {
            info!(id = %live.id, path = live.query.path(), "releasing subscription");
            live.id
        });

        let Some(query) = query else {
            self.result = SubscriptionResult::default();
            return BindPlan {
                release,
                subscribe: None,
            };
        };

        self.generation += 1;
        let id = SubscriptionId {
            slot: self.slot,
            generation: self.generation,
        };
        info!(id = %id, path = query.path(), "subscribing");

        self.live = Some(LiveSubscription {
            id,
            query: query.clone(),
            terminated: false,
        });
        self.result = SubscriptionResult::loading();

        BindPlan {
            release,
            subscribe: Some((id, query)),
        }
    }

    /// Applies one store emission. Emissions for torn-down or failed
    /// subscriptions are dropped without touching the reported state.
    pub fn apply(&mut self, id: SubscriptionId, outcome: StoreResult) -> Delivery {
        let current = self.current_id();
        let Some(live) = self.live.as_mut().filter(|live| live.id == id) else {
            warn!(id = %id, current = ?current, "discarding stale store delivery");
            return Delivery::Stale;
        };

        if live.terminated {
            warn!(id = %id, "discarding delivery after terminal error");
            return Delivery::Stale;
        }

        match outcome {
            Ok(data) => {
                debug!(id = %id, records = data.len(), "snapshot applied");
                self.result = SubscriptionResult {
                    data: Some(data),
                    loading: false,
                    error: None,
                };
            }
            Err(error) => {
                warn!(id = %id, error = %error, "subscription failed");
                live.terminated = true;
                self.result.loading = false;
                self.result.error = Some(error);
            }
        }

        Delivery::Applied
    }

    pub fn unmount(&mut self) -> Option<SubscriptionId> {
        self.bind(None).release
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn meds() -> QueryIdentity {
        QueryIdentity::collection("medications")
    }

    fn record(id: &str, value: Value) -> Record {
        Record::from_value(id, value)
    }

    #[test]
    fn initial_state_is_idle() {
        let binder = Binder::new(BinderSlot::Medications);
        assert_eq!(binder.result(), &SubscriptionResult::default());
        assert!(!binder.result().loading);
        assert!(binder.current_id().is_none());
    }

    #[test]
    fn bind_subscribes_and_marks_loading() {
        let mut binder = Binder::new(BinderSlot::Medications);
        let plan = binder.bind(Some(meds()));

        assert!(plan.release.is_none());
        let (id, query) = plan.subscribe.expect("subscribe");
        assert_eq!(id.generation, 1);
        assert_eq!(query, meds());
        assert!(binder.result().loading);
    }

    #[test]
    fn equal_query_does_not_resubscribe() {
        let mut binder = Binder::new(BinderSlot::Medications);
        binder.bind(Some(meds()));
        let plan = binder.bind(Some(QueryIdentity::collection(String::from("medications"))));
        assert!(plan.is_noop());
        assert_eq!(binder.current_id().map(|id| id.generation), Some(1));
    }

    #[test]
    fn changed_filter_releases_old_subscription() {
        let mut binder = Binder::new(BinderSlot::Medications);
        let first = binder.bind(Some(meds())).subscribe.expect("subscribe").0;
        let plan = binder.bind(Some(meds().with_filter(Filter::equals("time", "8:00 AM"))));

        assert_eq!(plan.release, Some(first));
        assert_eq!(plan.subscribe.map(|(id, _)| id.generation), Some(2));
    }

    #[test]
    fn null_query_releases_and_clears_loading() {
        let mut binder = Binder::new(BinderSlot::Medications);
        let id = binder.bind(Some(meds())).subscribe.expect("subscribe").0;
        let plan = binder.bind(None);

        assert_eq!(plan.release, Some(id));
        assert!(plan.subscribe.is_none());
        assert!(!binder.result().loading);
        assert!(binder.result().data.is_none());
    }

    #[test]
    fn snapshot_replaces_data_wholesale() {
        let mut binder = Binder::new(BinderSlot::Medications);
        let id = binder.bind(Some(meds())).subscribe.expect("subscribe").0;

        let first = BoundData::Records(vec![
            record("a", json!({"name": "Lisinopril"})),
            record("b", json!({"name": "Metformin"})),
        ]);
        assert_eq!(binder.apply(id, Ok(first)), Delivery::Applied);
        assert_eq!(binder.result().data.as_ref().map(BoundData::len), Some(2));

        let second = BoundData::Records(vec![record("c", json!({"name": "Aspirin"}))]);
        binder.apply(id, Ok(second.clone()));
        assert_eq!(binder.result().data, Some(second));
        assert!(!binder.result().loading);
    }

    #[test]
    fn absent_document_is_not_an_error() {
        let mut binder = Binder::new(BinderSlot::PatientProfile);
        let id = binder
            .bind(Some(QueryIdentity::document("patientProfiles/jane-doe")))
            .subscribe
            .expect("subscribe")
            .0;

        binder.apply(id, Ok(BoundData::Document(None)));
        let result = binder.result();
        assert!(!result.loading);
        assert!(result.error.is_none());
        assert_eq!(result.data, Some(BoundData::Document(None)));
    }

    #[test]
    fn error_keeps_previous_data_and_is_terminal() {
        let mut binder = Binder::new(BinderSlot::Medications);
        let id = binder.bind(Some(meds())).subscribe.expect("subscribe").0;
        let data = BoundData::Records(vec![record("a", json!({}))]);
        binder.apply(id, Ok(data.clone()));

        let error = StoreError::PermissionDenied {
            path: "medications".into(),
        };
        binder.apply(id, Err(error.clone()));
        assert_eq!(binder.result().data, Some(data.clone()));
        assert_eq!(binder.result().error, Some(error.clone()));
        assert!(!binder.result().loading);

        let later = BoundData::Records(Vec::new());
        assert_eq!(binder.apply(id, Ok(later)), Delivery::Stale);
        assert_eq!(binder.result().error, Some(error));
    }

    #[test]
    fn new_query_recovers_from_error() {
        let mut binder = Binder::new(BinderSlot::Medications);
        let id = binder.bind(Some(meds())).subscribe.expect("subscribe").0;
        binder.apply(
            id,
            Err(StoreError::Unavailable {
                message: "offline".into(),
            }),
        );

        let next = binder
            .bind(Some(QueryIdentity::collection("medications-v2")))
            .subscribe
            .expect("subscribe")
            .0;
        assert!(binder.result().error.is_none());
        assert_eq!(binder.apply(next, Ok(BoundData::Records(vec![]))), Delivery::Applied);
    }

    #[test]
    fn delivery_after_switch_is_discarded() {
        let mut binder = Binder::new(BinderSlot::Medications);
        let old = binder.bind(Some(meds())).subscribe.expect("subscribe").0;
        binder.bind(Some(QueryIdentity::collection("archived")));

        let before = binder.result().clone();
        let delivery = binder.apply(old, Ok(BoundData::Records(vec![record("x", json!({}))])));
        assert_eq!(delivery, Delivery::Stale);
        assert_eq!(binder.result(), &before);
    }

    #[test]
    fn delivery_after_unmount_is_discarded() {
        let mut binder = Binder::new(BinderSlot::HealthMetrics);
        let id = binder
            .bind(Some(QueryIdentity::collection("healthMetrics")))
            .subscribe
            .expect("subscribe")
            .0;
        assert_eq!(binder.unmount(), Some(id));
        assert_eq!(binder.unmount(), None);

        assert_eq!(binder.apply(id, Ok(BoundData::Records(vec![]))), Delivery::Stale);
        assert!(binder.result().data.is_none());
    }

    #[test]
    fn record_decode_merges_id() {
        #[derive(Deserialize)]
        struct Med {
            id: String,
            name: String,
        }

        let rec = record("med-1", json!({"name": "Lisinopril"}));
        let med: Med = rec.decode().expect("decode");
        assert_eq!(med.id, "med-1");
        assert_eq!(med.name, "Lisinopril");
    }

    #[test]
    fn decode_records_skips_bad_rows() {
        #[derive(Deserialize)]
        struct Named {
            name: String,
        }

        let result = SubscriptionResult {
            data: Some(BoundData::Records(vec![
                record("a", json!({"name": "ok"})),
                record("b", json!({"name": 42})),
            ])),
            loading: false,
            error: None,
        };
        let rows: Vec<Named> = result.decode_records();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "ok");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Bind(Option<u8>),
        Deliver { generation: u64 },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            proptest::option::of(0u8..4).prop_map(Op::Bind),
            (0u64..12).prop_map(|generation| Op::Deliver { generation }),
        ]
    }

    proptest! {
        #[test]
        fn never_more_than_one_live_listener(ops in proptest::collection::vec(op_strategy(), 0..60)) {
            let mut binder = Binder::new(BinderSlot::Medications);
            let mut listeners: HashSet<SubscriptionId> = HashSet::new();

            for op in ops {
                match op {
                    Op::Bind(query) => {
                        let plan = binder.bind(query.map(|n| QueryIdentity::collection(format!("c{n}"))));
                        if let Some(id) = plan.release {
                            prop_assert!(listeners.remove(&id));
                        }
                        if let Some((id, _)) = plan.subscribe {
                            prop_assert!(listeners.insert(id));
                        }
                    }
                    Op::Deliver { generation } => {
                        let id = SubscriptionId { slot: BinderSlot::Medications, generation };
                        let before = binder.result().clone();
                        if binder.apply(id, Ok(BoundData::Records(vec![]))) == Delivery::Stale {
                            prop_assert_eq!(binder.result(), &before);
                        } else {
                            prop_assert!(listeners.contains(&id));
                        }
                    }
                }
                prop_assert!(listeners.len() <= 1);
                prop_assert_eq!(listeners.len(), usize::from(binder.current_id().is_some()));
            }
        }
    }
}
