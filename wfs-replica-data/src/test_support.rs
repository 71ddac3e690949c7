//! Test doubles for the client and replication pipeline.
//!
//! [`StubWfsService`] answers capabilities, schema, hit-count, feature and
//! catalogue requests from in-memory tables, and can be scripted to fail a
//! number of times per request kind. [`FixedClock`] makes cache staleness
//! deterministic.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde_json::{Map, json};
use url::Url;
use wfs_replica_core::test_support::{AIRPORTS, UTM_ZONES, airports_schema, point_feature, table};
use wfs_replica_core::{
    ColumnDescriptor, FeatureRecord, Geometry, RetryPolicy, SchemaDescriptor, TableIdentifier,
    UpstreamType, ValidationError, Value,
};

use crate::cache::{Clock, MemoryCacheStore};
use crate::client::{WfsClient, WfsConfig, WfsError};
use crate::transport::{HttpReply, HttpSource, TransportError};

/// WFS endpoint served by [`StubWfsService`].
pub const STUB_WFS_URL: &str = "https://stub.example/geo/pub/wfs";

/// OWS endpoint served by [`StubWfsService`].
pub const STUB_OWS_URL: &str = "https://stub.example/geo/pub/ows";

/// Catalogue API served by [`StubWfsService`].
pub const STUB_CATALOGUE_URL: &str = "https://stub.example/api/3/action/";

/// Primary-key registry document served by [`StubWfsService`].
pub const STUB_PRIMARY_KEYS_URL: &str = "https://stub.example/primary_keys.json";

/// Status used by [`StubWfsService::fail`] to simulate a network error.
pub const NETWORK_FAILURE: u16 = 0;

/// [`Clock`] that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<SystemTime>,
}

impl FixedClock {
    /// Clock reading `now`.
    #[must_use]
    pub const fn new(now: SystemTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Request categories understood by [`StubWfsService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RequestKind {
    /// `GetCapabilities`.
    Capabilities,
    /// `DescribeFeatureType`.
    Describe,
    /// `GetFeature` with `resultType=hits`.
    Hits,
    /// `GetFeature` returning features.
    Features,
    /// Catalogue `package_show`.
    Catalogue,
    /// Primary-key registry document.
    PrimaryKeys,
}

#[derive(Debug, Clone)]
struct StubTable {
    schema: SchemaDescriptor,
    features: Vec<FeatureRecord>,
}

#[derive(Debug, Clone, Copy)]
struct ScriptedFailure {
    kind: RequestKind,
    status: u16,
    remaining: u32,
}

/// In-memory WFS implementing [`HttpSource`].
#[derive(Debug, Default)]
pub struct StubWfsService {
    page_size: u64,
    tables: BTreeMap<TableIdentifier, StubTable>,
    packages: BTreeMap<String, Vec<String>>,
    primary_keys: Option<String>,
    failures: RefCell<Vec<ScriptedFailure>>,
    attempts: RefCell<BTreeMap<RequestKind, u32>>,
    requests: RefCell<Vec<Url>>,
}

impl StubWfsService {
    /// Empty service advertising `page_size` as its `CountDefault`.
    #[must_use]
    pub fn new(page_size: u64) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// Publish a table.
    #[must_use]
    pub fn with_table(mut self, schema: SchemaDescriptor, features: Vec<FeatureRecord>) -> Self {
        self.tables
            .insert(schema.table.clone(), StubTable { schema, features });
        self
    }

    /// Register a catalogue package publishing `layers`.
    #[must_use]
    pub fn with_package(mut self, label: &str, layers: &[&str]) -> Self {
        self.packages.insert(
            label.to_ascii_lowercase(),
            layers.iter().map(|layer| (*layer).to_owned()).collect(),
        );
        self
    }

    /// Serve `json` as the primary-key registry.
    #[must_use]
    pub fn with_primary_keys(mut self, json: &str) -> Self {
        self.primary_keys = Some(json.to_owned());
        self
    }

    /// Fail the next `times` requests of `kind` with `status`, or with a
    /// network error when `status` is [`NETWORK_FAILURE`].
    pub fn fail(&self, kind: RequestKind, status: u16, times: u32) {
        self.failures.borrow_mut().push(ScriptedFailure {
            kind,
            status,
            remaining: times,
        });
    }

    /// Requests of `kind` received so far, including failed ones.
    #[must_use]
    pub fn attempts(&self, kind: RequestKind) -> u32 {
        self.attempts.borrow().get(&kind).copied().unwrap_or(0)
    }

    /// Every URL requested, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<Url> {
        self.requests.borrow().clone()
    }

    fn scripted_failure(&self, kind: RequestKind) -> Option<u16> {
        let mut failures = self.failures.borrow_mut();
        let failure = failures
            .iter_mut()
            .find(|failure| failure.kind == kind && failure.remaining > 0)?;
        failure.remaining -= 1;
        Some(failure.status)
    }

    fn respond(&self, kind: RequestKind, url: &Url) -> HttpReply {
        let params: BTreeMap<String, String> = url
            .query_pairs()
            .map(|(key, value)| (key.to_ascii_lowercase(), value.into_owned()))
            .collect();
        match kind {
            RequestKind::Capabilities => HttpReply::new(200, self.capabilities_xml()),
            RequestKind::Catalogue => self.package(params.get("id").map_or("", String::as_str)),
            RequestKind::PrimaryKeys => self
                .primary_keys
                .as_ref()
                .map_or_else(|| not_found("registry"), |json| HttpReply::new(200, json.clone())),
            RequestKind::Describe | RequestKind::Hits | RequestKind::Features => {
                let type_name = params
                    .get("typenames")
                    .or_else(|| params.get("typename"))
                    .map_or("", String::as_str);
                let Some(stub) = TableIdentifier::parse(type_name)
                    .ok()
                    .and_then(|table| self.tables.get(&table))
                else {
                    return not_found(type_name);
                };
                match kind {
                    RequestKind::Describe => HttpReply::new(200, describe_json(&stub.schema)),
                    RequestKind::Hits => {
                        let matched = matching(stub, params.get("cql_filter")).len();
                        HttpReply::new(200, hits_xml(matched))
                    }
                    _ => HttpReply::new(200, feature_page(stub, &params)),
                }
            }
        }
    }

    fn capabilities_xml(&self) -> String {
        let feature_types: String = self
            .tables
            .keys()
            .map(|table| {
                format!(
                    "<wfs:FeatureType><wfs:Name>pub:{}</wfs:Name></wfs:FeatureType>",
                    table.wire_name()
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:WFS_Capabilities version="2.0.0" xmlns:wfs="http://www.opengis.net/wfs/2.0" xmlns:ows="http://www.opengis.net/ows/1.1">
<ows:OperationsMetadata><ows:Constraint name="CountDefault"><ows:NoValues/><ows:DefaultValue>{}</ows:DefaultValue></ows:Constraint></ows:OperationsMetadata>
<wfs:FeatureTypeList>{feature_types}</wfs:FeatureTypeList>
</wfs:WFS_Capabilities>"#,
            self.page_size
        )
    }

    fn package(&self, id: &str) -> HttpReply {
        let Some(layers) = self.packages.get(id) else {
            return HttpReply::new(
                404,
                json!({"success": false, "error": {"message": "Not found"}}).to_string(),
            );
        };
        let resources: Vec<serde_json::Value> = layers
            .iter()
            .map(|layer| {
                json!({
                    "format": "wms",
                    "url": format!("https://openmaps.gov.bc.ca/geo/pub/{layer}/ows?service=WMS"),
                })
            })
            .collect();
        HttpReply::new(
            200,
            json!({"success": true, "result": {"name": id, "resources": resources}}).to_string(),
        )
    }
}

#[async_trait(?Send)]
impl HttpSource for StubWfsService {
    async fn get(&self, url: &Url) -> Result<HttpReply, TransportError> {
        self.requests.borrow_mut().push(url.clone());
        let kind = classify(url);
        *self.attempts.borrow_mut().entry(kind).or_insert(0) += 1;
        match self.scripted_failure(kind) {
            Some(NETWORK_FAILURE) => Err(TransportError::Network {
                url: url.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset"),
            }),
            Some(status) => Ok(HttpReply::new(status, format!("scripted failure {status}"))
                .with_header("content-type", "text/plain")),
            None => Ok(self.respond(kind, url)),
        }
    }
}

fn classify(url: &Url) -> RequestKind {
    if url.path().ends_with("package_show") {
        return RequestKind::Catalogue;
    }
    if url.path().ends_with("primary_keys.json") {
        return RequestKind::PrimaryKeys;
    }
    let mut request = String::new();
    let mut hits = false;
    for (key, value) in url.query_pairs() {
        if key.eq_ignore_ascii_case("request") {
            request = value.into_owned();
        } else if key.eq_ignore_ascii_case("resultType") {
            hits = value.eq_ignore_ascii_case("hits");
        }
    }
    match request.as_str() {
        "GetCapabilities" => RequestKind::Capabilities,
        "DescribeFeatureType" => RequestKind::Describe,
        _ if hits => RequestKind::Hits,
        _ => RequestKind::Features,
    }
}

fn not_found(what: &str) -> HttpReply {
    HttpReply::new(
        404,
        format!("<ows:ExceptionReport><ows:Exception><ows:ExceptionText>Unknown {what}</ows:ExceptionText></ows:Exception></ows:ExceptionReport>"),
    )
    .with_header("content-type", "application/xml")
}

fn hits_xml(matched: usize) -> String {
    format!(
        r#"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0" numberMatched="{matched}" numberReturned="0"/>"#
    )
}

fn describe_json(schema: &SchemaDescriptor) -> String {
    let mut properties: Vec<serde_json::Value> = schema
        .columns
        .iter()
        .map(|column| {
            let kind = match &column.upstream_type {
                UpstreamType::Number => "xsd:decimal".to_owned(),
                UpstreamType::Varchar => "xsd:string".to_owned(),
                UpstreamType::Date => "xsd:date".to_owned(),
                UpstreamType::Geometry(raw) | UpstreamType::Other(raw) => raw.clone(),
            };
            json!({"name": column.name, "nillable": column.nullable, "type": kind})
        })
        .collect();
    if let Some(geometry) = &schema.geometry_column {
        properties.push(json!({"name": geometry, "nillable": true, "type": "gml:GeometryPropertyType"}));
    }
    json!({
        "targetPrefix": "pub",
        "featureTypes": [{"typeName": schema.table.wire_name(), "properties": properties}],
    })
    .to_string()
}

/// Features passing the equality clauses of a CQL filter. Clauses the stub
/// cannot interpret, such as `bbox(..)`, match everything.
fn matching<'a>(stub: &'a StubTable, filter: Option<&String>) -> Vec<&'a FeatureRecord> {
    let clauses: Vec<(String, String)> = filter
        .map(|filter| {
            filter
                .split(" AND ")
                .filter_map(|clause| {
                    let clause = clause.trim().trim_start_matches('(').trim_end_matches(')');
                    let (column, value) = clause.split_once('=')?;
                    Some((
                        column.trim().to_owned(),
                        value.trim().trim_matches('\'').to_owned(),
                    ))
                })
                .collect()
        })
        .unwrap_or_default();
    stub.features
        .iter()
        .filter(|feature| {
            clauses.iter().all(|(column, expected)| {
                feature
                    .attributes
                    .get_ignore_case(column)
                    .is_some_and(|value| render(value) == *expected)
            })
        })
        .collect()
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(number) => number.to_string(),
        Value::Float(number) => number.to_string(),
        Value::Text(text) => text.clone(),
        Value::Date(date) => date.format("%Y-%m-%d").to_string(),
    }
}

fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (Some(Value::Integer(a)), Some(Value::Integer(b))) => a.cmp(b),
        (Some(a), Some(b)) => render(a).cmp(&render(b)),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
    }
}

fn feature_page(stub: &StubTable, params: &BTreeMap<String, String>) -> String {
    let mut features = matching(stub, params.get("cql_filter"));
    if let Some(column) = params.get("sortby") {
        let column = column.split_whitespace().next().unwrap_or_default();
        features.sort_by(|a, b| {
            compare_values(
                a.attributes.get_ignore_case(column),
                b.attributes.get_ignore_case(column),
            )
        });
    }
    let number = |key: &str| params.get(key).and_then(|raw| raw.parse::<usize>().ok());
    let start = number("startindex").unwrap_or(0);
    let count = number("count").unwrap_or(usize::MAX);
    let page: Vec<serde_json::Value> = features
        .into_iter()
        .skip(start)
        .take(count)
        .map(feature_json)
        .collect();
    json!({
        "type": "FeatureCollection",
        "numberReturned": page.len(),
        "features": page,
    })
    .to_string()
}

fn feature_json(feature: &FeatureRecord) -> serde_json::Value {
    let properties: Map<String, serde_json::Value> = feature
        .attributes
        .iter()
        .map(|(name, value)| {
            let value = match value {
                Value::Null => serde_json::Value::Null,
                Value::Integer(number) => json!(number),
                Value::Float(number) => json!(number),
                Value::Text(text) => json!(text),
                Value::Date(date) => json!(format!("{}Z", date.format("%Y-%m-%d"))),
            };
            (name.to_owned(), value)
        })
        .collect();
    json!({
        "type": "Feature",
        "id": feature.id,
        "geometry": feature.geometry,
        "properties": properties,
    })
}

/// Airports schema with `n` point features ordered by `SEQ_ID`.
///
/// Every fifth airport is a single-member `MultiPoint` and every seventh has
/// no geometry.
pub fn airports(n: i64) -> Result<(SchemaDescriptor, Vec<FeatureRecord>), ValidationError> {
    let features = (1..=n)
        .map(|seq| {
            let x = 1_000_000.0 + seq as f64;
            let y = 400_000.0 + seq as f64;
            let mut feature = point_feature(seq, x, y, &format!("Airport {seq}"));
            feature
                .attributes
                .insert("LOCALITY", Value::Text(format!("Locality {}", seq % 10)));
            feature
                .attributes
                .insert("OPEN_DATE", Value::Text("2001-02-03Z".to_owned()));
            feature
                .attributes
                .insert("FEATURE_AREA_SQM", Value::Float(12.5));
            if seq % 7 == 0 {
                feature.geometry = None;
            } else if seq % 5 == 0 {
                feature.geometry = Some(Geometry::MultiPoint(vec![vec![x, y]]));
            }
            feature
        })
        .collect();
    Ok((airports_schema()?, features))
}

/// UTM zone polygons 7 to 12.
pub fn utm_zones() -> Result<(SchemaDescriptor, Vec<FeatureRecord>), ValidationError> {
    let schema = SchemaDescriptor {
        table: table(UTM_ZONES)?,
        columns: vec![
            ColumnDescriptor::new("UTM_ZONE", UpstreamType::Number),
            ColumnDescriptor::new("OBJECTID", UpstreamType::Number),
        ],
        geometry_column: Some("GEOMETRY".to_owned()),
        comments: None,
    };
    let features = (7..=12_i64)
        .map(|zone| {
            let west = -180.0 + 6.0 * (zone - 1) as f64;
            let ring = vec![
                vec![west, 48.0],
                vec![west + 6.0, 48.0],
                vec![west + 6.0, 60.0],
                vec![west, 60.0],
                vec![west, 48.0],
            ];
            let attributes = [
                ("UTM_ZONE".to_owned(), Value::Integer(zone)),
                ("OBJECTID".to_owned(), Value::Integer(zone)),
            ]
            .into_iter()
            .collect();
            FeatureRecord::new(
                Some(format!("{UTM_ZONES}.{zone}")),
                Some(Geometry::Polygon(vec![ring])),
                attributes,
            )
        })
        .collect();
    Ok((schema, features))
}

/// Service publishing `airport_count` airports and the six UTM zones.
pub fn stub_service(airport_count: i64, page_size: u64) -> Result<StubWfsService, ValidationError> {
    let (airports_schema, airport_features) = airports(airport_count)?;
    let (zones_schema, zone_features) = utm_zones()?;
    Ok(StubWfsService::new(page_size)
        .with_table(airports_schema, airport_features)
        .with_table(zones_schema, zone_features)
        .with_package("bc-airports", &[AIRPORTS])
        .with_package("bc-base-maps", &[UTM_ZONES, AIRPORTS]))
}

/// Configuration pointing at the stub endpoints with a short retry budget.
#[must_use]
pub fn stub_config() -> WfsConfig {
    WfsConfig::new(STUB_WFS_URL, STUB_OWS_URL)
        .with_catalogue_url(STUB_CATALOGUE_URL)
        .with_retry(RetryPolicy::new(
            Duration::from_millis(1),
            Duration::from_millis(4),
            Duration::from_secs(2),
        ))
}

/// Client over `service` with an in-memory cache.
pub fn stub_client(
    service: StubWfsService,
) -> Result<WfsClient<StubWfsService, MemoryCacheStore>, WfsError> {
    WfsClient::with_parts(stub_config(), service, MemoryCacheStore::new())
}
