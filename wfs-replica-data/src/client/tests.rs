//! Unit tests for [`WfsClient`] against the in-process stub service.

use super::*;
use crate::cache::MemoryCacheStore;
use crate::test_support::{
    NETWORK_FAILURE, RequestKind, STUB_PRIMARY_KEYS_URL, StubWfsService, stub_client,
    stub_config, stub_service,
};
use crate::transport::TransportError;
use rstest::{fixture, rstest};
use wfs_replica_core::test_support::{AIRPORTS, UTM_ZONES};
use wfs_replica_core::{BoundingBox, DEFAULT_BOUNDS_CRS, FilterExpression, GeometryKind, Value};

type StubClient = WfsClient<StubWfsService, MemoryCacheStore>;

fn client_with(airports: i64, page_size: u64) -> StubClient {
    let service = stub_service(airports, page_size).expect("stub fixtures are valid");
    stub_client(service).expect("stub client should build")
}

#[fixture]
fn paged_client() -> StubClient {
    client_with(455, 250)
}

fn counts(pages: &[PageDescriptor]) -> Vec<u64> {
    pages.iter().map(|page| page.count).collect()
}

fn sorted_ids(features: &[FeatureRecord]) -> Vec<Option<String>> {
    let mut ids: Vec<Option<String>> = features.iter().map(|feature| feature.id.clone()).collect();
    ids.sort();
    ids
}

#[rstest]
fn lists_tables_from_cached_capabilities(paged_client: StubClient) {
    let tables = paged_client.list_tables(false).expect("list tables");
    let names: Vec<String> = tables.iter().map(ToString::to_string).collect();
    assert_eq!(names, [UTM_ZONES, AIRPORTS]);
    paged_client.list_tables(false).expect("list tables again");
    assert_eq!(paged_client.source().attempts(RequestKind::Capabilities), 1);
    paged_client.list_tables(true).expect("refresh tables");
    assert_eq!(paged_client.source().attempts(RequestKind::Capabilities), 2);
}

#[rstest]
fn unreadable_cache_entries_are_refetched(paged_client: StubClient) {
    paged_client
        .cache()
        .put(CAPABILITIES_KEY, "not json")
        .expect("seed corrupt entry");
    let tables = paged_client.list_tables(false).expect("list tables");
    assert_eq!(tables.len(), 2);
    assert_eq!(paged_client.source().attempts(RequestKind::Capabilities), 1);
}

#[rstest]
fn page_size_override_only_lowers_the_server_default() {
    let service = stub_service(10, 250).expect("stub fixtures are valid");
    let lower = NonZeroU64::new(100).expect("non-zero");
    let client = WfsClient::with_parts(
        stub_config().with_page_size(lower),
        service,
        MemoryCacheStore::new(),
    )
    .expect("client builds");
    assert_eq!(client.page_size().expect("page size"), lower);

    let service = stub_service(10, 250).expect("stub fixtures are valid");
    let higher = NonZeroU64::new(1_000).expect("non-zero");
    let client = WfsClient::with_parts(
        stub_config().with_page_size(higher),
        service,
        MemoryCacheStore::new(),
    )
    .expect("client builds");
    assert_eq!(client.page_size().expect("page size").get(), 250);
}

#[rstest]
#[case("whse_imagery_and_base_maps.gsr_airports_svw", AIRPORTS)]
#[case(" WHSE_BASEMAPPING.UTMG_UTM_ZONES_SP ", UTM_ZONES)]
#[case("BC-Airports", AIRPORTS)]
fn resolves_tables_and_package_labels(
    paged_client: StubClient,
    #[case] input: &str,
    #[case] expected: &str,
) {
    let table = paged_client.resolve_name(input).expect("resolve name");
    assert_eq!(table.to_string(), expected);
}

#[rstest]
#[case("no-such-package")]
#[case("WHSE_MISSING.NOT_PUBLISHED")]
fn unknown_labels_are_not_found(paged_client: StubClient, #[case] input: &str) {
    let err = paged_client.resolve_name(input).expect_err("label is unknown");
    assert!(
        matches!(&err, WfsError::NotFound { input: reported } if reported == input),
        "unexpected error: {err:?}"
    );
}

#[rstest]
fn packages_with_several_layers_are_ambiguous(paged_client: StubClient) {
    match paged_client.resolve_name("bc-base-maps") {
        Err(WfsError::AmbiguousPackage { candidates, .. }) => {
            assert_eq!(candidates, [UTM_ZONES, AIRPORTS]);
        }
        other => panic!("expected an ambiguous package, got {other:?}"),
    }
}

#[rstest]
fn schemas_are_cached_per_table(paged_client: StubClient) {
    let schema = paged_client.get_schema(AIRPORTS).expect("airports schema");
    assert_eq!(schema.geometry_column.as_deref(), Some("SHAPE"));
    assert!(schema.has_column("OBJECTID"));
    paged_client.get_schema(AIRPORTS).expect("cached schema");
    assert_eq!(paged_client.source().attempts(RequestKind::Describe), 1);
    paged_client.get_schema(UTM_ZONES).expect("zones schema");
    assert_eq!(paged_client.source().attempts(RequestKind::Describe), 2);
}

#[rstest]
fn counts_matching_records(paged_client: StubClient) {
    let all = paged_client
        .get_count(AIRPORTS, &RequestOptions::new())
        .expect("count all");
    assert_eq!(all, 455);
    let filtered = RequestOptions::new()
        .with_filter(FilterExpression::new().with_query("LOCALITY = 'Locality 3'"));
    assert_eq!(
        paged_client.get_count(AIRPORTS, &filtered).expect("count filtered"),
        46
    );
}

#[rstest]
fn bounding_boxes_use_the_schema_geometry_column(paged_client: StubClient) {
    let bbox = BoundingBox::from_bounds(1_188_000.0, 377_051.0, 1_207_437.0, 390_361.0, DEFAULT_BOUNDS_CRS);
    let options = RequestOptions::new().with_filter(FilterExpression::new().with_bbox(bbox));
    paged_client.get_count(AIRPORTS, &options).expect("count in bbox");
    let hits = paged_client
        .source()
        .requests()
        .into_iter()
        .rev()
        .find(|url| url.query().is_some_and(|query| query.contains("resultType=hits")))
        .expect("a hits request");
    let filter = hits
        .query_pairs()
        .find(|(key, _)| key == "CQL_FILTER")
        .map(|(_, value)| value.into_owned())
        .expect("a CQL filter");
    assert_eq!(
        filter,
        "bbox(SHAPE, 1188000, 377051, 1207437, 390361, 'EPSG:3005')"
    );
}

#[rstest]
fn single_page_tables_need_no_sort_key() {
    let client = client_with(455, 10_000);
    let pages = client
        .define_requests(UTM_ZONES, &RequestOptions::new())
        .expect("plan zones");
    assert_eq!(counts(&pages), [6]);
    assert_eq!(pages[0].sort_key, None);
}

#[rstest]
fn multi_page_plans_derive_a_sort_key(paged_client: StubClient) {
    let pages = paged_client
        .define_requests(AIRPORTS, &RequestOptions::new())
        .expect("plan airports");
    assert_eq!(counts(&pages), [250, 205]);
    assert_eq!(
        pages.iter().map(|page| page.start_index).collect::<Vec<_>>(),
        [0, 250]
    );
    assert!(
        pages
            .iter()
            .all(|page| page.sort_key.as_deref() == Some("OBJECTID"))
    );
}

#[rstest]
#[case(RequestOptions::new().with_count(10), vec![10])]
#[case(RequestOptions::new().with_count(1_000), vec![250, 205])]
#[case(RequestOptions::new().with_count(300).with_verify_count(false), vec![250, 50])]
fn explicit_counts_follow_the_clamping_policy(
    paged_client: StubClient,
    #[case] options: RequestOptions,
    #[case] expected: Vec<u64>,
) {
    let pages = paged_client
        .define_requests(AIRPORTS, &options)
        .expect("plan airports");
    assert_eq!(counts(&pages), expected);
    let hits = paged_client.source().attempts(RequestKind::Hits);
    assert_eq!(hits, u32::from(options.verify_count));
}

#[rstest]
fn unverified_plans_need_a_count(paged_client: StubClient) {
    let options = RequestOptions::new().with_verify_count(false);
    let err = paged_client
        .define_requests(AIRPORTS, &options)
        .expect_err("count is required");
    assert!(matches!(
        err,
        WfsError::Validation(ValidationError::MissingCount)
    ));
}

#[rstest]
fn registered_primary_keys_take_precedence() {
    let service = stub_service(20, 250)
        .expect("stub fixtures are valid")
        .with_primary_keys(r#"{"WHSE_IMAGERY_AND_BASE_MAPS.GSR_AIRPORTS_SVW": "SEQ_ID"}"#);
    let client = WfsClient::with_parts(
        stub_config().with_primary_keys_url(STUB_PRIMARY_KEYS_URL),
        service,
        MemoryCacheStore::new(),
    )
    .expect("client builds");
    let selection = client
        .get_sort_key(AIRPORTS)
        .expect("sort key lookup")
        .expect("a sort key");
    assert_eq!(selection.column, "SEQ_ID");
    assert_eq!(selection.strategy, "registered-primary-key");
    assert_eq!(client.primary_keys().expect("registry").len(), 1);
    assert_eq!(client.source().attempts(RequestKind::PrimaryKeys), 1);
}

#[rstest]
fn zero_matches_skip_the_feature_request(paged_client: StubClient) {
    let options = RequestOptions::new()
        .with_filter(FilterExpression::new().with_query("AIRPORT_NAME = 'Nowhere'"));
    let pages = paged_client
        .define_requests(AIRPORTS, &options)
        .expect("plan empty result");
    assert_eq!(counts(&pages), [0]);
    let collection = paged_client.get_data(AIRPORTS, &options).expect("get data");
    assert!(collection.is_empty());
    assert_eq!(paged_client.source().attempts(RequestKind::Features), 0);
}

#[rstest]
fn materialised_and_lazy_reads_agree(paged_client: StubClient) {
    let options = RequestOptions::new();
    let collection = paged_client.get_data(AIRPORTS, &options).expect("get data");
    assert_eq!(collection.len(), 455);
    assert_eq!(collection.crs, None);
    let streamed: Vec<FeatureRecord> = paged_client
        .get_features(AIRPORTS, &options)
        .expect("plan iterator")
        .collect::<Result<_, _>>()
        .expect("stream features");
    assert_eq!(sorted_ids(&collection.features), sorted_ids(&streamed));
}

#[rstest]
fn lazy_reads_preserve_page_order(paged_client: StubClient) {
    let sequence: Vec<i64> = paged_client
        .get_features(AIRPORTS, &RequestOptions::new())
        .expect("plan iterator")
        .map(|feature| match feature.expect("feature").attributes.get("SEQ_ID") {
            Some(Value::Integer(seq)) => *seq,
            other => panic!("unexpected SEQ_ID {other:?}"),
        })
        .collect();
    assert_eq!(sequence, (1..=455).collect::<Vec<_>>());
}

#[rstest]
fn lazy_reads_stop_after_a_failed_page(paged_client: StubClient) {
    paged_client.source().fail(RequestKind::Features, 400, 1);
    let mut features = paged_client
        .get_features(AIRPORTS, &RequestOptions::new())
        .expect("plan iterator");
    assert_eq!(features.remaining_pages(), 2);
    assert!(matches!(features.next(), Some(Err(WfsError::Transport(_)))));
    assert!(features.next().is_none());
    assert_eq!(paged_client.source().attempts(RequestKind::Features), 1);
}

#[rstest]
fn lowercase_and_srs_options_apply_to_every_record(paged_client: StubClient) {
    let options = RequestOptions::new()
        .with_count(20)
        .with_srs("EPSG:3005")
        .with_lowercase(true);
    let collection = paged_client.get_data(AIRPORTS, &options).expect("get data");
    assert_eq!(collection.len(), 20);
    assert_eq!(collection.crs.as_deref(), Some("urn:ogc:def:crs:EPSG::3005"));
    assert!(collection.features.iter().all(|feature| {
        feature
            .attributes
            .names()
            .all(|name| name == name.to_ascii_lowercase())
    }));
}

#[rstest]
fn spatial_types_are_distinct_and_sorted(paged_client: StubClient) {
    let types = paged_client
        .spatial_types(AIRPORTS, 10)
        .expect("spatial types");
    let kinds: Vec<GeometryKind> = types.iter().map(|kind| kind.kind()).collect();
    assert_eq!(kinds, [GeometryKind::Point, GeometryKind::MultiPoint]);
    assert!(types.iter().all(|kind| !kind.has_z()));
}

#[rstest]
fn permanent_failures_are_not_retried(paged_client: StubClient) {
    paged_client.source().fail(RequestKind::Hits, 404, 1);
    let err = paged_client
        .get_count(AIRPORTS, &RequestOptions::new())
        .expect_err("count should fail");
    assert!(matches!(
        err,
        WfsError::Transport(TransportError::ServiceRequest { status: 404, .. })
    ));
    assert_eq!(paged_client.source().attempts(RequestKind::Hits), 1);
}

#[rstest]
#[case(503)]
#[case(NETWORK_FAILURE)]
fn transient_failures_are_retried(#[case] status: u16) {
    let options = RequestOptions::new().with_count(20);
    let baseline = client_with(455, 250)
        .get_data(AIRPORTS, &options)
        .expect("undisturbed fetch");
    let client = client_with(455, 250);
    client.source().fail(RequestKind::Features, status, 2);
    let retried = client.get_data(AIRPORTS, &options).expect("retried fetch");
    assert_eq!(retried, baseline);
    assert_eq!(client.source().attempts(RequestKind::Features), 3);
}

#[rstest]
fn invalid_endpoints_are_configuration_errors() {
    let service = StubWfsService::new(10);
    let err = WfsClient::with_parts(
        WfsConfig::new("not a url", DEFAULT_OWS_URL),
        service,
        MemoryCacheStore::new(),
    )
    .expect_err("invalid URL");
    assert!(matches!(err, WfsError::InvalidUrl { what: "WFS", .. }));
}

mod behaviour;
