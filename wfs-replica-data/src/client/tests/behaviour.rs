//! Behavioural coverage for request planning and retries.

use crate::cache::MemoryCacheStore;
use crate::client::{RequestOptions, WfsClient, WfsError};
use crate::test_support::{RequestKind, StubWfsService, stub_client, stub_service};
use crate::transport::TransportError;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::{cell::RefCell, fs, path::PathBuf};
use wfs_replica_core::test_support::{AIRPORTS, UTM_ZONES};
use wfs_replica_core::{FeatureCollection, PageDescriptor};

type StubClient = WfsClient<StubWfsService, MemoryCacheStore>;
type PlanResultCell = RefCell<Option<Result<Vec<PageDescriptor>, WfsError>>>;

#[derive(Debug, Default)]
struct ClientScenarioContext {
    client: RefCell<Option<StubClient>>,
    plan: PlanResultCell,
    count: RefCell<Option<Result<u64, WfsError>>>,
    fetched: RefCell<Option<Result<FeatureCollection, WfsError>>>,
}

impl ClientScenarioContext {
    fn install(&self, page_size: u64) {
        let service = match stub_service(455, page_size) {
            Ok(service) => service,
            Err(err) => panic!("stub fixtures should be valid: {err}"),
        };
        let client = match stub_client(service) {
            Ok(client) => client,
            Err(err) => panic!("stub client should build: {err}"),
        };
        *self.client.borrow_mut() = Some(client);
    }

    fn with_client<T>(&self, action: impl FnOnce(&StubClient) -> T) -> T {
        let borrowed = self.client.borrow();
        let client = borrowed
            .as_ref()
            .unwrap_or_else(|| panic!("a service must be configured first"));
        action(client)
    }

    fn plan(&self, dataset: &str, options: &RequestOptions) {
        let outcome = self.with_client(|client| client.define_requests(dataset, options));
        *self.plan.borrow_mut() = Some(outcome);
    }

    fn planned_counts(&self) -> Vec<u64> {
        let borrowed = self.plan.borrow();
        match borrowed.as_ref() {
            Some(Ok(pages)) => pages.iter().map(|page| page.count).collect(),
            Some(Err(err)) => panic!("planning should succeed: {err}"),
            None => panic!("requests must be planned first"),
        }
    }

    fn planned_sort_keys(&self) -> Vec<Option<String>> {
        let borrowed = self.plan.borrow();
        match borrowed.as_ref() {
            Some(Ok(pages)) => pages.iter().map(|page| page.sort_key.clone()).collect(),
            Some(Err(err)) => panic!("planning should succeed: {err}"),
            None => panic!("requests must be planned first"),
        }
    }
}

#[fixture]
fn client_context() -> ClientScenarioContext {
    ClientScenarioContext::default()
}

#[given("a service publishing 455 airports with a page size of 10000")]
fn service_with_large_pages(#[from(client_context)] ctx: &ClientScenarioContext) {
    ctx.install(10_000);
}

#[given("a service publishing 455 airports with a page size of 250")]
fn service_with_small_pages(#[from(client_context)] ctx: &ClientScenarioContext) {
    ctx.install(250);
}

#[given("hit count requests are rejected with status 404")]
fn hits_rejected(#[from(client_context)] ctx: &ClientScenarioContext) {
    ctx.with_client(|client| client.source().fail(RequestKind::Hits, 404, 1));
}

#[given("feature requests fail once with status 503")]
fn features_unavailable(#[from(client_context)] ctx: &ClientScenarioContext) {
    ctx.with_client(|client| client.source().fail(RequestKind::Features, 503, 1));
}

#[when("I plan requests for the UTM zones")]
fn plan_zones(#[from(client_context)] ctx: &ClientScenarioContext) {
    ctx.plan(UTM_ZONES, &RequestOptions::new());
}

#[when("I plan requests for the airports")]
fn plan_airports(#[from(client_context)] ctx: &ClientScenarioContext) {
    ctx.plan(AIRPORTS, &RequestOptions::new());
}

#[when("I plan requests for 10 airports by package label")]
fn plan_ten_airports(#[from(client_context)] ctx: &ClientScenarioContext) {
    ctx.plan("bc-airports", &RequestOptions::new().with_count(10));
}

#[when("I plan requests for an unknown package")]
fn plan_unknown(#[from(client_context)] ctx: &ClientScenarioContext) {
    ctx.plan("no-such-package", &RequestOptions::new());
}

#[when("I count the airports")]
fn count_airports(#[from(client_context)] ctx: &ClientScenarioContext) {
    let outcome = ctx.with_client(|client| client.get_count(AIRPORTS, &RequestOptions::new()));
    *ctx.count.borrow_mut() = Some(outcome);
}

#[when("I fetch the first 20 airports")]
fn fetch_twenty(#[from(client_context)] ctx: &ClientScenarioContext) {
    let options = RequestOptions::new().with_count(20);
    let outcome = ctx.with_client(|client| client.get_data(AIRPORTS, &options));
    *ctx.fetched.borrow_mut() = Some(outcome);
}

#[then("one page of 6 records is planned")]
fn one_page_of_six(#[from(client_context)] ctx: &ClientScenarioContext) {
    assert_eq!(ctx.planned_counts(), [6]);
}

#[then("one page of 10 records is planned")]
fn one_page_of_ten(#[from(client_context)] ctx: &ClientScenarioContext) {
    assert_eq!(ctx.planned_counts(), [10]);
}

#[then("two pages of 250 and 205 records are planned")]
fn two_pages(#[from(client_context)] ctx: &ClientScenarioContext) {
    assert_eq!(ctx.planned_counts(), [250, 205]);
}

#[then("no sort key is used")]
fn no_sort_key(#[from(client_context)] ctx: &ClientScenarioContext) {
    assert!(ctx.planned_sort_keys().iter().all(Option::is_none));
}

#[then("the pages are ordered by OBJECTID")]
fn ordered_by_objectid(#[from(client_context)] ctx: &ClientScenarioContext) {
    assert!(
        ctx.planned_sort_keys()
            .iter()
            .all(|key| key.as_deref() == Some("OBJECTID"))
    );
}

#[then("the dataset is reported as not found")]
fn dataset_not_found(#[from(client_context)] ctx: &ClientScenarioContext) {
    let borrowed = ctx.plan.borrow();
    match borrowed.as_ref() {
        Some(Err(WfsError::NotFound { .. })) => {}
        Some(Err(err)) => panic!("unexpected error variant: {err}"),
        Some(Ok(pages)) => panic!("expected a lookup failure, got {pages:?}"),
        None => panic!("requests must be planned first"),
    }
}

#[then("the count fails with a service request error")]
fn count_rejected(#[from(client_context)] ctx: &ClientScenarioContext) {
    let borrowed = ctx.count.borrow();
    match borrowed.as_ref() {
        Some(Err(WfsError::Transport(TransportError::ServiceRequest { status, .. }))) => {
            assert_eq!(*status, 404);
        }
        other => panic!("expected a service request error, got {other:?}"),
    }
}

#[then("the hit count was requested once")]
fn hits_requested_once(#[from(client_context)] ctx: &ClientScenarioContext) {
    ctx.with_client(|client| assert_eq!(client.source().attempts(RequestKind::Hits), 1));
}

#[then("the features match an undisturbed fetch")]
fn features_match(#[from(client_context)] ctx: &ClientScenarioContext) {
    let service = match stub_service(455, 250) {
        Ok(service) => service,
        Err(err) => panic!("stub fixtures should be valid: {err}"),
    };
    let baseline = match stub_client(service)
        .and_then(|client| client.get_data(AIRPORTS, &RequestOptions::new().with_count(20)))
    {
        Ok(collection) => collection,
        Err(err) => panic!("undisturbed fetch should succeed: {err}"),
    };
    let borrowed = ctx.fetched.borrow();
    match borrowed.as_ref() {
        Some(Ok(collection)) => assert_eq!(collection, &baseline),
        Some(Err(err)) => panic!("fetch should succeed after a retry: {err}"),
        None => panic!("features must be fetched first"),
    }
}

#[then("features were requested twice")]
fn features_requested_twice(#[from(client_context)] ctx: &ClientScenarioContext) {
    ctx.with_client(|client| assert_eq!(client.source().attempts(RequestKind::Features), 2));
}

fn scenario_titles(feature: &str) -> Vec<String> {
    let feature_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(feature);
    let contents = match fs::read_to_string(&feature_path) {
        Ok(data) => data,
        Err(err) => panic!("failed to read feature file {feature_path:?}: {err}"),
    };
    contents
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Scenario: "))
        .map(str::to_owned)
        .collect()
}

#[test]
fn scenario_indices_follow_feature_order() {
    assert_eq!(
        scenario_titles("tests/features/request_planning.feature"),
        [
            "a small table fits in one page",
            "a large table is split into ordered pages",
            "an explicit smaller count limits the plan",
            "an unknown dataset is reported",
        ]
    );
    assert_eq!(
        scenario_titles("tests/features/transport_retries.feature"),
        [
            "a rejected count request is not retried",
            "a temporarily unavailable service is retried",
        ]
    );
}

macro_rules! register_planning_scenario {
    ($name:ident, $index:literal) => {
        #[scenario(path = "tests/features/request_planning.feature", index = $index)]
        fn $name(#[from(client_context)] context: ClientScenarioContext) {
            let _ = context;
        }
    };
}

macro_rules! register_retry_scenario {
    ($name:ident, $index:literal) => {
        #[scenario(path = "tests/features/transport_retries.feature", index = $index)]
        fn $name(#[from(client_context)] context: ClientScenarioContext) {
            let _ = context;
        }
    };
}

register_planning_scenario!(a_small_table_fits_in_one_page, 0);
register_planning_scenario!(a_large_table_is_split_into_ordered_pages, 1);
register_planning_scenario!(an_explicit_smaller_count_limits_the_plan, 2);
register_planning_scenario!(an_unknown_dataset_is_reported, 3);
register_retry_scenario!(a_rejected_count_request_is_not_retried, 0);
register_retry_scenario!(a_temporarily_unavailable_service_is_retried, 1);
