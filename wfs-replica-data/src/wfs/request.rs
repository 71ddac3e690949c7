//! Query URLs for the service operations.

use url::Url;
use wfs_replica_core::{PageDescriptor, TableIdentifier};

const SERVICE: &str = "WFS";
const VERSION: &str = "2.0.0";

fn with_common(base: &Url, request: &str) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("service", SERVICE)
        .append_pair("version", VERSION)
        .append_pair("request", request);
    url
}

/// `GetCapabilities` against the OWS endpoint.
#[must_use]
pub fn capabilities_url(ows: &Url) -> Url {
    with_common(ows, "GetCapabilities")
}

/// JSON `DescribeFeatureType` for one table.
#[must_use]
pub fn describe_url(ows: &Url, table: &TableIdentifier) -> Url {
    let mut url = with_common(ows, "DescribeFeatureType");
    url.query_pairs_mut()
        .append_pair("typeNames", &table.wire_name())
        .append_pair("outputFormat", "application/json");
    url
}

/// Hit count for `table`, optionally narrowed by a CQL filter.
#[must_use]
pub fn hits_url(wfs: &Url, table: &TableIdentifier, filter: Option<&str>) -> Url {
    let mut url = with_common(wfs, "GetFeature");
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("typeNames", &table.wire_name())
            .append_pair("resultType", "hits");
        if let Some(filter) = filter {
            pairs.append_pair("CQL_FILTER", filter);
        }
    }
    url
}

/// One page of GeoJSON features.
#[must_use]
pub fn features_url(wfs: &Url, page: &PageDescriptor) -> Url {
    let mut url = with_common(wfs, "GetFeature");
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("typeName", &page.table.wire_name())
            .append_pair("outputFormat", "json")
            .append_pair("SRSNAME", &page.srs);
        if let Some(sort_key) = &page.sort_key {
            pairs.append_pair("sortBy", sort_key);
        }
        if let Some(filter) = &page.filter {
            pairs.append_pair("CQL_FILTER", filter);
        }
        pairs
            .append_pair("startIndex", &page.start_index.to_string())
            .append_pair("count", &page.count.to_string());
    }
    url
}
