//! Catalogue package lookup used to resolve dataset labels to table names.

use serde::Deserialize;
use url::Url;

use crate::wfs::ParseError;

#[derive(Debug, Deserialize)]
struct PackageShow {
    result: Package,
}

#[derive(Debug, Deserialize)]
struct Package {
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    #[serde(default)]
    format: String,
    #[serde(default)]
    url: String,
}

/// `package_show` request for a catalogue label. Package ids are lowercase.
pub fn package_show_url(catalogue: &Url, label: &str) -> Result<Url, url::ParseError> {
    let mut url = catalogue.join("package_show")?;
    url.query_pairs_mut()
        .append_pair("id", &label.trim().to_ascii_lowercase());
    Ok(url)
}

/// Layer names published by a package's `wms` resources, in resource order
/// and without duplicates.
///
/// The layer is the third path segment of each resource URL, as in
/// `/geo/pub/WHSE_BASEMAPPING.UTMG_UTM_ZONES_SP/ows`.
pub fn layer_names(json: &str) -> Result<Vec<String>, ParseError> {
    let response: PackageShow = serde_json::from_str(json).map_err(|source| ParseError::Json {
        document: "package_show",
        source,
    })?;
    let mut names: Vec<String> = Vec::new();
    for resource in response.result.resources {
        if !resource.format.eq_ignore_ascii_case("wms") {
            continue;
        }
        let Ok(url) = Url::parse(&resource.url) else {
            continue;
        };
        let Some(layer) = url.path_segments().and_then(|mut segments| segments.nth(2)) else {
            continue;
        };
        if !layer.is_empty() && !names.iter().any(|known| known == layer) {
            names.push(layer.to_owned());
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn builds_lowercase_package_query() {
        let base = Url::parse("https://catalogue.data.gov.bc.ca/api/3/action/").expect("valid url");
        let url = package_show_url(&base, " BC-Airports ").expect("join");
        assert_eq!(
            url.as_str(),
            "https://catalogue.data.gov.bc.ca/api/3/action/package_show?id=bc-airports"
        );
    }

    #[rstest]
    fn extracts_wms_layers_once() {
        let json = r#"{"success": true, "result": {"resources": [
            {"format": "wms", "url": "https://openmaps.gov.bc.ca/geo/pub/WHSE_IMAGERY_AND_BASE_MAPS.GSR_AIRPORTS_SVW/ows?service=WMS"},
            {"format": "csv", "url": "https://example.org/airports.csv"},
            {"format": "WMS", "url": "https://openmaps.gov.bc.ca/geo/pub/WHSE_IMAGERY_AND_BASE_MAPS.GSR_AIRPORTS_SVW/ows"},
            {"format": "wms", "url": "not a url"}
        ]}}"#;
        assert_eq!(
            layer_names(json).expect("parse package"),
            ["WHSE_IMAGERY_AND_BASE_MAPS.GSR_AIRPORTS_SVW"]
        );
    }

    #[rstest]
    fn missing_result_is_a_parse_error() {
        assert!(matches!(
            layer_names(r#"{"success": false}"#),
            Err(ParseError::Json { .. })
        ));
    }
}
