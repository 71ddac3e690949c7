use std::collections::BTreeSet;
use std::num::NonZeroU64;

use log::debug;
use roxmltree::{Document, Node};
use wfs_replica_core::{CapabilitiesDocument, DEFAULT_PAGE_SIZE, TableIdentifier};

use super::ParseError;

/// Decode a `GetCapabilities` response.
///
/// Feature type names lose their namespace prefix (`pub:WHSE_A.B` becomes
/// `WHSE_A.B`). The page size comes from the `CountDefault` constraint and
/// falls back to [`DEFAULT_PAGE_SIZE`].
pub fn parse_capabilities(xml: &str) -> Result<CapabilitiesDocument, ParseError> {
    let document = Document::parse(xml).map_err(|source| ParseError::Xml {
        document: "GetCapabilities",
        source,
    })?;
    let tables: BTreeSet<TableIdentifier> = document
        .descendants()
        .filter(|node| node.has_tag_name("FeatureType"))
        .filter_map(|feature_type| child_text(feature_type, "Name"))
        .filter_map(|qualified| {
            let local = qualified
                .rsplit_once(':')
                .map_or(qualified, |(_, local)| local);
            TableIdentifier::parse(local)
                .inspect_err(|err| debug!("skipping feature type {qualified:?}: {err}"))
                .ok()
        })
        .collect();
    let page_size = document
        .descendants()
        .find(|node| node.has_tag_name("Constraint") && node.attribute("name") == Some("CountDefault"))
        .and_then(|constraint| {
            constraint
                .descendants()
                .find(|node| node.has_tag_name("DefaultValue"))
        })
        .and_then(|node| node.text())
        .and_then(|text| text.trim().parse::<u64>().ok())
        .and_then(NonZeroU64::new)
        .unwrap_or(DEFAULT_PAGE_SIZE);
    debug!(
        "capabilities list {} tables with page size {page_size}",
        tables.len()
    );
    Ok(CapabilitiesDocument { tables, page_size })
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.children()
        .find(|child| child.has_tag_name(name))
        .and_then(|child| child.text())
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const CAPABILITIES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:WFS_Capabilities version="2.0.0"
    xmlns:wfs="http://www.opengis.net/wfs/2.0"
    xmlns:ows="http://www.opengis.net/ows/1.1">
  <ows:OperationsMetadata>
    <ows:Operation name="GetFeature"/>
    <ows:Constraint name="ImplementsBasicWFS">
      <ows:NoValues/>
      <ows:DefaultValue>TRUE</ows:DefaultValue>
    </ows:Constraint>
    <ows:Constraint name="CountDefault">
      <ows:NoValues/>
      <ows:DefaultValue>10000</ows:DefaultValue>
    </ows:Constraint>
  </ows:OperationsMetadata>
  <wfs:FeatureTypeList>
    <wfs:FeatureType>
      <wfs:Name>pub:WHSE_IMAGERY_AND_BASE_MAPS.GSR_AIRPORTS_SVW</wfs:Name>
      <wfs:Title>Airports</wfs:Title>
    </wfs:FeatureType>
    <wfs:FeatureType>
      <wfs:Name>pub:WHSE_BASEMAPPING.UTMG_UTM_ZONES_SP</wfs:Name>
    </wfs:FeatureType>
    <wfs:FeatureType>
      <wfs:Name>pub:not_a_table</wfs:Name>
    </wfs:FeatureType>
  </wfs:FeatureTypeList>
</wfs:WFS_Capabilities>"#;

    #[rstest]
    fn strips_prefixes_and_reads_page_size() {
        let document = parse_capabilities(CAPABILITIES).expect("parse capabilities");
        let names: Vec<String> = document.tables.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            [
                "WHSE_BASEMAPPING.UTMG_UTM_ZONES_SP",
                "WHSE_IMAGERY_AND_BASE_MAPS.GSR_AIRPORTS_SVW"
            ]
        );
        assert_eq!(document.page_size.get(), 10_000);
    }

    #[rstest]
    fn defaults_page_size_when_absent() {
        let xml = r#"<WFS_Capabilities><FeatureTypeList/></WFS_Capabilities>"#;
        let document = parse_capabilities(xml).expect("parse capabilities");
        assert!(document.tables.is_empty());
        assert_eq!(document.page_size, DEFAULT_PAGE_SIZE);
    }

    #[rstest]
    fn rejects_malformed_xml() {
        assert!(matches!(
            parse_capabilities("<unclosed>"),
            Err(ParseError::Xml { .. })
        ));
    }
}
