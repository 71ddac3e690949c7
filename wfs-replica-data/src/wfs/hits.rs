use roxmltree::Document;

use super::ParseError;

/// Read `numberMatched` from a `resultType=hits` response.
pub fn parse_hits(xml: &str) -> Result<u64, ParseError> {
    let document = Document::parse(xml).map_err(|source| ParseError::Xml {
        document: "hits",
        source,
    })?;
    let raw = document
        .root_element()
        .attribute("numberMatched")
        .ok_or_else(|| ParseError::Missing {
            document: "hits",
            what: "the numberMatched attribute".to_owned(),
        })?;
    raw.trim().parse().map_err(|_| ParseError::Missing {
        document: "hits",
        what: format!("a numeric numberMatched (got {raw:?})"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0" numberMatched="455" numberReturned="0"/>"#, 455)]
    #[case(r#"<FeatureCollection numberMatched="0" numberReturned="0"></FeatureCollection>"#, 0)]
    fn reads_number_matched(#[case] xml: &str, #[case] expected: u64) {
        assert_eq!(parse_hits(xml).expect("parse hits"), expected);
    }

    #[rstest]
    #[case(r#"<FeatureCollection numberReturned="0"/>"#)]
    #[case(r#"<FeatureCollection numberMatched="unknown"/>"#)]
    fn rejects_missing_or_invalid_counts(#[case] xml: &str) {
        assert!(matches!(parse_hits(xml), Err(ParseError::Missing { .. })));
    }
}
