use thiserror::Error;

/// Errors raised while decoding service responses.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The body was not well-formed XML.
    #[error("failed to parse {document} XML")]
    Xml {
        /// Document being decoded.
        document: &'static str,
        /// Underlying parser error.
        #[source]
        source: roxmltree::Error,
    },
    /// The body was not the expected JSON shape.
    #[error("failed to parse {document} JSON")]
    Json {
        /// Document being decoded.
        document: &'static str,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },
    /// A feature page could not be decoded.
    #[error("failed to decode feature page")]
    FeaturePage {
        /// Underlying parser error.
        #[source]
        source: simd_json::Error,
    },
    /// A required element or attribute was absent or malformed.
    #[error("{document} response is missing {what}")]
    Missing {
        /// Document being decoded.
        document: &'static str,
        /// Description of the missing item.
        what: String,
    },
}
