use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::{CatalogError, Result};
use crate::models::PUB_ID_SCHEME;

/// One extracted publisher record, validated and ready for resolution.
///
/// The alias list always starts with the implicit `(PUB_ID, publisher_id)`
/// pair, followed by the explicitly listed aliases in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    pub publisher_id: String,
    pub title: String,
    pub description: Option<String>,
    pub aliases: Vec<AliasRef>,
}

/// A (scheme, value) pair as it appeared in the source. Missing attributes
/// stay `None`; there is no alias-level validation here.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasRef {
    pub scheme: Option<String>,
    pub value: Option<String>,
}

impl AliasRef {
    pub fn new(scheme: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            scheme: Some(scheme.into()),
            value: Some(value.into()),
        }
    }
}

// ─── Wire format ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct XmlBook {
    #[serde(rename = "@id")]
    id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    aliases: Option<XmlAliases>,
}

#[derive(Debug, Deserialize)]
struct XmlAliases {
    #[serde(rename = "alias", default)]
    aliases: Vec<XmlAlias>,
}

#[derive(Debug, Deserialize)]
struct XmlAlias {
    #[serde(rename = "@scheme")]
    scheme: Option<String>,
    #[serde(rename = "@value")]
    value: Option<String>,
}

/// Parse one book record out of an XML document.
///
/// Required: a non-blank `id` attribute on the root and a non-blank
/// `title` child. Surrounding whitespace is trimmed everywhere; an empty
/// trimmed description becomes `None`.
pub fn extract_record(xml: &str) -> Result<BookRecord> {
    let parsed: XmlBook =
        from_str(xml).map_err(|e| CatalogError::MalformedXml(e.to_string()))?;

    let publisher_id = parsed
        .id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(CatalogError::MissingField("id"))?
        .to_string();

    let title = parsed
        .title
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(CatalogError::MissingField("title"))?
        .to_string();

    let description = parsed
        .description
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let mut aliases = vec![AliasRef::new(PUB_ID_SCHEME, publisher_id.clone())];
    for alias in parsed.aliases.into_iter().flat_map(|a| a.aliases) {
        aliases.push(AliasRef {
            scheme: alias.scheme,
            value: alias.value,
        });
    }

    Ok(BookRecord {
        publisher_id,
        title,
        description,
        aliases,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK_XML: &str = r#"
        <book id="12345">
            <title>El Título</title>
            <description>This and that</description>
            <aliases>
                <alias scheme="ISBN-10" value="0158757819"/>
                <alias scheme="ISBN-13" value="0000000000123"/>
            </aliases>
        </book>
    "#;

    #[test]
    fn test_extracts_full_record() {
        let record = extract_record(BOOK_XML).unwrap();
        assert_eq!(record.publisher_id, "12345");
        assert_eq!(record.title, "El Título");
        assert_eq!(record.description.as_deref(), Some("This and that"));
        assert_eq!(
            record.aliases,
            vec![
                AliasRef::new("PUB_ID", "12345"),
                AliasRef::new("ISBN-10", "0158757819"),
                AliasRef::new("ISBN-13", "0000000000123"),
            ]
        );
    }

    #[test]
    fn test_pub_id_alias_comes_first() {
        let record = extract_record(
            r#"<book id="9"><title>T</title><aliases>
                <alias scheme="ISBN-10" value="0158757819"/>
            </aliases></book>"#,
        )
        .unwrap();
        assert_eq!(record.aliases[0], AliasRef::new("PUB_ID", "9"));
        assert_eq!(record.aliases.len(), 2);
    }

    #[test]
    fn test_missing_title_fails() {
        let err = extract_record(r#"<book id="1"><description>x</description></book>"#)
            .unwrap_err();
        assert!(matches!(err, CatalogError::MissingField("title")));
    }

    #[test]
    fn test_blank_title_fails() {
        let err =
            extract_record(r#"<book id="1"><title>   </title></book>"#).unwrap_err();
        assert!(matches!(err, CatalogError::MissingField("title")));
    }

    #[test]
    fn test_whitespace_publisher_id_fails() {
        let err =
            extract_record(r#"<book id=" "><title>This and that</title></book>"#)
                .unwrap_err();
        assert!(matches!(err, CatalogError::MissingField("id")));
    }

    #[test]
    fn test_missing_publisher_id_fails() {
        let err = extract_record(r#"<book><title>T</title></book>"#).unwrap_err();
        assert!(matches!(err, CatalogError::MissingField("id")));
    }

    #[test]
    fn test_missing_description_is_none() {
        let record =
            extract_record(r#"<book id="1"><title>T</title></book>"#).unwrap();
        assert_eq!(record.description, None);
        assert_eq!(record.aliases, vec![AliasRef::new("PUB_ID", "1")]);
    }

    #[test]
    fn test_trims_surrounding_whitespace() {
        let record = extract_record(
            "<book id=\" 42 \"><title>\n  The Title  \n</title></book>",
        )
        .unwrap();
        assert_eq!(record.publisher_id, "42");
        assert_eq!(record.title, "The Title");
    }

    #[test]
    fn test_malformed_alias_attrs_carried_as_none() {
        let record = extract_record(
            r#"<book id="1"><title>T</title><aliases>
                <alias scheme="ISBN-10"/>
                <alias value="999"/>
            </aliases></book>"#,
        )
        .unwrap();
        assert_eq!(record.aliases.len(), 3);
        assert_eq!(record.aliases[1].scheme.as_deref(), Some("ISBN-10"));
        assert_eq!(record.aliases[1].value, None);
        assert_eq!(record.aliases[2].scheme, None);
        assert_eq!(record.aliases[2].value.as_deref(), Some("999"));
    }

    #[test]
    fn test_unparseable_xml_fails() {
        let err = extract_record("<book id=\"1\"><title>oops").unwrap_err();
        assert!(matches!(err, CatalogError::MalformedXml(_)));
    }
}
