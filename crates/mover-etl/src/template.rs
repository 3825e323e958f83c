//! `{attr}` template expansion against a row

use once_cell::sync::Lazy;
use regex::Regex;

use mover_core::Row;

static ATTR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(?P<attr>\w+)\}").expect("valid regex"));

/// Substitute every `{attr}` occurrence with the stringified row value.
///
/// Strings pass through verbatim, integers format decimal, other types use
/// their display form. A reference with no matching column substitutes the
/// empty string, tolerating schema drift between configuration and data.
pub(crate) fn expand(template: &str, row: &Row) -> String {
    ATTR_RE
        .replace_all(template, |caps: &regex::Captures| {
            row.get(&caps["attr"])
                .map(|value| value.to_string())
                .unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mover_core::Value;

    fn row() -> Row {
        Row::new(
            vec!["a".into(), "b".into(), "nul".into()],
            vec![
                Value::String("x".into()),
                Value::Int64(1),
                Value::Null,
            ],
        )
    }

    #[test]
    fn test_expand_mixes_strings_and_integers() {
        assert_eq!(expand("{a}-{b}", &row()), "x-1");
    }

    #[test]
    fn test_expand_missing_attr_substitutes_empty_string() {
        assert_eq!(expand("<{missing}>", &row()), "<>");
    }

    #[test]
    fn test_expand_null_substitutes_empty_string() {
        assert_eq!(expand("<{nul}>", &row()), "<>");
    }

    #[test]
    fn test_expand_without_placeholders_is_identity() {
        assert_eq!(expand("SELECT 1", &row()), "SELECT 1");
    }

    #[test]
    fn test_expand_repeated_attr() {
        assert_eq!(expand("{b},{b}", &row()), "1,1");
    }
}
