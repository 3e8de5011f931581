//! Search result Bundle navigation

use serde_json::Value;

/// Returns the URL of the Bundle's `next` page.
///
/// `None` when the document is not a Bundle, has no `link` array, or has
/// zero or several `next` links. Several `next` links are ambiguous and
/// treated as the last page.
///
/// # Examples
///
/// ```
/// use fhirlink::domain::bundle::next_link;
/// use serde_json::json;
///
/// let bundle = json!({
///     "resourceType": "Bundle",
///     "link": [
///         {"relation": "self", "url": "https://host/Patient?page=1"},
///         {"relation": "next", "url": "https://host/Patient?page=2"}
///     ]
/// });
/// assert_eq!(next_link(&bundle), Some("https://host/Patient?page=2"));
/// ```
pub fn next_link(bundle: &Value) -> Option<&str> {
    if bundle.get("resourceType").and_then(Value::as_str) != Some("Bundle") {
        return None;
    }

    let mut next = bundle
        .get("link")?
        .as_array()?
        .iter()
        .filter(|link| link.get("relation").and_then(Value::as_str) == Some("next"))
        .filter_map(|link| link.get("url").and_then(Value::as_str));

    match (next.next(), next.next()) {
        (Some(url), None) => Some(url),
        _ => None,
    }
}

/// Entries of a Bundle in server order; empty for anything else
pub fn entries(bundle: &Value) -> &[Value] {
    bundle
        .get("entry")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bundle_with(links: Value) -> Value {
        json!({"resourceType": "Bundle", "type": "searchset", "link": links})
    }

    #[test]
    fn test_no_next_link() {
        let bundle = bundle_with(json!([{"relation": "self", "url": "https://host/a"}]));
        assert_eq!(next_link(&bundle), None);
    }

    #[test]
    fn test_single_next_link() {
        let bundle = bundle_with(json!([
            {"relation": "self", "url": "https://host/a"},
            {"relation": "next", "url": "https://host/b"}
        ]));
        assert_eq!(next_link(&bundle), Some("https://host/b"));
    }

    #[test]
    fn test_multiple_next_links_are_ambiguous() {
        let bundle = bundle_with(json!([
            {"relation": "next", "url": "https://host/b"},
            {"relation": "next", "url": "https://host/c"}
        ]));
        assert_eq!(next_link(&bundle), None);
    }

    #[test]
    fn test_not_a_bundle() {
        let resource = json!({
            "resourceType": "Patient",
            "link": [{"relation": "next", "url": "https://host/b"}]
        });
        assert_eq!(next_link(&resource), None);
    }

    #[test]
    fn test_missing_link_array() {
        assert_eq!(next_link(&json!({"resourceType": "Bundle"})), None);
    }

    #[test]
    fn test_entries() {
        let bundle = json!({"resourceType": "Bundle", "entry": [{"resource": {}}, {"resource": {}}]});
        assert_eq!(entries(&bundle).len(), 2);
        assert!(entries(&json!({})).is_empty());
    }
}
