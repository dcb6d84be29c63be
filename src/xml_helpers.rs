use xmltree::Element;

fn name_matches(raw_name: &str, target: &str) -> bool {
    if raw_name.eq_ignore_ascii_case(target) {
        return true;
    }

    raw_name
        .rsplit_once(':')
        .map(|(_, suffix)| suffix.eq_ignore_ascii_case(target))
        .unwrap_or(false)
}

/// Child elements with the given name (case-insensitive), in document order
pub(crate) fn children_ci<'a>(el: &'a Element, name: &'a str) -> impl Iterator<Item = &'a Element> {
    el.children
        .iter()
        .filter_map(|n| n.as_element())
        .filter(move |c| name_matches(&c.name, name))
}

/// Get child element by name (case-insensitive)
pub(crate) fn get_child_ci<'a>(el: &'a Element, name: &str) -> Option<&'a Element> {
    el.children
        .iter()
        .filter_map(|n| n.as_element())
        .find(|c| name_matches(&c.name, name))
}

/// Find element by name (case-insensitive), checking `el` itself first
pub(crate) fn find_descendant_ci<'a>(el: &'a Element, name: &str) -> Option<&'a Element> {
    if name_matches(&el.name, name) {
        return Some(el);
    }
    for child in el.children.iter().filter_map(|n| n.as_element()) {
        if let Some(found) = find_descendant_ci(child, name) {
            return Some(found);
        }
    }
    None
}

/// Attribute value by name (case-insensitive), trimmed; empty values count as absent
pub(crate) fn attr_ci<'a>(el: &'a Element, name: &str) -> Option<&'a str> {
    el.attributes
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Trimmed text content of an element
pub(crate) fn text(el: &Element) -> String {
    el.get_text()
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}
