/// Canonical lowercase, underscore-separated form of a name, used for table
/// and column names. Not injective: `OrderItem` and `order-item` collide.
pub fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    let mut pending_sep = false;

    for ch in name.chars() {
        if ch == '-' || ch.is_whitespace() {
            pending_sep = true;
            prev = Some(ch);
            continue;
        }
        if pending_sep {
            if !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
        } else if ch.is_uppercase() && prev.is_some_and(|p| p.is_lowercase()) {
            out.push('_');
        }
        out.extend(ch.to_lowercase());
        prev = Some(ch);
    }

    out
}

/// Removes wrapping double quotes, including the escaped `\"name\"` form used
/// for names that contain symbols.
pub fn strip_quotes(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(inner) = trimmed
        .strip_prefix("\\\"")
        .and_then(|s| s.strip_suffix("\\\""))
    {
        return inner.to_string();
    }
    if trimmed.len() >= 2 {
        if let Some(inner) = trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
            return inner.to_string();
        }
    }
    trimmed.to_string()
}
