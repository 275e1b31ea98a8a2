//! Default plural names for model collections

/// Plural form of a model name, used when the configuration gives none
///
/// ```
/// use jobtrack::core::pluralize::pluralize;
///
/// assert_eq!(pluralize("search"), "searches");
/// assert_eq!(pluralize("accessToken"), "accessTokens");
/// assert_eq!(pluralize("company"), "companies");
/// ```
pub fn pluralize(name: &str) -> String {
    let Some(last) = name.chars().last() else {
        return String::new();
    };
    let stem = &name[..name.len() - last.len_utf8()];

    match last {
        'y' if !stem.is_empty() && !stem.ends_with(['a', 'e', 'i', 'o', 'u']) => {
            format!("{}ies", stem)
        }
        's' | 'x' | 'z' => format!("{}es", name),
        'h' if stem.ends_with(['c', 's']) => format!("{}es", name),
        _ => format!("{}s", name),
    }
}
