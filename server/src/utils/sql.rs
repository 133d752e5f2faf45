//! SQL utility functions

/// Escape SQL LIKE metacharacters (%, _, \) in user input
///
/// Pair with `ESCAPE '\'` in the query.
///
/// # Example
///
/// ```
/// use scrib_server::utils::sql::escape_like_pattern;
///
/// let pattern = format!("%{}%", escape_like_pattern("100% rust_async"));
/// assert_eq!(pattern, "%100\\% rust\\_async%");
/// ```
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
