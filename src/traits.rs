use crate::entry::Entry;

/// Determines whether an entry is a match.
///
/// Implement this to define custom matching logic: substring search,
/// extension filtering, regex, metadata filters, or anything else. Plain
/// closures over `&Entry` work too.
///
/// The same matcher sees directory entries and archive members alike; an
/// archive member's [`Entry::path`] is `<archive path>/<member path>`.
///
/// # Thread Safety
///
/// `Send + Sync` are required so a configured builder can be handed to
/// another thread before it runs.
///
/// # Example
///
/// ```rust
/// use pullfind::{Matcher, Entry};
///
/// struct ExtensionMatcher(String);
///
/// impl Matcher for ExtensionMatcher {
///     fn is_match(&self, entry: &Entry) -> bool {
///         entry.path
///             .extension()
///             .map(|e| e.eq_ignore_ascii_case(&self.0))
///             .unwrap_or(false)
///     }
/// }
/// ```
pub trait Matcher: Send + Sync {
    /// Returns `true` if this entry should be included in results.
    fn is_match(&self, entry: &Entry) -> bool;
}

impl<F> Matcher for F
where
    F: Fn(&Entry) -> bool + Send + Sync,
{
    fn is_match(&self, entry: &Entry) -> bool {
        self(entry)
    }
}
