use crate::error::{BookStoreError, Result};
use crate::schema::{RowId, TABLE_NAME};
use regex::Regex;

/// Authority used when no configuration overrides it.
pub const DEFAULT_AUTHORITY: &str = "content://com.example.android.books";

/// Content type of a locator addressing the whole collection.
pub const COLLECTION_CONTENT_TYPE: &str = "vnd.bookstore.dir/books";
/// Content type of a locator addressing a single book.
pub const ITEM_CONTENT_TYPE: &str = "vnd.bookstore.item/books";

/// What a locator addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Collection,
    Item(RowId),
    Unrecognized,
}

/// Classifies locators of the form `<authority>/books[/<id>]`.
///
/// Built once and handed to the provider; classification never mutates it.
#[derive(Debug, Clone)]
pub struct LocatorMatcher {
    authority: String,
    collection: String,
    pattern: Regex,
}

impl LocatorMatcher {
    pub fn new(authority: &str) -> Result<Self> {
        let authority = authority.trim_end_matches('/');
        if authority.is_empty() {
            return Err(BookStoreError::Config("authority must not be empty".into()));
        }
        let pattern = Regex::new(&format!(
            r"^{}/{}(?:/([0-9]+))?$",
            regex::escape(authority),
            regex::escape(TABLE_NAME)
        ))
        .map_err(|e| BookStoreError::Config(format!("Invalid authority '{authority}': {e}")))?;

        Ok(LocatorMatcher {
            authority: authority.to_string(),
            collection: format!("{authority}/{TABLE_NAME}"),
            pattern,
        })
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Resolve a locator to its scope. Total: every string maps to exactly one
    /// scope. An id that does not fit a row id is `Unrecognized`.
    pub fn classify(&self, locator: &str) -> Scope {
        let Some(caps) = self.pattern.captures(locator) else {
            return Scope::Unrecognized;
        };
        match caps.get(1) {
            None => Scope::Collection,
            Some(id) => id
                .as_str()
                .parse::<RowId>()
                .map(Scope::Item)
                .unwrap_or(Scope::Unrecognized),
        }
    }

    pub fn collection_locator(&self) -> &str {
        &self.collection
    }

    /// Locator of a single book: the collection locator with the id appended.
    pub fn item_locator(&self, id: RowId) -> String {
        format!("{}/{id}", self.collection)
    }

    pub fn content_type(&self, locator: &str) -> Result<&'static str> {
        match self.classify(locator) {
            Scope::Collection => Ok(COLLECTION_CONTENT_TYPE),
            Scope::Item(_) => Ok(ITEM_CONTENT_TYPE),
            Scope::Unrecognized => Err(BookStoreError::UnsupportedLocator {
                operation: "content_type",
                locator: locator.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BASE: &str = "content://com.example.android.books/books";

    fn matcher() -> LocatorMatcher {
        LocatorMatcher::new(DEFAULT_AUTHORITY).unwrap()
    }

    #[test]
    fn test_classify_collection_and_items() {
        let matcher = matcher();
        assert_eq!(matcher.classify(BASE), Scope::Collection);
        assert_eq!(matcher.classify(&format!("{BASE}/0")), Scope::Item(0));
        assert_eq!(matcher.classify(&format!("{BASE}/42")), Scope::Item(42));
        assert_eq!(matcher.classify(&format!("{BASE}/007")), Scope::Item(7));
    }

    #[test]
    fn test_classify_rejects_other_shapes() {
        let matcher = matcher();
        for locator in [
            "",
            "content://com.example.android.books",
            "content://com.example.android.books/unknown",
            "content://com.example.android.books/books/",
            "content://com.example.android.books/books/-1",
            "content://com.example.android.books/books/12a",
            "content://com.example.android.books/books/1/2",
            "content://com.example.android.books/booksx",
            "content://other.authority/books",
            "content://com.example.android.books/books/99999999999999999999",
        ] {
            assert_eq!(matcher.classify(locator), Scope::Unrecognized, "{locator}");
        }
    }

    #[test]
    fn test_classify_is_deterministic() {
        let matcher = matcher();
        let locator = format!("{BASE}/5");
        assert_eq!(matcher.classify(&locator), matcher.classify(&locator));
        assert_eq!(matcher.clone().classify(&locator), Scope::Item(5));
    }

    #[test]
    fn test_custom_authority_is_escaped() {
        let matcher = LocatorMatcher::new("content://shop.books/").unwrap();
        assert_eq!(matcher.collection_locator(), "content://shop.books/books");
        assert_eq!(matcher.classify("content://shop.books/books/3"), Scope::Item(3));
        // '.' must match literally
        assert_eq!(matcher.classify("content://shopxbooks/books"), Scope::Unrecognized);
    }

    #[test]
    fn test_empty_authority_rejected() {
        assert!(LocatorMatcher::new("").is_err());
    }

    #[test]
    fn test_item_locator_round_trips() {
        let matcher = matcher();
        let locator = matcher.item_locator(17);
        assert_eq!(locator, format!("{BASE}/17"));
        assert_eq!(matcher.classify(&locator), Scope::Item(17));
    }

    #[test]
    fn test_content_type() {
        let matcher = matcher();
        assert_eq!(matcher.content_type(BASE).unwrap(), COLLECTION_CONTENT_TYPE);
        assert_eq!(matcher.content_type(&format!("{BASE}/1")).unwrap(), ITEM_CONTENT_TYPE);
        let err = matcher.content_type("content://x/y").unwrap_err();
        assert!(matches!(err, BookStoreError::UnsupportedLocator { .. }));
    }
}
