use crate::config::ProviderConfig;
use crate::error::{BookStoreError, Result};
use crate::locator::{LocatorMatcher, Scope};
use crate::notify::{ChangeNotifier, Subscription};
use crate::schema::{Field, RowId, TABLE_NAME};
use crate::storage::{Filter, Query, RowSequence, SqliteStorage, Storage};
use crate::validation::{validate_for_insert, validate_for_update, UpdatePlan};
use crate::values::AttributeSet;
use std::path::Path;

/// Below this observed quantity a sale is refused.
const MIN_QUANTITY_FOR_SALE: i64 = 2;

/// The data-access entry point: resolves locators, validates attribute sets,
/// runs the storage operation and signals changes to observers.
pub struct BookProvider<S: Storage> {
    matcher: LocatorMatcher,
    storage: S,
    notifier: ChangeNotifier,
}

impl BookProvider<SqliteStorage> {
    /// Open the database configured for `data_dir`.
    pub fn open(data_dir: &Path, config: &ProviderConfig) -> Result<Self> {
        let matcher = LocatorMatcher::new(&config.authority)?;
        let path = config.database_path(data_dir);
        log::info!("Opening book store at {}", path.display());
        let storage = SqliteStorage::open(&path)?;
        Ok(BookProvider::new(matcher, storage))
    }
}

impl<S: Storage> BookProvider<S> {
    pub fn new(matcher: LocatorMatcher, storage: S) -> Self {
        BookProvider {
            matcher,
            storage,
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn matcher(&self) -> &LocatorMatcher {
        &self.matcher
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Read rows. An item locator always reads by id, whatever filter the
    /// query carries. The returned sequence carries a subscription to changes
    /// under `locator`.
    pub fn read(&self, locator: &str, query: &Query) -> Result<RowSequence> {
        let filter = self.scoped_filter("read", locator, &query.filter)?;
        let query = Query {
            filter,
            ..query.clone()
        };
        log::debug!("read {locator}");

        let mut rows = self.storage.query(TABLE_NAME, &query)?;
        rows.attach_subscription(self.notifier.subscribe(locator));
        Ok(rows)
    }

    /// Insert a book into the collection and return its new row id.
    pub fn create(&self, locator: &str, attrs: &AttributeSet) -> Result<RowId> {
        if self.matcher.classify(locator) != Scope::Collection {
            return Err(unsupported("create", locator));
        }
        validate_for_insert(attrs)?;

        let id = self
            .storage
            .insert(TABLE_NAME, &attrs.normalized())?
            .ok_or_else(|| {
                log::error!("Failed to insert row for {locator}");
                BookStoreError::InsertFailed {
                    locator: locator.to_string(),
                }
            })?;

        log::debug!("created {}", self.matcher.item_locator(id));
        self.notifier.notify_change(self.matcher.collection_locator());
        Ok(id)
    }

    /// Write the fields present in `attrs` to every row in scope. Returns the
    /// number of rows affected. An empty `attrs` is a no-op returning 0.
    pub fn update(&self, locator: &str, attrs: &AttributeSet, filter: &Filter) -> Result<usize> {
        let filter = self.scoped_filter("update", locator, filter)?;
        if validate_for_update(attrs)? == UpdatePlan::NoOp {
            log::debug!("update {locator}: nothing to write");
            return Ok(0);
        }

        let count = self.storage.update(TABLE_NAME, &attrs.normalized(), &filter)?;
        log::debug!("update {locator}: {count} row(s)");
        self.notifier.notify_change(locator);
        Ok(count)
    }

    pub fn delete(&self, locator: &str, filter: &Filter) -> Result<usize> {
        let filter = self.scoped_filter("delete", locator, filter)?;
        let count = self.storage.delete(TABLE_NAME, &filter)?;
        log::debug!("delete {locator}: {count} row(s)");
        self.notifier.notify_change(locator);
        Ok(count)
    }

    /// Sell one copy of a book whose quantity was last seen as
    /// `current_quantity`. Refused (returns 0, nothing written) while fewer
    /// than two copies are in stock.
    pub fn decrement_quantity(&self, id: RowId, current_quantity: i64) -> Result<usize> {
        if current_quantity < MIN_QUANTITY_FOR_SALE {
            log::debug!("sale of book {id} refused at quantity {current_quantity}");
            return Ok(0);
        }
        let attrs = AttributeSet::new().with(Field::Quantity, current_quantity - 1);
        self.update(&self.matcher.item_locator(id), &attrs, &Filter::all())
    }

    pub fn content_type(&self, locator: &str) -> Result<&'static str> {
        self.matcher.content_type(locator)
    }

    /// Register an observer for `locator` without reading.
    pub fn subscribe(&self, locator: &str) -> Subscription {
        self.notifier.subscribe(locator)
    }

    /// Number of subscriptions still held by callers.
    pub fn observer_count(&self) -> usize {
        self.notifier.observer_count()
    }

    /// Resolve the filter for a collection or item locator.
    fn scoped_filter(&self, operation: &'static str, locator: &str, filter: &Filter) -> Result<Filter> {
        match self.matcher.classify(locator) {
            Scope::Collection => Ok(filter.clone()),
            Scope::Item(id) => Ok(Filter::by_id(id)),
            Scope::Unrecognized => Err(unsupported(operation, locator)),
        }
    }
}

fn unsupported(operation: &'static str, locator: &str) -> BookStoreError {
    BookStoreError::UnsupportedLocator {
        operation,
        locator: locator.to_string(),
    }
}
