//! Generic repository over one entity collection.
//!
//! Every operation comes in two flavours: an async method that accepts an
//! optional [`CancellationToken`], and a `*_blocking` twin that drives the
//! same future on the calling thread. Blocking twins must not be called from
//! inside an async task.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::executor::block_on;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use common::{StoreError, StoreResult};
use domain::{Entity, EntityId};
use query::{get_path, Document, Filter, Predicate, Sort};

use crate::client::ClientHandle;
use crate::page::Page;
use crate::store::{
    DeleteOutcome, DocumentCollection, FindOptions, Projection, ReplaceOutcome, UpdateOutcome,
    UpdateSpec,
};

/// Repository bound to one collection of `T`.
///
/// The collection is resolved from the client current at construction and
/// never re-resolved; build a new repository to pick up a replaced client.
pub struct Repository<T: Entity> {
    collection: Arc<dyn DocumentCollection>,
    name: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            collection: Arc::clone(&self.collection),
            name: self.name.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("collection", &self.name)
            .finish()
    }
}

impl<T: Entity> Repository<T> {
    /// Bind to `database` through `handle`.
    ///
    /// Fails with [`StoreError::Configuration`] when no client has been set.
    pub fn new(handle: &ClientHandle, database: &str) -> StoreResult<Self> {
        let client = handle.require()?;
        let collection = client.collection(database, &T::collection_name());
        debug!(
            database,
            collection = %collection.name(),
            client_id = %client.client_id(),
            "Repository bound"
        );
        Ok(Self::with_collection(collection))
    }

    /// Bind to `database` through the process-wide handle.
    pub fn connect(database: &str) -> StoreResult<Self> {
        Self::new(&ClientHandle::global(), database)
    }

    pub fn with_collection(collection: Arc<dyn DocumentCollection>) -> Self {
        let name = collection.name();
        Self {
            collection,
            name,
            _entity: PhantomData,
        }
    }

    pub fn collection_name(&self) -> &str {
        &self.name
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// First matching entity, or `None`. `sort` decides which one is first.
    pub async fn get(
        &self,
        filter: &Predicate<T>,
        sort: Option<&Sort>,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<Option<T>> {
        debug!(collection = %self.name, filter = %filter, "get");
        let options = FindOptions::new().with_sort(sort).limit(1);
        let docs = cancellable(cancel, self.collection.find(filter.filter(), &options)).await?;
        docs.into_iter().next().map(decode).transpose()
    }

    /// Every matching entity, in store order unless `sort` is given.
    pub async fn get_all(
        &self,
        filter: Option<&Predicate<T>>,
        sort: Option<&Sort>,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<Vec<T>> {
        let filter = filter_of(filter);
        debug!(collection = %self.name, filter = %filter, "get_all");
        let options = FindOptions::new().with_sort(sort);
        let docs = cancellable(cancel, self.collection.find(&filter, &options)).await?;
        docs.into_iter().map(decode).collect()
    }

    /// One page of matches. Skips `page * size` documents; the count and the
    /// slice are fetched concurrently.
    pub async fn get_page(
        &self,
        page: u64,
        size: u64,
        filter: Option<&Predicate<T>>,
        sort: Option<&Sort>,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<Page<T>> {
        let filter = filter_of(filter);
        debug!(collection = %self.name, filter = %filter, page, size, "get_page");
        let options = FindOptions::new()
            .with_sort(sort)
            .skip(page.saturating_mul(size))
            .limit(size);

        let (count, docs) = cancellable(cancel, async {
            tokio::try_join!(
                self.collection.count(&filter),
                self.collection.find(&filter, &options)
            )
        })
        .await?;

        let items = docs.into_iter().map(decode).collect::<StoreResult<Vec<T>>>()?;
        Ok(Page::new(items, page, size, count))
    }

    /// Project the first match into `R`.
    pub async fn select<R: DeserializeOwned>(
        &self,
        projection: &Projection,
        filter: Option<&Predicate<T>>,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<Option<R>> {
        let filter = filter_of(filter);
        debug!(collection = %self.name, filter = %filter, fields = ?projection.fields(), "select");
        let options = FindOptions::new().project(projection.clone()).limit(1);
        let docs = cancellable(cancel, self.collection.find(&filter, &options)).await?;
        docs.into_iter().next().map(decode).transpose()
    }

    /// Project every match into `R`.
    pub async fn select_all<R: DeserializeOwned>(
        &self,
        projection: &Projection,
        filter: Option<&Predicate<T>>,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<Vec<R>> {
        let filter = filter_of(filter);
        debug!(collection = %self.name, filter = %filter, fields = ?projection.fields(), "select_all");
        let options = FindOptions::new().project(projection.clone());
        let docs = cancellable(cancel, self.collection.find(&filter, &options)).await?;
        docs.into_iter().map(decode).collect()
    }

    pub async fn count(
        &self,
        filter: Option<&Predicate<T>>,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<u64> {
        let filter = filter_of(filter);
        debug!(collection = %self.name, filter = %filter, "count");
        cancellable(cancel, self.collection.count(&filter)).await
    }

    pub async fn any(
        &self,
        filter: &Predicate<T>,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<bool> {
        debug!(collection = %self.name, filter = %filter, "any");
        let options = FindOptions::new().project(Projection::new(Vec::<String>::new())).limit(1);
        let docs = cancellable(cancel, self.collection.find(filter.filter(), &options)).await?;
        Ok(!docs.is_empty())
    }

    /// Largest value of `field` across the whole collection.
    ///
    /// Documents where the field is missing or null are ignored.
    pub async fn max<V: DeserializeOwned>(
        &self,
        field: &str,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<Option<V>> {
        debug!(collection = %self.name, field, "max");
        self.extreme(Sort::descending(field), cancel).await
    }

    /// Smallest value of `field` across the whole collection.
    pub async fn min<V: DeserializeOwned>(
        &self,
        field: &str,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<Option<V>> {
        debug!(collection = %self.name, field, "min");
        self.extreme(Sort::ascending(field), cancel).await
    }

    async fn extreme<V: DeserializeOwned>(
        &self,
        sort: Sort,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<Option<V>> {
        let field = sort.field().to_string();
        let present = Filter::new(|it| it.field(&field).ne(Value::Null));
        let options = FindOptions::new()
            .project(Projection::new([field.as_str()]).exclude_id())
            .sort_by(sort)
            .limit(1);

        let docs = cancellable(cancel, self.collection.find(&present, &options)).await?;
        match docs.first().and_then(|doc| get_path(doc, &field)) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert one entity; returns the store-assigned id.
    pub async fn add(
        &self,
        entity: &T,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<EntityId> {
        debug!(collection = %self.name, "add");
        let doc = encode(entity)?;
        cancellable(cancel, self.collection.insert_one(doc)).await
    }

    /// Insert a batch. An empty batch is a no-op.
    pub async fn add_range(
        &self,
        entities: &[T],
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<Vec<EntityId>> {
        debug!(collection = %self.name, count = entities.len(), "add_range");
        if entities.is_empty() {
            return Ok(Vec::new());
        }
        let docs = entities.iter().map(encode).collect::<StoreResult<Vec<_>>>()?;
        cancellable(cancel, self.collection.insert_many(docs)).await
    }

    /// Replace at most one matching document with `entity`, keeping its `_id`.
    pub async fn update(
        &self,
        filter: &Predicate<T>,
        entity: &T,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<ReplaceOutcome> {
        debug!(collection = %self.name, filter = %filter, "update");
        let doc = encode(entity)?;
        cancellable(cancel, self.collection.replace_one(filter.filter(), doc)).await
    }

    /// Apply a partial update to every match.
    pub async fn execute_update(
        &self,
        filter: Option<&Predicate<T>>,
        update: &UpdateSpec,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<UpdateOutcome> {
        let filter = filter_of(filter);
        debug!(collection = %self.name, filter = %filter, ops = update.ops().len(), "execute_update");
        update.validate()?;
        cancellable(cancel, self.collection.update_many(&filter, update)).await
    }

    /// Delete every match.
    pub async fn execute_delete(
        &self,
        filter: &Predicate<T>,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<DeleteOutcome> {
        debug!(collection = %self.name, filter = %filter, "execute_delete");
        cancellable(cancel, self.collection.delete_many(filter.filter())).await
    }

    /// Delete every match, then insert `entity`.
    ///
    /// Two independent calls: readers may observe neither the old nor the
    /// new document in between, and a failed insert is not compensated.
    pub async fn refresh(
        &self,
        filter: &Predicate<T>,
        entity: &T,
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<EntityId> {
        let deleted = self.execute_delete(filter, cancel).await?;
        debug!(collection = %self.name, deleted = deleted.deleted_count, "refresh");
        self.add(entity, cancel).await
    }

    /// Delete every match, then insert `entities`. Same caveats as [`Self::refresh`].
    pub async fn refresh_all(
        &self,
        filter: &Predicate<T>,
        entities: &[T],
        cancel: Option<&CancellationToken>,
    ) -> StoreResult<Vec<EntityId>> {
        let deleted = self.execute_delete(filter, cancel).await?;
        debug!(collection = %self.name, deleted = deleted.deleted_count, "refresh_all");
        self.add_range(entities, cancel).await
    }

    // =========================================================================
    // Blocking twins
    // =========================================================================

    pub fn get_blocking(&self, filter: &Predicate<T>, sort: Option<&Sort>) -> StoreResult<Option<T>> {
        block_on(self.get(filter, sort, None))
    }

    pub fn get_all_blocking(
        &self,
        filter: Option<&Predicate<T>>,
        sort: Option<&Sort>,
    ) -> StoreResult<Vec<T>> {
        block_on(self.get_all(filter, sort, None))
    }

    pub fn get_page_blocking(
        &self,
        page: u64,
        size: u64,
        filter: Option<&Predicate<T>>,
        sort: Option<&Sort>,
    ) -> StoreResult<Page<T>> {
        block_on(self.get_page(page, size, filter, sort, None))
    }

    pub fn select_blocking<R: DeserializeOwned>(
        &self,
        projection: &Projection,
        filter: Option<&Predicate<T>>,
    ) -> StoreResult<Option<R>> {
        block_on(self.select(projection, filter, None))
    }

    pub fn select_all_blocking<R: DeserializeOwned>(
        &self,
        projection: &Projection,
        filter: Option<&Predicate<T>>,
    ) -> StoreResult<Vec<R>> {
        block_on(self.select_all(projection, filter, None))
    }

    pub fn count_blocking(&self, filter: Option<&Predicate<T>>) -> StoreResult<u64> {
        block_on(self.count(filter, None))
    }

    pub fn any_blocking(&self, filter: &Predicate<T>) -> StoreResult<bool> {
        block_on(self.any(filter, None))
    }

    pub fn max_blocking<V: DeserializeOwned>(&self, field: &str) -> StoreResult<Option<V>> {
        block_on(self.max(field, None))
    }

    pub fn min_blocking<V: DeserializeOwned>(&self, field: &str) -> StoreResult<Option<V>> {
        block_on(self.min(field, None))
    }

    pub fn add_blocking(&self, entity: &T) -> StoreResult<EntityId> {
        block_on(self.add(entity, None))
    }

    pub fn add_range_blocking(&self, entities: &[T]) -> StoreResult<Vec<EntityId>> {
        block_on(self.add_range(entities, None))
    }

    pub fn update_blocking(&self, filter: &Predicate<T>, entity: &T) -> StoreResult<ReplaceOutcome> {
        block_on(self.update(filter, entity, None))
    }

    pub fn execute_update_blocking(
        &self,
        filter: Option<&Predicate<T>>,
        update: &UpdateSpec,
    ) -> StoreResult<UpdateOutcome> {
        block_on(self.execute_update(filter, update, None))
    }

    pub fn execute_delete_blocking(&self, filter: &Predicate<T>) -> StoreResult<DeleteOutcome> {
        block_on(self.execute_delete(filter, None))
    }

    pub fn refresh_blocking(&self, filter: &Predicate<T>, entity: &T) -> StoreResult<EntityId> {
        block_on(self.refresh(filter, entity, None))
    }

    pub fn refresh_all_blocking(
        &self,
        filter: &Predicate<T>,
        entities: &[T],
    ) -> StoreResult<Vec<EntityId>> {
        block_on(self.refresh_all(filter, entities, None))
    }
}

/// Race `fut` against the caller's token. A fired token wins ties.
async fn cancellable<F, R>(cancel: Option<&CancellationToken>, fut: F) -> StoreResult<R>
where
    F: Future<Output = StoreResult<R>>,
{
    match cancel {
        None => fut.await,
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(StoreError::Cancelled),
            result = fut => result,
        },
    }
}

fn filter_of<T>(predicate: Option<&Predicate<T>>) -> Filter {
    predicate
        .map(|p| p.filter().clone())
        .unwrap_or_else(Filter::all)
}

fn encode<T: Entity>(entity: &T) -> StoreResult<Document> {
    match serde_json::to_value(entity)? {
        Value::Object(doc) => Ok(doc),
        other => Err(StoreError::Serialization(format!(
            "entity must serialize to a document, got {}",
            other
        ))),
    }
}

fn decode<R: DeserializeOwned>(doc: Document) -> StoreResult<R> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}
