//! In-memory collection: filters, sorts and windows documents in process.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use common::{StoreError, StoreResult};
use domain::EntityId;
use query::{Document, Filter, ID_FIELD};

use super::server::{CollectionData, MemoryServer, SharedCollection};
use crate::store::{
    DeleteOutcome, DocumentCollection, FindOptions, ReplaceOutcome, UpdateOutcome, UpdateSpec,
};

pub struct MemoryCollection {
    server: Arc<MemoryServer>,
    name: String,
    data: SharedCollection,
}

impl MemoryCollection {
    pub(crate) fn new(server: Arc<MemoryServer>, name: &str, data: SharedCollection) -> Self {
        Self {
            server,
            name: name.to_string(),
            data,
        }
    }
}

fn matches(filter: &Filter, doc: &Document) -> StoreResult<bool> {
    if filter.is_match_all() {
        return Ok(true);
    }
    Ok(filter.evaluate(doc)?)
}

fn matching_indices(data: &CollectionData, filter: &Filter) -> StoreResult<Vec<usize>> {
    let mut indices = Vec::new();
    for (idx, doc) in data.documents.iter().enumerate() {
        if matches(filter, doc)? {
            indices.push(idx);
        }
    }
    Ok(indices)
}

/// Parse a stored `_id`; `None` when absent or null.
fn parse_id(value: Option<&Value>) -> StoreResult<Option<EntityId>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(hex)) => Ok(Some(EntityId::parse(hex)?)),
        Some(other) => Err(StoreError::InvalidId(format!(
            "'{}' must be a hex object id, got {}",
            ID_FIELD, other
        ))),
    }
}

/// Read or assign the document's `_id`, leaving it as a hex string.
///
/// The index is keyed by the parsed id, so hex case never matters.
fn ensure_id(doc: &mut Document) -> StoreResult<EntityId> {
    match parse_id(doc.get(ID_FIELD))? {
        Some(id) => Ok(id),
        None => {
            let id = EntityId::new();
            doc.insert(ID_FIELD.to_string(), Value::from(id));
            Ok(id)
        }
    }
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> StoreResult<Vec<Document>> {
        self.server.check_available()?;
        let data = self.data.read();

        let mut found = Vec::new();
        for doc in &data.documents {
            if matches(filter, doc)? {
                found.push(doc);
            }
        }

        if let Some(sort) = &options.sort {
            found.sort_by(|a, b| sort.compare(a, b));
        }

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(found
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| match &options.projection {
                Some(projection) => projection.apply(doc),
                None => doc.clone(),
            })
            .collect())
    }

    async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        self.server.check_available()?;
        let data = self.data.read();
        if filter.is_match_all() {
            return Ok(data.documents.len() as u64);
        }
        Ok(matching_indices(&data, filter)?.len() as u64)
    }

    async fn insert_one(&self, mut document: Document) -> StoreResult<EntityId> {
        self.server.check_available()?;
        let id = ensure_id(&mut document)?;

        let mut data = self.data.write();
        if !data.ids.insert(id) {
            return Err(StoreError::DuplicateId(id.to_hex()));
        }
        data.documents.push(document);
        Ok(id)
    }

    async fn insert_many(&self, mut documents: Vec<Document>) -> StoreResult<Vec<EntityId>> {
        self.server.check_available()?;
        let ids = documents
            .iter_mut()
            .map(ensure_id)
            .collect::<StoreResult<Vec<_>>>()?;

        let mut data = self.data.write();
        let mut batch = std::collections::HashSet::with_capacity(ids.len());
        for id in &ids {
            if data.ids.contains(id) || !batch.insert(*id) {
                return Err(StoreError::DuplicateId(id.to_hex()));
            }
        }

        data.ids.extend(batch);
        data.documents.extend(documents);
        Ok(ids)
    }

    async fn replace_one(
        &self,
        filter: &Filter,
        mut replacement: Document,
    ) -> StoreResult<ReplaceOutcome> {
        self.server.check_available()?;
        let mut data = self.data.write();

        let mut target = None;
        for (idx, doc) in data.documents.iter().enumerate() {
            if matches(filter, doc)? {
                target = Some(idx);
                break;
            }
        }
        let Some(idx) = target else {
            return Ok(ReplaceOutcome::default());
        };

        let existing_id = data.documents[idx].get(ID_FIELD).cloned().unwrap_or(Value::Null);
        let existing = parse_id(Some(&existing_id))?;
        match parse_id(replacement.get(ID_FIELD))? {
            None => {}
            Some(id) if Some(id) == existing => {}
            Some(id) => {
                return Err(StoreError::ImmutableId(format!(
                    "replacement carries {} but matched document has {}",
                    id, existing_id
                )))
            }
        }
        replacement.insert(ID_FIELD.to_string(), existing_id);

        let modified = data.documents[idx] != replacement;
        data.documents[idx] = replacement;
        Ok(ReplaceOutcome {
            matched_count: 1,
            modified_count: u64::from(modified),
        })
    }

    async fn update_many(&self, filter: &Filter, update: &UpdateSpec) -> StoreResult<UpdateOutcome> {
        self.server.check_available()?;
        update.validate()?;
        let mut data = self.data.write();

        // apply everything before committing anything
        let mut staged = Vec::new();
        let indices = matching_indices(&data, filter)?;
        for &idx in &indices {
            let mut doc = data.documents[idx].clone();
            if update.apply(&mut doc)? {
                staged.push((idx, doc));
            }
        }

        let outcome = UpdateOutcome {
            matched_count: indices.len() as u64,
            modified_count: staged.len() as u64,
        };
        for (idx, doc) in staged {
            data.documents[idx] = doc;
        }
        Ok(outcome)
    }

    async fn delete_many(&self, filter: &Filter) -> StoreResult<DeleteOutcome> {
        self.server.check_available()?;
        let mut data = self.data.write();

        let mut keep = Vec::with_capacity(data.documents.len());
        let mut freed = Vec::new();
        for doc in &data.documents {
            let hit = matches(filter, doc)?;
            if hit {
                freed.extend(parse_id(doc.get(ID_FIELD))?);
            }
            keep.push(!hit);
        }

        let CollectionData { documents, ids } = &mut *data;
        let before = documents.len();
        let mut flags = keep.into_iter();
        documents.retain(|_| flags.next().unwrap_or(true));
        for id in &freed {
            ids.remove(id);
        }

        Ok(DeleteOutcome {
            deleted_count: (before - documents.len()) as u64,
        })
    }
}
