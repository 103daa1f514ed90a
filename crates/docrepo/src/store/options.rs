//! Find options and projections.

use query::{get_path, set_path, Document, Sort, ID_FIELD};

/// Options for a `find` call: ordering, paging window and projection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Option<Sort>,
    pub skip: u64,
    /// Maximum number of documents to return; `None` means no limit
    pub limit: Option<u64>,
    pub projection: Option<Projection>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sort specification.
    pub fn sort_by(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Sets the number of documents to skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn project(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub(crate) fn with_sort(mut self, sort: Option<&Sort>) -> Self {
        self.sort = sort.cloned();
        self
    }
}

/// The set of fields kept when a document is returned.
///
/// `_id` is kept unless [`Projection::exclude_id`] is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<String>,
    include_id: bool,
}

impl Projection {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            include_id: true,
        }
    }

    pub fn exclude_id(mut self) -> Self {
        self.include_id = false;
        self
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn includes_id(&self) -> bool {
        self.include_id
    }

    /// Copy the projected fields out of `doc`. Missing fields are skipped.
    pub fn apply(&self, doc: &Document) -> Document {
        let mut projected = Document::new();
        if self.include_id {
            if let Some(id) = doc.get(ID_FIELD) {
                projected.insert(ID_FIELD.to_string(), id.clone());
            }
        }
        for field in &self.fields {
            if let Some(value) = get_path(doc, field) {
                set_path(&mut projected, field, value.clone());
            }
        }
        projected
    }
}
