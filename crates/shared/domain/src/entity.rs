//! Persisted entity trait.

use serde::{de::DeserializeOwned, Serialize};

/// A record type stored as one document per instance.
///
/// Entities carry their identifier in an `_id` field, typically declared as:
///
/// ```
/// use domain::{Entity, EntityId};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Lead {
///     #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
///     id: Option<EntityId>,
///     company_id: String,
/// }
///
/// impl Entity for Lead {}
///
/// assert_eq!(Lead::collection_name(), "Lead");
/// ```
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection this entity lives in. Defaults to the bare type name.
    fn collection_name() -> String {
        default_collection_name::<Self>()
    }
}

/// Bare type name of `T`, without module path or generic arguments.
pub fn default_collection_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
        .to_string()
}
