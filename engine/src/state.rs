//! Store state: one slice per registered model.

use crate::{
    cache::{CacheEntry, RestFlags},
    error::Result,
    record::{ModelInstance, Record},
    schema::ModelDescriptor,
    tracker::Tracker,
    ModelName,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Slice of a singleton model: one record, tracked in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SingletonSlice {
    #[serde(flatten)]
    pub flags: RestFlags,
    #[serde(flatten)]
    pub tracker: Tracker,
    pub record: Record,
}

/// Slice of a collection model: a keyed cache of entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionSlice {
    #[serde(flatten)]
    pub flags: RestFlags,
    pub cache: Vec<CacheEntry>,
}

/// The state kept for one model.
///
/// Serialized without a tag: a collection slice has a `cache`, a singleton
/// slice has a `record`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Slice {
    Collection(CollectionSlice),
    Singleton(SingletonSlice),
}

impl Slice {
    /// The empty slice for a model.
    pub fn initial(descriptor: &ModelDescriptor) -> Self {
        if descriptor.is_singleton() {
            Slice::Singleton(SingletonSlice::default())
        } else {
            Slice::Collection(CollectionSlice::default())
        }
    }

    pub fn flags(&self) -> &RestFlags {
        match self {
            Slice::Collection(c) => &c.flags,
            Slice::Singleton(s) => &s.flags,
        }
    }

    pub fn as_collection(&self) -> Option<&CollectionSlice> {
        match self {
            Slice::Collection(c) => Some(c),
            Slice::Singleton(_) => None,
        }
    }

    pub fn as_singleton(&self) -> Option<&SingletonSlice> {
        match self {
            Slice::Singleton(s) => Some(s),
            Slice::Collection(_) => None,
        }
    }

    /// Rebuild record instances from the slice, carrying each entry's
    /// `_version`, `_request` and `errors`.
    pub fn hydrate(&self, descriptor: &Arc<ModelDescriptor>) -> Result<Vec<ModelInstance>> {
        match self {
            Slice::Singleton(s) => Ok(vec![ModelInstance::hydrate(
                Arc::clone(descriptor),
                &s.record,
                &s.tracker,
            )?]),
            Slice::Collection(c) => c
                .cache
                .iter()
                .map(|entry| {
                    ModelInstance::hydrate(Arc::clone(descriptor), &entry.record, &entry.tracker)
                })
                .collect(),
        }
    }
}

/// The whole store: model name to slice.
///
/// Slices are shared between successive states; cloning a state is
/// shallow and only the slice an action touches gets copied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreState {
    pub slices: BTreeMap<ModelName, Arc<Slice>>,
}

impl StoreState {
    /// Initial state for a set of models.
    pub fn initial<'a>(descriptors: impl IntoIterator<Item = &'a ModelDescriptor>) -> Self {
        let slices = descriptors
            .into_iter()
            .map(|d| (d.name.clone(), Arc::new(Slice::initial(d))))
            .collect();
        Self { slices }
    }

    pub fn get(&self, model: &str) -> Option<&Slice> {
        self.slices.get(model).map(Arc::as_ref)
    }

    /// Whether both states hold the very same slice for `model`.
    pub fn shares_slice(&self, other: &StoreState, model: &str) -> bool {
        match (self.slices.get(model), other.slices.get(model)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// The slice for `descriptor`, created from its initial shape if
    /// missing. A slice shared with another state is copied first.
    pub fn slice_mut(&mut self, descriptor: &ModelDescriptor) -> &mut Slice {
        let slice = self
            .slices
            .entry(descriptor.name.clone())
            .or_insert_with(|| Arc::new(Slice::initial(descriptor)));
        Arc::make_mut(slice)
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}
