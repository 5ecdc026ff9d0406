//! Versioned serializer registry with a bounded lookup cache.
//!
//! Which serializer decodes a column depends on the column's logical type
//! *and* the table's format version: old tables keep decoding the way they
//! were written. The version scheme itself (what "1.0" means, when a table
//! migrates) belongs to the catalog — this module only selects
//! implementations for a version it is given.
//!
//! Building a [`SerializerSet`] is cheap but happens per scan, and scans
//! arrive in bursts over the same handful of row shapes, so lookups are
//! memoized in [`SerializerCache`], a small intrusive LRU keyed by the
//! hashable (version, column-format sequence) tuple.

use std::sync::Arc;

use keel_encoding::FieldType;
use keel_result::{Error, Result};
use rustc_hash::FxHashMap;

use crate::serializer::{
    DecimalSerializer, DoubleSerializer, FieldSerializer, FloatSerializer, LegacyDecimalSerializer,
    ScalarSerializer, TextSerializer,
};

/// Known table format versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatVersion {
    V1,
    V2,
}

impl FormatVersion {
    pub const LATEST: FormatVersion = FormatVersion::V2;

    /// Parse a catalog version string.
    pub fn for_table(version: &str) -> Result<Self> {
        match version {
            "1.0" => Ok(FormatVersion::V1),
            "2.0" => Ok(FormatVersion::V2),
            other => Err(Error::InvalidArgumentError(format!(
                "unknown table format version {other:?}"
            ))),
        }
    }
}

/// Immutable description of the serializers for one row shape.
///
/// Safely shared across threads (parallel partition scans build their own
/// stateful instances from one shared set via [`SerializerSet::instantiate`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializerSet {
    version: FormatVersion,
    types: Arc<[FieldType]>,
}

impl SerializerSet {
    #[inline]
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    #[inline]
    pub fn types(&self) -> &[FieldType] {
        &self.types
    }

    /// Build fresh per-scan serializer instances, one per row slot.
    pub fn instantiate(&self) -> Vec<Box<dyn FieldSerializer>> {
        self.types
            .iter()
            .map(|ty| make_serializer(self.version, *ty))
            .collect()
    }
}

fn make_serializer(version: FormatVersion, ty: FieldType) -> Box<dyn FieldSerializer> {
    match ty {
        FieldType::I8 | FieldType::I16 | FieldType::I32 | FieldType::I64 | FieldType::Bool => {
            Box::new(ScalarSerializer::new(ty))
        }
        FieldType::F32 => Box::new(FloatSerializer),
        FieldType::F64 => Box::new(DoubleSerializer),
        FieldType::Text => Box::new(TextSerializer),
        FieldType::Decimal { scale } => match version {
            FormatVersion::V1 => Box::new(LegacyDecimalSerializer::new(scale)),
            FormatVersion::V2 => Box::new(DecimalSerializer::new(scale)),
        },
    }
}

/// Entry points mirroring how the execution engine asks for serializers.
pub struct VersionedSerializers;

impl VersionedSerializers {
    /// Serializers for a specific table version string.
    pub fn for_version(version: &str, types: &[FieldType]) -> Result<SerializerSet> {
        Ok(Self::for_format(FormatVersion::for_table(version)?, types))
    }

    /// Serializers for the latest format.
    pub fn latest(types: &[FieldType]) -> SerializerSet {
        Self::for_format(FormatVersion::LATEST, types)
    }

    pub fn for_format(version: FormatVersion, types: &[FieldType]) -> SerializerSet {
        SerializerSet {
            version,
            types: types.into(),
        }
    }
}

/* ------------------------------ LRU cache -------------------------------- */

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    version: FormatVersion,
    types: Vec<FieldType>,
}

struct CacheEntry {
    set: Arc<SerializerSet>,
    prev: Option<CacheKey>,
    next: Option<CacheKey>,
}

/// Bounded memoization of serializer-set lookups.
///
/// Intrusive LRU with O(1) get/insert/evict: a hash map of entries doubly
/// linked by key, head = most recent. One cache belongs to one engine
/// instance; it is not synchronized.
pub struct SerializerCache {
    map: FxHashMap<CacheKey, CacheEntry>,
    head: Option<CacheKey>,
    tail: Option<CacheKey>,
    cap: usize,
}

impl Default for SerializerCache {
    fn default() -> Self {
        Self::new(64)
    }
}

impl SerializerCache {
    pub fn new(cap: usize) -> Self {
        Self {
            map: FxHashMap::default(),
            head: None,
            tail: None,
            cap: cap.max(1),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Return the cached set without touching recency (for tests and
    /// introspection).
    pub fn peek(&self, version: FormatVersion, types: &[FieldType]) -> Option<Arc<SerializerSet>> {
        let key = CacheKey {
            version,
            types: types.to_vec(),
        };
        self.map.get(&key).map(|e| Arc::clone(&e.set))
    }

    /// Look up (or build and memoize) the serializer set for a row shape.
    pub fn get(&mut self, version: FormatVersion, types: &[FieldType]) -> Arc<SerializerSet> {
        let key = CacheKey {
            version,
            types: types.to_vec(),
        };
        if self.map.contains_key(&key) {
            self.move_to_head(&key);
            return Arc::clone(&self.map[&key].set);
        }

        let set = Arc::new(VersionedSerializers::for_format(version, types));
        let old_head = self.head.clone();
        self.map.insert(
            key.clone(),
            CacheEntry {
                set: Arc::clone(&set),
                prev: None,
                next: old_head.clone(),
            },
        );
        if let Some(h) = old_head {
            if let Some(e) = self.map.get_mut(&h) {
                e.prev = Some(key.clone());
            }
        }
        self.head = Some(key.clone());
        if self.tail.is_none() {
            self.tail = Some(key);
        }
        if self.map.len() > self.cap {
            self.evict_one();
        }
        set
    }

    fn move_to_head(&mut self, key: &CacheKey) {
        if self.head.as_ref() == Some(key) {
            return;
        }
        let (prev, next) = {
            let e = &self.map[key];
            (e.prev.clone(), e.next.clone())
        };
        if let Some(p) = prev.clone() {
            if let Some(pe) = self.map.get_mut(&p) {
                pe.next = next.clone();
            }
        }
        if let Some(n) = next.clone() {
            if let Some(ne) = self.map.get_mut(&n) {
                ne.prev = prev.clone();
            }
        }
        if self.tail.as_ref() == Some(key) {
            self.tail = prev;
        }
        let old_head = self.head.clone();
        if let Some(e) = self.map.get_mut(key) {
            e.prev = None;
            e.next = old_head.clone();
        }
        if let Some(h) = old_head {
            if let Some(he) = self.map.get_mut(&h) {
                he.prev = Some(key.clone());
            }
        }
        self.head = Some(key.clone());
        if self.tail.is_none() {
            self.tail = Some(key.clone());
        }
    }

    fn evict_one(&mut self) {
        let Some(tid) = self.tail.clone() else {
            return;
        };
        let (prev, _) = {
            let e = &self.map[&tid];
            (e.prev.clone(), e.next.clone())
        };
        if let Some(p) = prev.clone() {
            if let Some(pe) = self.map.get_mut(&p) {
                pe.next = None;
            }
        }
        self.tail = prev;
        if self.head.as_ref() == Some(&tid) {
            self.head = None;
        }
        self.map.remove(&tid);
    }
}
