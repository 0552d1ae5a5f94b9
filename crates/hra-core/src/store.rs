//! Stored layers and the in-process [`MemoryStore`].

use crate::error::StoreError;
use crate::grid::GridSpec;
use crate::id::RasterKey;
use crate::raster::Raster;
use crate::traits::RasterStore;
use crate::vector::ZoneMeans;
use indexmap::IndexMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// One stored value. Layers are immutable once written and shared by `Arc`.
#[derive(Clone, Debug, PartialEq)]
pub enum Layer {
    /// A float raster (distances, scores, risk).
    Float(Arc<Raster<f32>>),
    /// A byte raster (presence, counts).
    Byte(Arc<Raster<u8>>),
    /// Per-zone mean scores.
    Stats(Arc<ZoneMeans>),
}

/// Discriminant of a [`Layer`], used in error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerKind {
    /// [`Layer::Float`].
    Float,
    /// [`Layer::Byte`].
    Byte,
    /// [`Layer::Stats`].
    Stats,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float => f.write_str("float raster"),
            Self::Byte => f.write_str("byte raster"),
            Self::Stats => f.write_str("zonal statistics"),
        }
    }
}

impl Layer {
    /// The layer's kind.
    pub fn kind(&self) -> LayerKind {
        match self {
            Self::Float(_) => LayerKind::Float,
            Self::Byte(_) => LayerKind::Byte,
            Self::Stats(_) => LayerKind::Stats,
        }
    }

    /// Grid of a raster layer; `None` for statistics.
    pub fn grid(&self) -> Option<&GridSpec> {
        match self {
            Self::Float(r) => Some(r.grid()),
            Self::Byte(r) => Some(r.grid()),
            Self::Stats(_) => None,
        }
    }
}

impl From<Raster<f32>> for Layer {
    fn from(r: Raster<f32>) -> Self {
        Self::Float(Arc::new(r))
    }
}

impl From<Raster<u8>> for Layer {
    fn from(r: Raster<u8>) -> Self {
        Self::Byte(Arc::new(r))
    }
}

impl From<ZoneMeans> for Layer {
    fn from(m: ZoneMeans) -> Self {
        Self::Stats(Arc::new(m))
    }
}

/// A [`RasterStore`] backed by an insertion-ordered map behind a lock.
///
/// Writes are rejected once a key exists, so every key is written at
/// most once until it is removed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    layers: RwLock<IndexMap<RasterKey, (Layer, Option<u64>)>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored layers.
    pub fn len(&self) -> usize {
        self.layers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RasterStore for MemoryStore {
    fn get(&self, key: &RasterKey) -> Option<Layer> {
        self.layers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|(layer, _)| layer.clone())
    }

    fn put(&self, key: RasterKey, layer: Layer) -> Result<(), StoreError> {
        let mut layers = self.layers.write().unwrap_or_else(PoisonError::into_inner);
        if layers.contains_key(&key) {
            return Err(StoreError::AlreadyWritten { key });
        }
        layers.insert(key, (layer, None));
        Ok(())
    }

    fn remove(&self, key: &RasterKey) -> Option<Layer> {
        self.layers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(key)
            .map(|(layer, _)| layer)
    }

    fn fingerprint(&self, key: &RasterKey) -> Option<u64> {
        self.layers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .and_then(|(_, fingerprint)| *fingerprint)
    }

    fn record_fingerprint(&self, key: &RasterKey, fingerprint: u64) {
        let mut layers = self.layers.write().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, slot)) = layers.get_mut(key) {
            *slot = Some(fingerprint);
        }
    }

    fn contains(&self, key: &RasterKey) -> bool {
        self.layers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    fn keys(&self) -> Vec<RasterKey> {
        self.layers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::FLOAT_NODATA;

    fn grid() -> GridSpec {
        GridSpec::new(2, 2, 1.0).unwrap()
    }

    #[test]
    fn second_write_is_rejected() {
        let store = MemoryStore::new();
        let key = RasterKey::from("a");
        store
            .put(key.clone(), Raster::<u8>::filled(grid(), 1, None).into())
            .unwrap();
        let err = store
            .put(key.clone(), Raster::<u8>::filled(grid(), 0, None).into())
            .unwrap_err();
        assert_eq!(err, StoreError::AlreadyWritten { key: key.clone() });
        assert_eq!(store.byte(&key).unwrap().data(), &[1, 1, 1, 1]);
    }

    #[test]
    fn typed_reads_check_kind() {
        let store = MemoryStore::new();
        store
            .put("f".into(), Raster::<f32>::nodata_filled(grid()).into())
            .unwrap();
        assert!(matches!(
            store.byte(&"f".into()),
            Err(StoreError::WrongKind {
                expected: LayerKind::Byte,
                actual: LayerKind::Float,
                ..
            })
        ));
        assert_eq!(store.float(&"f".into()).unwrap().data()[0], FLOAT_NODATA);
        assert!(matches!(
            store.float(&"missing".into()),
            Err(StoreError::Missing { .. })
        ));
    }

    #[test]
    fn keys_keep_insertion_order() {
        let store = MemoryStore::new();
        for k in ["c", "a", "b"] {
            store
                .put(k.into(), Raster::<u8>::filled(grid(), 0, None).into())
                .unwrap();
        }
        let keys: Vec<String> = store.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
        store.remove(&"a".into());
        let keys: Vec<String> = store.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["c", "b"]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn fingerprints_follow_their_layer() {
        let store = MemoryStore::new();
        let key = RasterKey::from("a");
        store.record_fingerprint(&key, 7);
        assert_eq!(store.fingerprint(&key), None);

        store
            .put(key.clone(), Raster::<u8>::filled(grid(), 1, None).into())
            .unwrap();
        assert_eq!(store.fingerprint(&key), None);
        store.record_fingerprint(&key, 7);
        assert_eq!(store.fingerprint(&key), Some(7));

        assert!(store.remove(&key).is_some());
        assert_eq!(store.fingerprint(&key), None);
        assert!(store.remove(&key).is_none());
        store
            .put(key.clone(), Raster::<u8>::filled(grid(), 0, None).into())
            .unwrap();
        assert_eq!(store.byte(&key).unwrap().data(), &[0, 0, 0, 0]);
    }
}
