//! Execution context passed to raster operations.
//!
//! [`OpContext`] gives an operation read access to its declared inputs,
//! write access to its declared outputs, and the geoprocessing
//! collaborator. Access to anything undeclared is an error, which keeps
//! the dependency information used by the scheduler honest.

use hra_core::{Geoprocessor, Layer, OpError, Raster, RasterKey, RasterStore};
use std::sync::Arc;

/// Execution context for one [`RasterOp::run`](crate::RasterOp::run) call.
///
/// Uses dynamic dispatch (`&dyn RasterStore`, `&dyn Geoprocessor`) so
/// the [`RasterOp`](crate::RasterOp) trait stays object-safe and tests can
/// run operations against an in-memory store.
pub struct OpContext<'a> {
    store: &'a dyn RasterStore,
    geo: &'a dyn Geoprocessor,
    reads: Vec<RasterKey>,
    writes: Vec<RasterKey>,
    written: Vec<RasterKey>,
}

impl<'a> OpContext<'a> {
    /// Construct a context for an operation declaring `reads`/`writes`.
    ///
    /// Typically called by the scheduler, not by operations directly.
    pub fn new(
        store: &'a dyn RasterStore,
        geo: &'a dyn Geoprocessor,
        reads: Vec<RasterKey>,
        writes: Vec<RasterKey>,
    ) -> Self {
        Self {
            store,
            geo,
            reads,
            writes,
            written: Vec::new(),
        }
    }

    /// Check `key` is a declared input.
    pub fn check_input(&self, key: &RasterKey) -> Result<(), OpError> {
        if self.reads.contains(key) {
            Ok(())
        } else {
            Err(OpError::Undeclared {
                key: key.clone(),
                access: "an input",
            })
        }
    }

    /// Check `key` is a declared output and mark it written.
    ///
    /// Operations that hand an output key to the geoprocessor call this
    /// before the collaborator writes it.
    pub fn claim_output(&mut self, key: &RasterKey) -> Result<(), OpError> {
        if !self.writes.contains(key) {
            return Err(OpError::Undeclared {
                key: key.clone(),
                access: "an output",
            });
        }
        self.written.push(key.clone());
        Ok(())
    }

    /// Read a declared float input.
    pub fn float(&self, key: &RasterKey) -> Result<Arc<Raster<f32>>, OpError> {
        self.check_input(key)?;
        Ok(self.store.float(key)?)
    }

    /// Read a declared byte input.
    pub fn byte(&self, key: &RasterKey) -> Result<Arc<Raster<u8>>, OpError> {
        self.check_input(key)?;
        Ok(self.store.byte(key)?)
    }

    /// Write a declared output.
    pub fn put(&mut self, key: &RasterKey, layer: impl Into<Layer>) -> Result<(), OpError> {
        self.claim_output(key)?;
        self.store.put(key.clone(), layer.into())?;
        Ok(())
    }

    /// The store, for collaborator calls.
    pub fn store(&self) -> &dyn RasterStore {
        self.store
    }

    /// The geoprocessing collaborator.
    pub fn geo(&self) -> &dyn Geoprocessor {
        self.geo
    }

    /// Outputs written so far.
    pub fn written(&self) -> &[RasterKey] {
        &self.written
    }

    /// Declared outputs not yet written.
    pub fn unwritten(&self) -> Vec<RasterKey> {
        self.writes
            .iter()
            .filter(|k| !self.written.contains(k))
            .cloned()
            .collect()
    }
}
