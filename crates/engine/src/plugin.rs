//! Plugins and the builders they transform.

use std::fmt;
use std::sync::Arc;

use rivet_core::TypeName;

use crate::error::{BuilderError, PluginError};
use crate::pool::{TypeDescription, TypePool};

/// A transformation applied to every unit it matches.
///
/// One instance serves every unit of a run and may be called from several
/// workers at once.
pub trait Plugin: Send + Sync + fmt::Debug {
    /// Name used when reporting failures of this plugin.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Returns true if this plugin wants to transform `target`.
    fn matches(&self, target: &TypeDescription) -> bool;

    /// Transforms `target` through `builder`.
    fn apply(
        &self,
        builder: &mut UnitBuilder,
        target: &TypeDescription,
        pool: &TypePool<'_>,
    ) -> Result<(), PluginError>;

    /// Called once after the last unit of the run.
    fn close(&self) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Creates the plugin instance used for one run.
pub trait PluginFactory: Send + Sync {
    /// The plugin name as it was declared.
    fn declared_name(&self) -> &str;

    /// Creates a new plugin instance.
    fn make(&self) -> Result<Arc<dyn Plugin>, PluginError>;
}

/// A factory handing out an already created plugin.
#[derive(Debug, Clone)]
pub struct Simple {
    plugin: Arc<dyn Plugin>,
}

impl Simple {
    pub fn new(plugin: Arc<dyn Plugin>) -> Self {
        Self { plugin }
    }
}

impl PluginFactory for Simple {
    fn declared_name(&self) -> &str {
        self.plugin.name()
    }

    fn make(&self) -> Result<Arc<dyn Plugin>, PluginError> {
        Ok(Arc::clone(&self.plugin))
    }
}

/// Collects the rewritten class file of one unit.
#[derive(Debug)]
pub struct UnitBuilder {
    name: TypeName,
    bytes: Vec<u8>,
    locked_header: Option<[u8; 8]>,
    live_initializers: Vec<TypeName>,
    modified: bool,
}

impl UnitBuilder {
    /// Creates a builder starting from the unit's current bytes.
    pub fn new(name: TypeName, bytes: Vec<u8>) -> Self {
        Self {
            name,
            bytes,
            locked_header: None,
            live_initializers: Vec::new(),
            modified: false,
        }
    }

    /// Locks the class file header so plugins can only decorate the unit.
    pub fn decorating(mut self) -> Self {
        let mut header = [0; 8];
        let len = self.bytes.len().min(header.len());
        header[..len].copy_from_slice(&self.bytes[..len]);
        self.locked_header = Some(header);
        self
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    /// The class file as transformed so far.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns true if the builder refuses header changes.
    pub fn is_decorating(&self) -> bool {
        self.locked_header.is_some()
    }

    /// Replaces the class file.
    pub fn rewrite(&mut self, bytes: Vec<u8>) -> Result<(), BuilderError> {
        if let Some(header) = &self.locked_header
            && bytes.get(..header.len()) != Some(header.as_slice())
        {
            return Err(BuilderError::HeaderChanged(self.name.clone()));
        }
        self.bytes = bytes;
        self.modified = true;
        Ok(())
    }

    /// Appends bytes to the class file.
    pub fn append(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
        self.modified = true;
    }

    /// Records that the rewritten unit runs an initializer of `defining`
    /// when it is loaded.
    pub fn live_initializer(&mut self, defining: impl Into<TypeName>) {
        self.live_initializers.push(defining.into());
    }

    pub(crate) fn finish(self) -> (Vec<u8>, Vec<TypeName>) {
        (self.bytes, self.live_initializers)
    }

    /// Returns true once a plugin changed the class file.
    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_replaces_bytes() {
        let mut builder = UnitBuilder::new(TypeName::new("a.B"), vec![1, 2, 3]);
        assert!(!builder.is_modified());

        builder.rewrite(vec![4, 5]).unwrap();
        builder.append(&[6]);

        assert!(builder.is_modified());
        assert_eq!(builder.bytes(), &[4, 5, 6]);
    }

    #[test]
    fn test_decorating_builder_keeps_header() {
        let original = vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 61, 9];
        let mut builder = UnitBuilder::new(TypeName::new("a.B"), original.clone()).decorating();

        let mut same_header = original[..8].to_vec();
        same_header.extend_from_slice(&[1, 2, 3]);
        builder.rewrite(same_header).unwrap();

        let mut newer = original.clone();
        newer[7] = 65;
        assert!(matches!(
            builder.rewrite(newer),
            Err(BuilderError::HeaderChanged(name)) if name.as_str() == "a.B"
        ));
    }

    #[test]
    fn test_finish_reports_live_initializers() {
        let mut builder = UnitBuilder::new(TypeName::new("a.B"), Vec::new());
        builder.live_initializer("a.Init");

        let (_, live) = builder.finish();
        assert_eq!(live, vec![TypeName::new("a.Init")]);
    }
}
