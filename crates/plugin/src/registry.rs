//! Registry of known plugin and entry point types.
//!
//! Rust has no runtime class loading, so every type a build may declare is
//! registered up front together with its constructors. A registered type that
//! is not bundled with the tool only becomes visible once its class file is
//! found on the classpath the build declares for it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rivet_core::{BuildLogger, TypeName};
use rivet_engine::{EntryPoint, Plugin, PluginError};

/// Type of a constructor parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterType {
    /// A filesystem path, bound to the build's output root by default.
    Path,

    /// The build's logger.
    BuildLogger,

    String,
    Integer,
    Boolean,
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Path => "path",
            Self::BuildLogger => "build logger",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// A resolved constructor argument.
#[derive(Debug, Clone)]
pub enum ArgumentValue {
    Path(PathBuf),
    Logger(Arc<dyn BuildLogger>),
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl ArgumentValue {
    /// The parameter type this value satisfies.
    pub fn parameter_type(&self) -> ParameterType {
        match self {
            Self::Path(_) => ParameterType::Path,
            Self::Logger(_) => ParameterType::BuildLogger,
            Self::String(_) => ParameterType::String,
            Self::Integer(_) => ParameterType::Integer,
            Self::Boolean(_) => ParameterType::Boolean,
        }
    }
}

/// Arguments handed to a constructor, in parameter order.
#[derive(Debug, Clone, Default)]
pub struct Arguments(Vec<ArgumentValue>);

impl Arguments {
    pub fn new(values: Vec<ArgumentValue>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ArgumentValue> {
        self.0.get(index)
    }

    pub fn path(&self, index: usize) -> Result<&Path, PluginError> {
        match self.get(index) {
            Some(ArgumentValue::Path(path)) => Ok(path),
            other => Err(mismatch(index, ParameterType::Path, other)),
        }
    }

    pub fn logger(&self, index: usize) -> Result<Arc<dyn BuildLogger>, PluginError> {
        match self.get(index) {
            Some(ArgumentValue::Logger(logger)) => Ok(Arc::clone(logger)),
            other => Err(mismatch(index, ParameterType::BuildLogger, other)),
        }
    }

    pub fn string(&self, index: usize) -> Result<&str, PluginError> {
        match self.get(index) {
            Some(ArgumentValue::String(value)) => Ok(value),
            other => Err(mismatch(index, ParameterType::String, other)),
        }
    }

    pub fn integer(&self, index: usize) -> Result<i64, PluginError> {
        match self.get(index) {
            Some(ArgumentValue::Integer(value)) => Ok(*value),
            other => Err(mismatch(index, ParameterType::Integer, other)),
        }
    }

    pub fn boolean(&self, index: usize) -> Result<bool, PluginError> {
        match self.get(index) {
            Some(ArgumentValue::Boolean(value)) => Ok(*value),
            other => Err(mismatch(index, ParameterType::Boolean, other)),
        }
    }
}

fn mismatch(index: usize, expected: ParameterType, found: Option<&ArgumentValue>) -> PluginError {
    match found {
        Some(value) => format!(
            "Argument {} is a {}, expected a {}",
            index,
            value.parameter_type(),
            expected
        )
        .into(),
        None => format!("Missing argument {}", index).into(),
    }
}

/// Creates a plugin from resolved arguments.
pub type ConstructFn = dyn Fn(&Arguments) -> Result<Arc<dyn Plugin>, PluginError> + Send + Sync;

/// Creates an entry point.
pub type EntryPointFn = dyn Fn() -> Result<Arc<dyn EntryPoint>, PluginError> + Send + Sync;

/// One way of constructing a plugin.
#[derive(Clone)]
pub struct Constructor {
    parameters: Vec<ParameterType>,
    priority: i32,
    construct: Arc<ConstructFn>,
}

impl Constructor {
    /// Creates a constructor taking the given parameters.
    pub fn new<F>(parameters: Vec<ParameterType>, construct: F) -> Self
    where
        F: Fn(&Arguments) -> Result<Arc<dyn Plugin>, PluginError> + Send + Sync + 'static,
    {
        Self {
            parameters,
            priority: 0,
            construct: Arc::new(construct),
        }
    }

    /// Prefers this constructor over those of lower priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn parameters(&self) -> &[ParameterType] {
        &self.parameters
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Invokes the constructor.
    pub fn construct(&self, arguments: &Arguments) -> Result<Arc<dyn Plugin>, PluginError> {
        (self.construct)(arguments)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("parameters", &self.parameters)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// A plugin type known to the registry.
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    name: TypeName,
    bundled: bool,
    constructors: Vec<Constructor>,
}

impl PluginDescriptor {
    /// Describes a plugin type shipped on a plugin classpath.
    pub fn new(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            bundled: false,
            constructors: Vec::new(),
        }
    }

    /// Describes a plugin type shipped with the tool itself.
    pub fn bundled(name: impl Into<TypeName>) -> Self {
        Self {
            bundled: true,
            ..Self::new(name)
        }
    }

    /// Adds a constructor.
    pub fn with_constructor(mut self, constructor: Constructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    pub fn is_bundled(&self) -> bool {
        self.bundled
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }
}

/// An entry point type known to the registry.
#[derive(Clone)]
pub struct EntryPointDescriptor {
    name: TypeName,
    bundled: bool,
    construct: Arc<EntryPointFn>,
}

impl EntryPointDescriptor {
    /// Describes an entry point type with a zero-argument constructor.
    pub fn new<F>(name: impl Into<TypeName>, construct: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn EntryPoint>, PluginError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            bundled: false,
            construct: Arc::new(construct),
        }
    }

    /// Marks the entry point as shipped with the tool.
    pub fn as_bundled(mut self) -> Self {
        self.bundled = true;
        self
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    pub fn is_bundled(&self) -> bool {
        self.bundled
    }

    /// Invokes the constructor.
    pub fn construct(&self) -> Result<Arc<dyn EntryPoint>, PluginError> {
        (self.construct)()
    }
}

impl fmt::Debug for EntryPointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPointDescriptor")
            .field("name", &self.name)
            .field("bundled", &self.bundled)
            .finish_non_exhaustive()
    }
}

/// Every plugin and entry point type a build may declare.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<TypeName, PluginDescriptor>,
    entry_points: BTreeMap<TypeName, EntryPointDescriptor>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the plugins shipped with the tool.
    pub fn builtin() -> Self {
        crate::builtin::register(Self::new())
    }

    /// Registers a plugin type, replacing any previous one of the same name.
    pub fn register(&mut self, descriptor: PluginDescriptor) -> &mut Self {
        self.plugins.insert(descriptor.name.clone(), descriptor);
        self
    }

    /// Registers an entry point type.
    pub fn register_entry_point(&mut self, descriptor: EntryPointDescriptor) -> &mut Self {
        self.entry_points.insert(descriptor.name.clone(), descriptor);
        self
    }

    /// Adds a plugin type, builder style.
    pub fn with_plugin(mut self, descriptor: PluginDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// Adds an entry point type, builder style.
    pub fn with_entry_point(mut self, descriptor: EntryPointDescriptor) -> Self {
        self.register_entry_point(descriptor);
        self
    }

    pub fn plugin(&self, name: &TypeName) -> Option<&PluginDescriptor> {
        self.plugins.get(name)
    }

    pub fn entry_point(&self, name: &TypeName) -> Option<&EntryPointDescriptor> {
        self.entry_points.get(name)
    }

    /// Registered plugins in name order.
    pub fn plugins(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.plugins.values()
    }

    /// Registered entry points in name order.
    pub fn entry_points(&self) -> impl Iterator<Item = &EntryPointDescriptor> {
        self.entry_points.values()
    }
}
