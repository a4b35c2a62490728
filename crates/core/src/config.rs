//! Build configuration: what to transform and how.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classpath::ClasspathSet;
use crate::error::{Result, RivetError};
use crate::type_name::TypeName;

/// Default build file name.
pub const BUILD_FILE_NAME: &str = "rivet.json";

/// Name of the entry point used when none is declared.
pub const DEFAULT_ENTRY_POINT: &str = "REBASE";

/// The resolved input of one transformation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Directory holding the compiled units, rewritten in place.
    pub root: PathBuf,

    /// Build classpath, in lookup order.
    #[serde(default)]
    pub classpath: ClasspathSet,

    /// Declared target Java version; the running platform is used if absent.
    #[serde(default)]
    pub target_version: Option<String>,

    /// Declared plugins, applied in this order.
    #[serde(default)]
    pub transformations: Vec<TransformationSpec>,

    /// Strategy preparing each unit before plugins run.
    #[serde(default)]
    pub entry_point: EntryPointSpec,

    /// Worker threads; zero transforms on the calling thread.
    #[serde(default)]
    pub threads: usize,

    /// Resolve type hierarchies eagerly instead of on demand.
    #[serde(default)]
    pub extended_parsing: bool,

    /// Fail a unit when a plugin registers a live initializer on it.
    #[serde(default = "default_true")]
    pub fail_on_live_initializer: bool,

    /// Stop submitting units after the first failure.
    #[serde(default)]
    pub fail_fast: bool,

    /// Warn when a run transforms nothing.
    #[serde(default = "default_true")]
    pub warn_on_empty_type_set: bool,
}

fn default_true() -> bool {
    true
}

/// A declared plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationSpec {
    /// Plugin name exactly as the user declared it.
    pub plugin: String,

    /// Classpath to find the plugin on; root plus build classpath if absent.
    #[serde(default)]
    pub classpath: Option<ClasspathSet>,

    /// Constructor arguments bound by parameter index.
    #[serde(default)]
    pub arguments: Vec<PluginArgument>,
}

/// A constructor argument bound by index, converted to the parameter's type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginArgument {
    /// Zero-based constructor parameter index.
    pub index: usize,

    /// Textual value.
    pub value: String,
}

/// The declared entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPointSpec {
    /// A built-in strategy name or a registered entry point type.
    #[serde(default = "default_entry_point")]
    pub name: String,

    /// Classpath to find a custom entry point on.
    #[serde(default)]
    pub classpath: Option<ClasspathSet>,
}

fn default_entry_point() -> String {
    DEFAULT_ENTRY_POINT.to_string()
}

impl BuildConfig {
    /// Creates a configuration with defaults for the given root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            classpath: ClasspathSet::default(),
            target_version: None,
            transformations: Vec::new(),
            entry_point: EntryPointSpec::default(),
            threads: 0,
            extended_parsing: false,
            fail_on_live_initializer: true,
            fail_fast: false,
            warn_on_empty_type_set: true,
        }
    }

    /// Loads a configuration from a JSON build file.
    ///
    /// Relative paths are resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| RivetError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self =
            serde_json::from_str(&content).map_err(|source| RivetError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.relative_to(base))
    }

    /// Parses a configuration from a JSON string.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Resolves every relative path against `base`.
    pub fn relative_to(mut self, base: &Path) -> Self {
        if self.root.is_relative() {
            self.root = base.join(&self.root);
        }
        self.classpath = self.classpath.relative_to(base);
        for transformation in &mut self.transformations {
            transformation.classpath = transformation
                .classpath
                .take()
                .map(|classpath| classpath.relative_to(base));
        }
        self.entry_point.classpath = self
            .entry_point
            .classpath
            .take()
            .map(|classpath| classpath.relative_to(base));
        self
    }

    /// Sets the build classpath.
    pub fn with_classpath(mut self, classpath: ClasspathSet) -> Self {
        self.classpath = classpath;
        self
    }

    /// Sets the target version.
    pub fn with_target_version(mut self, version: impl Into<String>) -> Self {
        self.target_version = Some(version.into());
        self
    }

    /// Appends a transformation.
    pub fn with_transformation(mut self, transformation: TransformationSpec) -> Self {
        self.transformations.push(transformation);
        self
    }

    /// Sets the entry point.
    pub fn with_entry_point(mut self, entry_point: EntryPointSpec) -> Self {
        self.entry_point = entry_point;
        self
    }

    /// Sets the worker thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Enables or disables extended parsing.
    pub fn with_extended_parsing(mut self, enabled: bool) -> Self {
        self.extended_parsing = enabled;
        self
    }

    /// Enables or disables failing on live initializers.
    pub fn with_fail_on_live_initializer(mut self, enabled: bool) -> Self {
        self.fail_on_live_initializer = enabled;
        self
    }

    /// Enables or disables fail fast mode.
    pub fn with_fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    /// Enables or disables the warning for runs that transform nothing.
    pub fn with_warn_on_empty_type_set(mut self, enabled: bool) -> Self {
        self.warn_on_empty_type_set = enabled;
        self
    }
}

impl TransformationSpec {
    /// Creates a transformation for the given plugin name.
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            classpath: None,
            arguments: Vec::new(),
        }
    }

    /// Sets the plugin classpath.
    pub fn with_classpath(mut self, classpath: ClasspathSet) -> Self {
        self.classpath = Some(classpath);
        self
    }

    /// Binds a constructor argument by index.
    pub fn with_argument(mut self, index: usize, value: impl Into<String>) -> Self {
        self.arguments.push(PluginArgument {
            index,
            value: value.into(),
        });
        self
    }

    /// The plugin name as declared, for messages.
    pub fn raw_plugin(&self) -> &str {
        &self.plugin
    }

    /// The plugin name used for lookup.
    pub fn plugin_name(&self) -> TypeName {
        TypeName::new(&self.plugin)
    }

    /// The classpath the plugin is resolved from.
    pub fn classpath_set(&self, root: &Path, build_classpath: &ClasspathSet) -> ClasspathSet {
        resolve_classpath(self.classpath.as_ref(), root, build_classpath)
    }
}

impl EntryPointSpec {
    /// Creates an entry point spec for the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classpath: None,
        }
    }

    /// Sets the entry point classpath.
    pub fn with_classpath(mut self, classpath: ClasspathSet) -> Self {
        self.classpath = Some(classpath);
        self
    }

    /// The classpath a custom entry point is resolved from.
    pub fn classpath_set(&self, root: &Path, build_classpath: &ClasspathSet) -> ClasspathSet {
        resolve_classpath(self.classpath.as_ref(), root, build_classpath)
    }
}

impl Default for EntryPointSpec {
    fn default() -> Self {
        Self::new(DEFAULT_ENTRY_POINT)
    }
}

fn resolve_classpath(
    declared: Option<&ClasspathSet>,
    root: &Path,
    build_classpath: &ClasspathSet,
) -> ClasspathSet {
    match declared {
        Some(classpath) => classpath.clone(),
        None => ClasspathSet::prefixed(root, build_classpath),
    }
}
