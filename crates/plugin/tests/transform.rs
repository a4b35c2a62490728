//! End-to-end transformation runs over temporary build folders.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rivet_classfile::{ClassHeader, write_class};
use rivet_core::{
    BuildConfig, ClasspathSet, CodeVersion, EntryPointSpec, ReleaseError, TransformationSpec,
    TypeName,
};
use rivet_engine::locator::{Compound, FileSystem, Opener};
use rivet_engine::{ClassFileLocator, Plugin, PluginError, TypeDescription, TypePool, UnitBuilder};
use rivet_plugin::{
    BuildError, Constructor, NO_OP, ParameterType, PluginDescriptor, PluginRegistry,
    ResolutionError, TransformAction,
};
use tempfile::tempdir;

const REWRITE: &str = "com.example.Rewrite";
const EXPLODE: &str = "com.example.Explode";
const RESTAMP: &str = "com.example.Restamp";
const PANIC: &str = "com.example.Panic";
const UNLICENSED: &str = "com.example.Unlicensed";

/// Appends a marker to every unit.
#[derive(Debug)]
struct Rewrite;

impl Plugin for Rewrite {
    fn name(&self) -> &str {
        REWRITE
    }

    fn matches(&self, _target: &TypeDescription) -> bool {
        true
    }

    fn apply(
        &self,
        builder: &mut UnitBuilder,
        _target: &TypeDescription,
        _pool: &TypePool<'_>,
    ) -> Result<(), PluginError> {
        builder.append(b"REWRITTEN");
        Ok(())
    }
}

/// Fails on units whose simple name starts with `Bad`.
#[derive(Debug)]
struct Explode;

impl Plugin for Explode {
    fn name(&self) -> &str {
        EXPLODE
    }

    fn matches(&self, target: &TypeDescription) -> bool {
        target.name().simple_name().starts_with("Bad")
    }

    fn apply(
        &self,
        _builder: &mut UnitBuilder,
        target: &TypeDescription,
        _pool: &TypePool<'_>,
    ) -> Result<(), PluginError> {
        Err(format!("refusing {}", target.name()).into())
    }
}

/// Rewrites every unit to an older class file version.
#[derive(Debug)]
struct Restamp;

impl Plugin for Restamp {
    fn name(&self) -> &str {
        RESTAMP
    }

    fn matches(&self, _target: &TypeDescription) -> bool {
        true
    }

    fn apply(
        &self,
        builder: &mut UnitBuilder,
        target: &TypeDescription,
        _pool: &TypePool<'_>,
    ) -> Result<(), PluginError> {
        let header = ClassHeader::new(target.name().clone(), CodeVersion::of_java_version(8)?);
        builder.rewrite(write_class(&header))?;
        Ok(())
    }
}

/// Panics on every unit.
#[derive(Debug)]
struct Panic;

impl Plugin for Panic {
    fn name(&self) -> &str {
        PANIC
    }

    fn matches(&self, _target: &TypeDescription) -> bool {
        true
    }

    fn apply(
        &self,
        _builder: &mut UnitBuilder,
        target: &TypeDescription,
        _pool: &TypePool<'_>,
    ) -> Result<(), PluginError> {
        panic!("plugin bug while transforming {}", target.name());
    }
}

/// A classpath handle that counts closes and can fail them.
struct Handle {
    closed: Arc<AtomicUsize>,
    fail: bool,
}

impl ClassFileLocator for Handle {
    fn locate(&self, _name: &TypeName) -> io::Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn close(&self) -> Result<(), ReleaseError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        let mut error = ReleaseError::new("tracked handle");
        if self.fail {
            error.push("tracked handle", io::Error::other("device went away"));
        }
        error.into_result()
    }
}

/// Opens classpaths from disk and adds a tracked handle to each.
#[derive(Default)]
struct Tracking {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    fail: bool,
}

impl Tracking {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl Opener for Tracking {
    fn open(&self, classpath: &ClasspathSet) -> Compound {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let disk: Arc<dyn ClassFileLocator> = Arc::new(FileSystem.open(classpath));
        let handle: Arc<dyn ClassFileLocator> = Arc::new(Handle {
            closed: Arc::clone(&self.closed),
            fail: self.fail,
        });
        Compound::new(vec![disk, handle])
    }
}

fn registry() -> PluginRegistry {
    PluginRegistry::builtin()
        .with_plugin(
            PluginDescriptor::new(REWRITE)
                .with_constructor(Constructor::new(Vec::new(), |_| Ok(Arc::new(Rewrite)))),
        )
        .with_plugin(PluginDescriptor::new(EXPLODE).with_constructor(Constructor::new(
            vec![ParameterType::Path, ParameterType::BuildLogger],
            |arguments| {
                arguments.path(0)?;
                arguments.logger(1)?.debug("Creating exploding plugin");
                Ok(Arc::new(Explode))
            },
        )))
        .with_plugin(
            PluginDescriptor::bundled(RESTAMP)
                .with_constructor(Constructor::new(Vec::new(), |_| Ok(Arc::new(Restamp)))),
        )
        .with_plugin(
            PluginDescriptor::bundled(PANIC)
                .with_constructor(Constructor::new(Vec::new(), |_| Ok(Arc::new(Panic)))),
        )
        .with_plugin(
            PluginDescriptor::bundled(UNLICENSED).with_constructor(Constructor::new(
                Vec::new(),
                |_| Err("no license for this build".into()),
            )),
        )
}

fn java17() -> CodeVersion {
    CodeVersion::of_java_version(17).unwrap()
}

fn write_unit(root: &Path, name: &str) -> Vec<u8> {
    let bytes = write_class(&ClassHeader::new(name, java17()));
    let path = root.join(TypeName::new(name).resource_path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, &bytes).unwrap();
    bytes
}

/// Writes a plugin archive holding the class files of the given types.
fn write_plugin_archive(path: &Path, names: &[&str]) {
    let mut builder = tar::Builder::new(File::create(path).unwrap());
    for name in names {
        let data = write_class(&ClassHeader::new(*name, java17()));
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, TypeName::new(name).resource_path(), data.as_slice())
            .unwrap();
    }
    builder.finish().unwrap();
}

fn read(root: &Path, name: &str) -> Vec<u8> {
    fs::read(root.join(TypeName::new(name).resource_path())).unwrap()
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with every log entry of the current thread captured.
fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    (result, captured.contents())
}

#[test]
fn test_single_unit_is_transformed() {
    let dir = tempdir().unwrap();
    let classes = dir.path().join("classes");
    let plugins = dir.path().join("plugins.tar");
    let original = write_unit(&classes, "app.Service");
    write_plugin_archive(&plugins, &[REWRITE]);

    let config = BuildConfig::new(&classes)
        .with_target_version("17")
        .with_transformation(
            TransformationSpec::new(REWRITE).with_classpath(ClasspathSet::new([&plugins])),
        );
    let registry = registry();

    let (result, logs) = capture_logs(|| TransformAction::new(&config, &registry).apply());
    let report = result.unwrap();

    assert_eq!(
        report.summary.transformed.iter().collect::<Vec<_>>(),
        vec![&TypeName::new("app.Service")]
    );
    assert!(report.summary.failed.is_empty());
    assert!(report.release_errors.is_empty());

    let mut expected = original;
    expected.extend_from_slice(b"REWRITTEN");
    assert_eq!(read(&classes, "app.Service"), expected);

    assert!(logs.contains("Resolved plugin: com.example.Rewrite"));
    assert!(logs.contains("Transformed app.Service using [com.example.Rewrite]"));
    assert!(logs.contains("Transformed 1 types"));
}

#[test]
fn test_root_must_be_a_folder() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("classes");
    fs::write(&file, b"not a folder").unwrap();

    let config = BuildConfig::new(&file).with_transformation(TransformationSpec::new(NO_OP));
    let registry = registry();

    let err = TransformAction::new(&config, &registry).apply().unwrap_err();
    assert!(matches!(err, BuildError::InvalidRoot(ref root) if root == &file));
}

#[test]
fn test_misspelled_plugin_touches_nothing() {
    let dir = tempdir().unwrap();
    let original = write_unit(dir.path(), "app.Service");
    write_unit(dir.path(), REWRITE);

    let config = BuildConfig::new(dir.path())
        .with_transformation(TransformationSpec::new(REWRITE))
        .with_transformation(TransformationSpec::new("com.example.Rewirte"));
    let registry = registry();

    let err = TransformAction::new(&config, &registry).apply().unwrap_err();
    assert!(matches!(
        err,
        BuildError::PluginResolution {
            ref plugin,
            source: ResolutionError::ClassNotFound(_),
        } if plugin == "com.example.Rewirte"
    ));
    assert_eq!(err.to_string(), "Cannot resolve plugin: com.example.Rewirte");
    assert_eq!(read(dir.path(), "app.Service"), original);
}

#[test]
fn test_failed_unit_does_not_hide_transformed_units() {
    let dir = tempdir().unwrap();
    write_unit(dir.path(), "app.BadService");
    let good = write_unit(dir.path(), "app.GoodService");
    for name in [REWRITE, EXPLODE] {
        write_unit(dir.path(), name);
    }

    let config = BuildConfig::new(dir.path())
        .with_threads(2)
        .with_transformation(TransformationSpec::new(REWRITE))
        .with_transformation(TransformationSpec::new(EXPLODE));
    let registry = registry();

    let err = TransformAction::new(&config, &registry).apply().unwrap_err();
    let BuildError::UnitFailures {
        ref failed,
        ref transformed,
    } = err
    else {
        panic!("expected unit failures, got {err:?}");
    };

    assert_eq!(
        failed.keys().collect::<Vec<_>>(),
        vec![&TypeName::new("app.BadService")]
    );
    assert!(transformed.contains(&TypeName::new("app.GoodService")));
    assert!(read(dir.path(), "app.GoodService").len() > good.len());
    assert_eq!(
        err.to_string(),
        "1 type transformations have failed: [app.BadService]"
    );
}

#[test]
fn test_empty_plugin_list_warns() {
    let dir = tempdir().unwrap();
    write_unit(dir.path(), "app.Service");

    let config = BuildConfig::new(dir.path());
    let registry = registry();

    let (result, logs) = capture_logs(|| TransformAction::new(&config, &registry).apply());
    let report = result.unwrap();

    assert!(report.summary.transformed.is_empty());
    assert!(report.summary.unchanged.contains(&TypeName::new("app.Service")));
    let warning = "No types were transformed during plugin execution";
    assert_eq!(logs.matches(warning).count(), 1);
    assert!(logs.contains("Could not locate target version, build is platform dependent"));
}

#[test]
fn test_empty_type_set_warning_can_be_disabled() {
    let dir = tempdir().unwrap();
    let config = BuildConfig::new(dir.path()).with_warn_on_empty_type_set(false);
    let registry = registry();

    let (result, logs) = capture_logs(|| TransformAction::new(&config, &registry).apply());

    assert!(result.unwrap().summary.is_empty());
    assert!(!logs.contains("No types were transformed"));
}

#[test]
fn test_fail_fast_stops_submitting() {
    let dir = tempdir().unwrap();
    for name in ["app.BadA", "app.BadB", "app.BadC", EXPLODE] {
        write_unit(dir.path(), name);
    }

    let config = BuildConfig::new(dir.path())
        .with_fail_fast(true)
        .with_transformation(TransformationSpec::new(EXPLODE));
    let registry = registry();

    let err = TransformAction::new(&config, &registry).apply().unwrap_err();
    assert_eq!(err.failed_types(), vec![&TypeName::new("app.BadA")]);
}

#[test]
fn test_without_fail_fast_every_failure_is_reported() {
    let dir = tempdir().unwrap();
    for name in ["app.BadA", "app.BadB", EXPLODE] {
        write_unit(dir.path(), name);
    }

    let config = BuildConfig::new(dir.path()).with_transformation(TransformationSpec::new(EXPLODE));
    let registry = registry();

    let err = TransformAction::new(&config, &registry).apply().unwrap_err();
    assert_eq!(
        err.failed_types(),
        vec![&TypeName::new("app.BadA"), &TypeName::new("app.BadB")]
    );
    assert_eq!(
        err.to_string(),
        "2 type transformations have failed: [app.BadA, app.BadB]"
    );
}

#[test]
fn test_decorate_refuses_header_changes() {
    let dir = tempdir().unwrap();
    let original = write_unit(dir.path(), "app.Service");

    let config = BuildConfig::new(dir.path())
        .with_entry_point(EntryPointSpec::new("decorate"))
        .with_transformation(TransformationSpec::new(RESTAMP));
    let registry = registry();

    let err = TransformAction::new(&config, &registry).apply().unwrap_err();
    assert_eq!(err.failed_types(), vec![&TypeName::new("app.Service")]);
    assert_eq!(read(dir.path(), "app.Service"), original);

    let config = config.with_entry_point(EntryPointSpec::new("REBASE"));
    let report = TransformAction::new(&config, &registry).apply().unwrap();
    assert!(report.summary.transformed.contains(&TypeName::new("app.Service")));
}

#[test]
fn test_units_newer_than_target_fail() {
    let dir = tempdir().unwrap();
    write_unit(dir.path(), "app.Service");

    let config = BuildConfig::new(dir.path())
        .with_target_version("11")
        .with_transformation(TransformationSpec::new(RESTAMP));
    let registry = registry();

    let err = TransformAction::new(&config, &registry).apply().unwrap_err();
    assert_eq!(err.failed_types(), vec![&TypeName::new("app.Service")]);
}

#[test]
fn test_invalid_target_version_fails_engine_construction() {
    let dir = tempdir().unwrap();
    let config = BuildConfig::new(dir.path()).with_target_version("banana");
    let registry = registry();

    let err = TransformAction::new(&config, &registry).apply().unwrap_err();
    assert!(matches!(err, BuildError::EngineConstruction { .. }));
}

#[test]
fn test_resolve_only_reports_resolution() {
    let dir = tempdir().unwrap();
    let original = write_unit(dir.path(), "app.Service");
    write_unit(dir.path(), REWRITE);

    let config = BuildConfig::new(dir.path())
        .with_target_version("1.8")
        .with_transformation(TransformationSpec::new(REWRITE));
    let registry = registry();

    let resolved = TransformAction::new(&config, &registry).resolve_only().unwrap();
    assert_eq!(resolved.plugins, vec![REWRITE.to_string()]);
    assert_eq!(resolved.entry_point, "Rebase");
    assert!(resolved.engine.starts_with("Java 8 (52)"));
    assert_eq!(read(dir.path(), "app.Service"), original);
}

#[test]
fn test_panicking_plugin_fails_the_run_in_every_dispatch_mode() {
    for threads in [0, 2] {
        let dir = tempdir().unwrap();
        let original = write_unit(dir.path(), "app.Service");

        let config = BuildConfig::new(dir.path())
            .with_threads(threads)
            .with_transformation(TransformationSpec::new(PANIC));
        let registry = registry();

        let err = TransformAction::new(&config, &registry).apply().unwrap_err();
        assert!(
            matches!(err, BuildError::TransformationExecution { ref root, .. } if root == dir.path()),
            "threads = {threads}: {err:?}"
        );
        assert_eq!(read(dir.path(), "app.Service"), original);
    }
}

#[test]
fn test_failing_constructor_is_a_resolution_error() {
    let dir = tempdir().unwrap();
    let original = write_unit(dir.path(), "app.Service");

    let config = BuildConfig::new(dir.path())
        .with_transformation(TransformationSpec::new("com/example/Unlicensed"));
    let registry = registry();

    let err = TransformAction::new(&config, &registry).apply().unwrap_err();
    assert!(matches!(
        err,
        BuildError::PluginResolution {
            ref plugin,
            source: ResolutionError::Instantiation { .. },
        } if plugin == "com/example/Unlicensed"
    ));
    assert_eq!(err.to_string(), "Cannot resolve plugin: com/example/Unlicensed");
    assert_eq!(read(dir.path(), "app.Service"), original);
}

#[test]
fn test_failed_execution_releases_every_handle_once() {
    let dir = tempdir().unwrap();
    write_unit(dir.path(), "app.Service");

    let config = BuildConfig::new(dir.path()).with_transformation(TransformationSpec::new(PANIC));
    let registry = registry();
    let tracking = Arc::new(Tracking::default());
    let opened = Arc::clone(&tracking.opened);
    let closed = Arc::clone(&tracking.closed);

    let err = TransformAction::new(&config, &registry)
        .with_opener(tracking)
        .apply()
        .unwrap_err();

    assert!(matches!(err, BuildError::TransformationExecution { .. }));
    assert!(opened.load(Ordering::SeqCst) >= 2);
    assert_eq!(closed.load(Ordering::SeqCst), opened.load(Ordering::SeqCst));
}

#[test]
fn test_release_failures_are_reported_without_failing_the_run() {
    let dir = tempdir().unwrap();
    write_unit(dir.path(), "app.Service");

    let config = BuildConfig::new(dir.path()).with_transformation(TransformationSpec::new(NO_OP));
    let registry = registry();
    let tracking = Arc::new(Tracking::failing());
    let closed = Arc::clone(&tracking.closed);

    let (result, logs) = capture_logs(|| {
        TransformAction::new(&config, &registry)
            .with_opener(tracking)
            .apply()
    });
    let report = result.unwrap();

    assert_eq!(report.release_errors.len(), 2);
    assert!(report.release_errors.iter().all(|error| !error.failures.is_empty()));
    assert_eq!(closed.load(Ordering::SeqCst), 2);
    assert!(logs.contains("device went away"));
}

#[test]
fn test_resolve_only_reports_release_failures() {
    let dir = tempdir().unwrap();
    let config = BuildConfig::new(dir.path()).with_transformation(TransformationSpec::new(NO_OP));
    let registry = registry();

    let resolved = TransformAction::new(&config, &registry)
        .with_opener(Arc::new(Tracking::failing()))
        .resolve_only()
        .unwrap();

    assert_eq!(resolved.plugins, vec![NO_OP.to_string()]);
    assert_eq!(resolved.release_errors.len(), 1);
}
