//! Class file locators over folders, archives and classpaths.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rivet_core::{ClasspathSet, Release, ReleaseError, TypeName};
use zip::ZipArchive;
use zip::result::ZipError;

/// Looks up the class file of a type by name.
///
/// Locators are shared read-only between transformation workers.
pub trait ClassFileLocator: Send + Sync {
    /// Returns the class file bytes, or `None` if this locator has no such type.
    fn locate(&self, name: &TypeName) -> io::Result<Option<Vec<u8>>>;

    /// Closes any handles held by this locator. Closing twice is a no-op.
    fn close(&self) -> Result<(), ReleaseError> {
        Ok(())
    }
}

/// Locates class files below a directory.
#[derive(Debug, Clone)]
pub struct Folder {
    root: PathBuf,
}

impl Folder {
    /// Creates a locator for the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ClassFileLocator for Folder {
    fn locate(&self, name: &TypeName) -> io::Result<Option<Vec<u8>>> {
        let path = self.root.join(name.resource_path());
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound || !self.root.is_dir() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Leading bytes of a zip (jar) archive.
const ZIP_MAGIC: &[u8; 2] = b"PK";

/// Locates class files inside a jar (zip) or tar archive.
///
/// The format is detected from the leading bytes. Entries are indexed when
/// the archive is opened; reads go through a single handle that is kept
/// open until the locator is closed.
#[derive(Debug)]
pub struct Archive {
    path: PathBuf,
    files: usize,
    reader: Mutex<Option<Reader>>,
}

#[derive(Debug)]
enum Reader {
    Jar(ZipArchive<File>),
    Tar {
        file: File,
        entries: HashMap<String, (u64, u64)>,
    },
}

impl Reader {
    fn jar(file: File) -> io::Result<Self> {
        let jar = ZipArchive::new(file).map_err(io::Error::other)?;
        Ok(Self::Jar(jar))
    }

    fn tar(file: File) -> io::Result<Self> {
        let mut entries = HashMap::new();
        {
            let mut archive = tar::Archive::new(&file);
            for entry in archive.entries()? {
                let entry = entry?;
                if !entry.header().entry_type().is_file() {
                    continue;
                }
                let name = entry.path()?.to_string_lossy().replace('\\', "/");
                let name = name.trim_start_matches("./").to_string();
                entries.insert(name, (entry.raw_file_position(), entry.size()));
            }
        }
        Ok(Self::Tar { file, entries })
    }

    fn files(&self) -> usize {
        match self {
            Self::Jar(jar) => jar.file_names().filter(|name| !name.ends_with('/')).count(),
            Self::Tar { entries, .. } => entries.len(),
        }
    }

    fn read(&mut self, resource: &str) -> io::Result<Option<Vec<u8>>> {
        match self {
            Self::Jar(jar) => match jar.by_name(resource) {
                Ok(mut entry) => {
                    let mut bytes = Vec::with_capacity(entry.size() as usize);
                    entry.read_to_end(&mut bytes)?;
                    Ok(Some(bytes))
                }
                Err(ZipError::FileNotFound) => Ok(None),
                Err(e) => Err(io::Error::other(e)),
            },
            Self::Tar { file, entries } => {
                let Some(&(offset, size)) = entries.get(resource) else {
                    return Ok(None);
                };
                file.seek(SeekFrom::Start(offset))?;
                let mut bytes = vec![0; size as usize];
                file.read_exact(&mut bytes)?;
                Ok(Some(bytes))
            }
        }
    }
}

impl Archive {
    /// Opens and indexes an archive.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let mut file = File::open(&path)?;

        let mut magic = [0; 2];
        let jar = file.read_exact(&mut magic).is_ok() && &magic == ZIP_MAGIC;
        file.seek(SeekFrom::Start(0))?;

        let reader = if jar {
            Reader::jar(file)?
        } else {
            Reader::tar(file)?
        };
        let files = reader.files();
        tracing::debug!("Indexed {} files in {}", files, path.display());

        Ok(Self {
            path,
            files,
            reader: Mutex::new(Some(reader)),
        })
    }

    /// Returns the number of indexed files.
    pub fn len(&self) -> usize {
        self.files
    }

    /// Returns true if the archive holds no files.
    pub fn is_empty(&self) -> bool {
        self.files == 0
    }

    /// Returns true once the handle has been closed.
    pub fn is_closed(&self) -> bool {
        match self.reader.lock() {
            Ok(reader) => reader.is_none(),
            Err(poisoned) => poisoned.get_ref().is_none(),
        }
    }
}

impl ClassFileLocator for Archive {
    fn locate(&self, name: &TypeName) -> io::Result<Option<Vec<u8>>> {
        let mut guard = self.reader.lock().map_err(|_| {
            io::Error::other(format!("Archive handle poisoned: {}", self.path.display()))
        })?;
        let reader = guard.as_mut().ok_or_else(|| {
            io::Error::other(format!("Archive already closed: {}", self.path.display()))
        })?;
        reader.read(&name.resource_path())
    }

    fn close(&self) -> Result<(), ReleaseError> {
        let mut error = ReleaseError::new(format!("archive {}", self.path.display()));
        match self.reader.lock() {
            Ok(mut reader) => {
                reader.take();
            }
            Err(poisoned) => {
                poisoned.into_inner().take();
                error.push(
                    self.path.display().to_string(),
                    io::Error::other("handle poisoned by a failed reader"),
                );
            }
        }
        error.into_result()
    }
}

/// Tries several locators in order and returns the first hit.
#[derive(Clone, Default)]
pub struct Compound {
    locators: Vec<Arc<dyn ClassFileLocator>>,
}

impl Compound {
    /// Creates a compound locator; lookup follows the given order.
    pub fn new(locators: Vec<Arc<dyn ClassFileLocator>>) -> Self {
        Self { locators }
    }

    /// Creates a locator for every classpath location, in classpath order.
    ///
    /// Regular files are read as jar or tar archives, everything else as
    /// folders.
    /// Archives that cannot be opened are skipped with a warning.
    pub fn for_classpath(classpath: &ClasspathSet) -> Self {
        let locators = classpath
            .iter()
            .filter_map(|location| Self::for_location(location))
            .collect();
        Self { locators }
    }

    fn for_location(location: &Path) -> Option<Arc<dyn ClassFileLocator>> {
        if location.is_file() {
            match Archive::open(location) {
                Ok(archive) => Some(Arc::new(archive)),
                Err(e) => {
                    tracing::warn!("Cannot open archive {}: {}", location.display(), e);
                    None
                }
            }
        } else {
            Some(Arc::new(Folder::new(location)))
        }
    }

    /// Returns the number of underlying locators.
    pub fn len(&self) -> usize {
        self.locators.len()
    }

    /// Returns true if there are no underlying locators.
    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

impl ClassFileLocator for Compound {
    fn locate(&self, name: &TypeName) -> io::Result<Option<Vec<u8>>> {
        for locator in &self.locators {
            if let Some(bytes) = locator.locate(name)? {
                return Ok(Some(bytes));
            }
        }
        Ok(None)
    }

    fn close(&self) -> Result<(), ReleaseError> {
        let mut error = ReleaseError::new("class file locator");
        for locator in &self.locators {
            if let Err(e) = locator.close() {
                error.extend(e);
            }
        }
        error.into_result()
    }
}

impl Release for Compound {
    fn release(&mut self) -> Result<(), ReleaseError> {
        self.close()
    }
}

/// Opens the readers of a classpath.
pub trait Opener: Send + Sync {
    fn open(&self, classpath: &ClasspathSet) -> Compound;
}

/// Opens classpath locations on the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystem;

impl Opener for FileSystem {
    fn open(&self, classpath: &ClasspathSet) -> Compound {
        Compound::for_classpath(classpath)
    }
}
