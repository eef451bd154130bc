//! # Library Resolution
//!
//! Turns the library identifier of a descriptor into a loaded image.
//!
//! `SearchPathResolver` probes, in order, the configured directories, the
//! directory of the running executable and the working directory. In each it
//! tries the name as given, the name with the pointer-width suffix (`foo64.so`)
//! and, where the platform uses one, the `lib` prefixed forms. A name without
//! extension or directory gets the platform extension first. When nothing is
//! found on disk the name is handed to the system loader unchanged.

use std::env::consts::DLL_PREFIX;
use std::env::consts::DLL_SUFFIX;
use std::path::Path;
use std::path::PathBuf;

use libc::c_void;
use tracing::debug;

/// Suffix distinguishing per-architecture builds of the same library.
const POINTER_WIDTH_SUFFIX: &str = if cfg!(target_pointer_width = "64") { "64" } else { "32" };

/// A loaded native image.
pub trait NativeLibrary {
    /// Address of an exported symbol, `None` if the image does not export it.
    fn symbol(&self, name: &str) -> Option<*const c_void>;
}

pub trait LibraryResolver {
    /// Loads the library named by `identifier`. The error is a human-readable reason.
    fn resolve(&self, identifier: &str) -> Result<Box<dyn NativeLibrary>, String>;
}

struct DynamicLibrary {
    inner: libloading::Library,
}

impl NativeLibrary for DynamicLibrary {
    fn symbol(&self, name: &str) -> Option<*const c_void> {
        // SAFETY: the symbol is only taken as an address, never dereferenced here.
        let sym = unsafe { self.inner.get::<*const c_void>(name) }.ok()?;
        let addr = *sym;
        (!addr.is_null()).then_some(addr)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchPathResolver {
    search_dirs: Vec<PathBuf>,
}

impl SearchPathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directories probed before the executable and working directories.
    pub fn with_search_dirs(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self { search_dirs: dirs.into_iter().collect() }
    }

    fn directories(&self) -> Vec<PathBuf> {
        let mut dirs = self.search_dirs.clone();
        if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
            dirs.push(exe_dir);
        }
        if let Ok(cwd) = std::env::current_dir() {
            dirs.push(cwd);
        }
        dirs
    }

    /// The path the loader will be given for `identifier`.
    pub fn locate(&self, identifier: &str) -> PathBuf {
        let name = with_platform_extension(identifier);
        if name.is_absolute() {
            return name;
        }

        for dir in self.directories() {
            for candidate in candidate_names(&name) {
                let path = dir.join(candidate);
                if path.is_file() {
                    return path;
                }
            }
        }

        name
    }
}

impl LibraryResolver for SearchPathResolver {
    fn resolve(&self, identifier: &str) -> Result<Box<dyn NativeLibrary>, String> {
        if identifier.trim().is_empty() {
            return Err("library name is empty".into());
        }

        let path = self.locate(identifier);
        debug!(identifier, path = %path.display(), "opening library");

        let inner = open(&path).map_err(|e| e.to_string())?;
        Ok(Box::new(DynamicLibrary { inner }))
    }
}

#[cfg(unix)]
fn open(path: &Path) -> Result<libloading::Library, libloading::Error> {
    use libloading::os::unix::Library;
    use libloading::os::unix::RTLD_GLOBAL;
    use libloading::os::unix::RTLD_NOW;

    // SAFETY: running the library's initializers is the point of loading it.
    unsafe { Library::open(Some(path), RTLD_NOW | RTLD_GLOBAL) }.map(Into::into)
}

#[cfg(not(unix))]
fn open(path: &Path) -> Result<libloading::Library, libloading::Error> {
    // SAFETY: see the unix variant.
    unsafe { libloading::Library::new(path) }
}

fn with_platform_extension(identifier: &str) -> PathBuf {
    let path = Path::new(identifier);
    let has_dir = path.parent().is_some_and(|p| !p.as_os_str().is_empty());
    if path.extension().is_none() && !has_dir {
        PathBuf::from(format!("{}{}", identifier, DLL_SUFFIX))
    } else {
        path.to_path_buf()
    }
}

/// File names tried inside one search directory, in probe order.
pub(crate) fn candidate_names(name: &Path) -> Vec<PathBuf> {
    let parent = name.parent().unwrap_or_else(|| Path::new(""));
    let stem = name.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let ext = name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut names = vec![
        name.to_path_buf(),
        parent.join(format!("{}{}{}", stem, POINTER_WIDTH_SUFFIX, ext)),
    ];
    if !DLL_PREFIX.is_empty() && !stem.starts_with(DLL_PREFIX) {
        names.push(parent.join(format!("{}{}{}", DLL_PREFIX, stem, ext)));
        names.push(parent.join(format!("{}{}{}{}", DLL_PREFIX, stem, POINTER_WIDTH_SUFFIX, ext)));
    }
    names
}
