//! The class pool: an append-only index of compiled classes across archive
//! and directory locations. Lookup is first-hit-wins in load order, so
//! shadowed duplicates resolve deterministically.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs::{self, File},
    io::Read,
    path::{Path, PathBuf},
    sync::Arc,
};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;
use zip::ZipArchive;

use crate::{
    class::{self, parser},
    error::{AnalyzerError, Result},
    names,
};

pub struct ClassPool {
    locations: Vec<Location>,
    classes: BTreeMap<String, ClassOrigin>,
    packages: BTreeSet<String>,
    parsed: DashMap<String, Arc<class::Class>>,
}

#[derive(Debug, Clone, Copy)]
struct ClassOrigin {
    location: usize,
    project: bool,
}

enum Location {
    Directory(PathBuf),
    Archive {
        path: PathBuf,
        archive: Mutex<ZipArchive<File>>,
        // jmod archives keep their classes under `classes/`
        entry_prefix: &'static str,
    },
}

impl Default for ClassPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassPool {
    pub fn new() -> Self {
        Self {
            locations: Vec::new(),
            classes: BTreeMap::new(),
            packages: BTreeSet::new(),
            parsed: DashMap::new(),
        }
    }

    /// Registers a project location: its classes are scanned for REST roots.
    pub fn add_project(&mut self, location: &Path) -> Result<()> {
        self.add(location, true, "")
    }

    /// Registers a dependency location: resolvable for supertype and
    /// call-target lookups, never scanned for roots.
    pub fn add_dependency(&mut self, location: &Path) -> Result<()> {
        self.add(location, false, "")
    }

    /// Registers the platform class library from `$JAVA_HOME/jmods` so that
    /// supertype resolution can see JDK and framework interfaces.
    pub fn add_runtime_modules(&mut self, java_home: &Path) -> Result<()> {
        let jmods = java_home.join("jmods");
        if !jmods.is_dir() {
            return Err(AnalyzerError::InvalidLocation(jmods));
        }
        let mut modules: Vec<PathBuf> = fs::read_dir(&jmods)
            .map_err(|source| AnalyzerError::LocationUnreadable {
                path: jmods.clone(),
                source,
            })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "jmod"))
            .collect();
        modules.sort();
        for module in modules {
            self.add(&module, false, "classes/")?;
        }
        Ok(())
    }

    fn add(&mut self, location: &Path, project: bool, entry_prefix: &'static str) -> Result<()> {
        if !location.exists() {
            return Err(AnalyzerError::InvalidLocation(location.to_path_buf()));
        }

        // collect entry names first so a scan failure leaves the pool intact
        let (entries, new_location) = if location.is_dir() {
            let mut entries = Vec::new();
            scan_directory(location, location, &mut entries)?;
            (entries, Location::Directory(location.to_path_buf()))
        } else {
            let file = File::open(location).map_err(|source| AnalyzerError::LocationUnreadable {
                path: location.to_path_buf(),
                source,
            })?;
            let archive =
                ZipArchive::new(file).map_err(|err| AnalyzerError::LocationUnreadable {
                    path: location.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidData, err),
                })?;
            let entries = archive
                .file_names()
                .filter_map(|name| name.strip_prefix(entry_prefix))
                .map(String::from)
                .collect();
            (
                entries,
                Location::Archive {
                    path: location.to_path_buf(),
                    archive: Mutex::new(archive),
                    entry_prefix,
                },
            )
        };

        let index = self.locations.len();
        self.locations.push(new_location);
        for entry_name in &entries {
            self.register_entry(entry_name, index, project);
        }
        Ok(())
    }

    fn register_entry(&mut self, entry_name: &str, index: usize, project: bool) {
        let Some(internal) = entry_name.strip_suffix(".class") else {
            return;
        };
        if internal == "module-info" || internal.ends_with("/module-info") {
            return;
        }
        let binary = names::to_binary_name(internal);
        if let Some((package, _)) = binary.rsplit_once('.') {
            self.packages.insert(package.to_string());
        }
        self.classes
            .entry(binary)
            .or_insert(ClassOrigin { location: index, project });
    }

    /// All registered binary class names, sorted.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// Binary names of classes registered from project locations, sorted.
    pub fn project_class_names(&self) -> impl Iterator<Item = &str> {
        self.classes
            .iter()
            .filter(|(_, origin)| origin.project)
            .map(|(name, _)| name.as_str())
    }

    pub fn package_names(&self) -> &BTreeSet<String> {
        &self.packages
    }

    pub(crate) fn is_project_class(&self, binary_name: &str) -> bool {
        self.classes
            .get(binary_name)
            .is_some_and(|origin| origin.project)
    }

    pub(crate) fn contains(&self, binary_name: &str) -> bool {
        self.classes.contains_key(binary_name)
    }

    /// Parses the class behind the given binary name, caching the result.
    pub fn read_class(&self, binary_name: &str) -> Result<Arc<class::Class>> {
        if let Some(parsed) = self.parsed.get(binary_name) {
            return Ok(Arc::clone(&parsed));
        }

        let origin = self
            .classes
            .get(binary_name)
            .ok_or_else(|| AnalyzerError::ClassNotFound(binary_name.to_string()))?;
        let bytes = self.read_bytes(binary_name, origin.location)?;

        let (_, parsed) =
            parser::class_file(&bytes).map_err(|err| AnalyzerError::MalformedClassFile {
                class_name: binary_name.to_string(),
                detail: format!("{err:?}"),
            })?;
        let parsed = Arc::new(parsed);
        self.parsed
            .insert(binary_name.to_string(), Arc::clone(&parsed));
        Ok(parsed)
    }

    fn read_bytes(&self, binary_name: &str, location: usize) -> Result<Vec<u8>> {
        let internal = names::to_internal_name(binary_name);
        match &self.locations[location] {
            Location::Directory(base) => {
                let path = base.join(format!("{internal}.class"));
                fs::read(&path).map_err(|err| {
                    debug!(class = binary_name, path = %path.display(), "class file vanished: {err}");
                    AnalyzerError::ClassNotFound(binary_name.to_string())
                })
            }
            Location::Archive {
                path,
                archive,
                entry_prefix,
            } => {
                let mut archive = archive.lock();
                let mut entry = archive
                    .by_name(&format!("{entry_prefix}{internal}.class"))
                    .map_err(|err| {
                        debug!(class = binary_name, archive = %path.display(), "archive entry unreadable: {err}");
                        AnalyzerError::ClassNotFound(binary_name.to_string())
                    })?;
                let mut bytes = Vec::with_capacity(entry.size() as usize);
                entry
                    .read_to_end(&mut bytes)
                    .map_err(|source| AnalyzerError::LocationUnreadable {
                        path: path.clone(),
                        source,
                    })?;
                Ok(bytes)
            }
        }
    }
}

/// Recursive walk collecting entry names relative to `base`, `/`-separated
/// regardless of host filesystem.
fn scan_directory(base: &Path, dir: &Path, entries: &mut Vec<String>) -> Result<()> {
    let listing = fs::read_dir(dir).map_err(|source| AnalyzerError::LocationUnreadable {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in listing {
        let entry = entry.map_err(|source| AnalyzerError::LocationUnreadable {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            scan_directory(base, &path, entries)?;
        } else if let Ok(relative) = path.strip_prefix(base) {
            let entry_name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            entries.push(entry_name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{SystemTime, UNIX_EPOCH};
    use zip::write::FileOptions;

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "jaxscan_test_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ))
    }

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut jar = zip::ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            jar.start_file(*name, options).unwrap();
            jar.write_all(content).unwrap();
        }
        jar.finish().unwrap();
    }

    #[test]
    fn missing_location_is_rejected() {
        let mut pool = ClassPool::new();
        let missing = temp_path("does_not_exist");
        assert!(matches!(
            pool.add_project(&missing),
            Err(AnalyzerError::InvalidLocation(_))
        ));
    }

    #[test]
    fn registers_classes_and_packages_from_a_jar() {
        let jar = temp_path("registers.jar");
        write_jar(
            &jar,
            &[
                ("com/acme/api/Users.class", b"" as &[u8]),
                ("com/acme/api/inner/Orders.class", b""),
                ("module-info.class", b""),
                ("META-INF/MANIFEST.MF", b""),
            ],
        );

        let mut pool = ClassPool::new();
        pool.add_project(&jar).unwrap();

        let names: Vec<_> = pool.class_names().collect();
        assert_eq!(names, vec!["com.acme.api.Users", "com.acme.api.inner.Orders"]);
        assert!(pool.package_names().contains("com.acme.api"));
        assert!(pool.package_names().contains("com.acme.api.inner"));

        fs::remove_file(jar).unwrap();
    }

    #[test]
    fn registers_classes_from_a_directory_tree() {
        let base = temp_path("dir_pool");
        fs::create_dir_all(base.join("com/acme")).unwrap();
        fs::write(base.join("com/acme/Thing.class"), b"").unwrap();

        let mut pool = ClassPool::new();
        pool.add_project(&base).unwrap();

        assert!(pool.contains("com.acme.Thing"));
        assert!(pool.is_project_class("com.acme.Thing"));

        fs::remove_dir_all(base).unwrap();
    }

    #[test]
    fn dependency_classes_are_not_project_classes() {
        let jar = temp_path("dependency.jar");
        write_jar(&jar, &[("org/lib/Iface.class", b"" as &[u8])]);

        let mut pool = ClassPool::new();
        pool.add_dependency(&jar).unwrap();

        assert!(pool.contains("org.lib.Iface"));
        assert!(!pool.is_project_class("org.lib.Iface"));
        assert_eq!(pool.project_class_names().count(), 0);

        fs::remove_file(jar).unwrap();
    }

    #[test]
    fn unknown_class_is_class_not_found() {
        let pool = ClassPool::new();
        assert!(matches!(
            pool.read_class("no.such.Class"),
            Err(AnalyzerError::ClassNotFound(_))
        ));
    }
}
