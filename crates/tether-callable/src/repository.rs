//! Callable repository
//!
//! Stores declared classes, functions, directories and namespaces with
//! their raw options, discovers classes by scanning directories, and
//! resolves entities with merged options on demand.

use crate::entity::{CallableEntity, WILDCARD};
use crate::naming::{self, PATH_SEPARATOR};
use crate::resolver::{build_entity, EntityIdentity};
use crate::scanner::{self, DEFAULT_EXTENSIONS};
use parking_lot::RwLock;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tether_config::MergePolicy;
use tether_core::{CallableKind, Options, Result, SetupError};
use tracing::{debug, info};

/// Separator of anonymous directory classes
pub const DIRECTORY_SEPARATOR: char = '_';
/// Separator of namespaced classes
pub const NAMESPACE_SEPARATOR: char = '.';

/// Declaration counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryStats {
    /// Declared or discovered classes
    pub classes: usize,
    /// Declared functions
    pub functions: usize,
    /// Anonymous directories
    pub directories: usize,
    /// Namespaces
    pub namespaces: usize,
}

/// Callable repository
///
/// Populated at startup, read-mostly afterwards. Entities are resolved
/// lazily and cached until the next declaration.
#[derive(Debug)]
pub struct CallableRepository {
    defaults: Options,
    policy: MergePolicy,
    state: RwLock<RepositoryState>,
}

#[derive(Debug, Default)]
struct RepositoryState {
    classes: BTreeMap<String, ClassEntry>,
    functions: BTreeMap<String, FunctionEntry>,
    directories: BTreeMap<PathBuf, DirectoryScope>,
    namespaces: BTreeMap<String, NamespaceScope>,
    entities: HashMap<String, Arc<CallableEntity>>,
    function_entities: HashMap<String, Arc<CallableEntity>>,
    scanned: bool,
}

#[derive(Debug, Clone)]
struct ClassEntry {
    options: Options,
    scope: Option<ScopeRef>,
    timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ScopeRef {
    Directory(PathBuf),
    Namespace(String),
}

#[derive(Debug, Clone)]
struct FunctionEntry {
    options: Options,
    timestamp: u64,
}

#[derive(Debug, Clone)]
struct DirectoryScope {
    options: Options,
    separator: char,
    extensions: Vec<String>,
}

#[derive(Debug, Clone)]
struct NamespaceScope {
    options: Options,
    directory: Option<PathBuf>,
    separator: char,
    extensions: Vec<String>,
}

/// Outcome of resolving a class through its namespace
enum LazyClass {
    /// Source file found: the class joins the declared set
    Source(ClassEntry),
    /// Namespace without a directory: the entity is cached only
    Unlisted(ClassEntry),
}

/// Scope options and naming for one class
struct ClassScope<'a> {
    options: Option<&'a Options>,
    relative_name: String,
    separator: char,
}

impl CallableRepository {
    /// Create a repository with global default options and a merge policy
    pub fn new(defaults: Options, policy: MergePolicy) -> Self {
        Self {
            defaults,
            policy,
            state: RwLock::new(RepositoryState::default()),
        }
    }

    /// Global default options
    pub fn defaults(&self) -> &Options {
        &self.defaults
    }

    /// Merge policy
    pub fn policy(&self) -> &MergePolicy {
        &self.policy
    }

    /// Declare a class
    ///
    /// An `include` option names the class source file; its modification
    /// time becomes the class timestamp.
    pub fn declare_class(&self, name: &str, options: Options) -> Result<()> {
        let qualified = naming::normalize(name)
            .ok_or_else(|| SetupError::malformed(name, "not a valid class name"))?;
        let included = include_timestamp(&qualified, &options)?;

        let mut state = self.state.write();
        let (scope, discovered) = match state.classes.get(&qualified) {
            Some(existing) => (existing.scope.clone(), existing.timestamp),
            None => (None, 0),
        };

        state.classes.insert(
            qualified.clone(),
            ClassEntry {
                options,
                scope,
                timestamp: included.unwrap_or(discovered),
            },
        );
        state.invalidate();

        info!(class = %qualified, "Class declared");
        Ok(())
    }

    /// Declare a function
    pub fn declare_function(&self, name: &str, options: Options) -> Result<()> {
        let name = name.trim();
        if !scanner::is_identifier(name) {
            return Err(SetupError::malformed(name, "not a valid function name").into());
        }
        let timestamp = include_timestamp(name, &options)?.unwrap_or(0);

        let mut state = self.state.write();
        state
            .functions
            .insert(name.to_string(), FunctionEntry { options, timestamp });
        state.function_entities.remove(name);

        info!(function = %name, "Function declared");
        Ok(())
    }

    /// Declare a directory of class sources
    ///
    /// A `namespace` option makes this a namespace declaration backed by
    /// the directory.
    pub fn declare_directory(&self, path: &str, options: Options) -> Result<()> {
        if let Some(namespace) = options.get("namespace").and_then(Value::as_str) {
            let namespace = namespace.to_string();
            let mut options = options;
            options.remove("namespace");
            options.insert("directory".to_string(), Value::String(path.to_string()));
            return self.declare_namespace(&namespace, options);
        }

        let path = PathBuf::from(path.trim());
        scanner::check_directory(&path)?;

        let label = path.display().to_string();
        let separator = separator_option(&label, &options, DIRECTORY_SEPARATOR)?;
        let extensions = extensions_option(&label, &options)?;

        let mut state = self.state.write();
        state.directories.insert(
            path.clone(),
            DirectoryScope {
                options,
                separator,
                extensions,
            },
        );
        state.scanned = false;
        state.invalidate();

        info!(directory = %label, "Directory declared");
        Ok(())
    }

    /// Declare a namespace, optionally backed by a `directory` option
    pub fn declare_namespace(&self, namespace: &str, options: Options) -> Result<()> {
        let ns = naming::normalize(namespace)
            .ok_or_else(|| SetupError::malformed(namespace, "not a valid namespace"))?;

        let directory = match options.get("directory") {
            None | Some(Value::Null) => None,
            Some(Value::String(dir)) => {
                let dir = PathBuf::from(dir.trim());
                scanner::check_directory(&dir)?;
                Some(dir)
            }
            Some(_) => {
                return Err(SetupError::malformed(&ns, "'directory' must be a path").into());
            }
        };
        let separator = separator_option(&ns, &options, NAMESPACE_SEPARATOR)?;
        let extensions = extensions_option(&ns, &options)?;

        let mut state = self.state.write();
        if let Some(existing) = state.namespaces.get(&ns) {
            if existing.directory.is_some() && directory.is_some() && existing.directory != directory {
                return Err(SetupError::incompatible(
                    &ns,
                    "namespace already declared with another directory",
                )
                .into());
            }
        }

        state.namespaces.insert(
            ns.clone(),
            NamespaceScope {
                options,
                directory,
                separator,
                extensions,
            },
        );
        state.scanned = false;
        state.invalidate();

        info!(namespace = %ns, "Namespace declared");
        Ok(())
    }

    /// Scan declared directories, once
    ///
    /// Anonymous directories are scanned at the top level, namespace
    /// directories recursively. Declaring a directory or namespace after a
    /// scan makes the next call scan again.
    pub fn scan_if_needed(&self) -> Result<()> {
        if self.state.read().scanned {
            return Ok(());
        }
        self.state.write().scan()
    }

    /// Resolve a class by qualified name
    ///
    /// Falls back to namespace prefix matching, then to scanning.
    pub fn resolve(&self, name: &str) -> Result<Arc<CallableEntity>> {
        let qualified =
            naming::normalize(name).ok_or_else(|| SetupError::UnknownCallable(name.to_string()))?;

        if let Some(entity) = self.state.read().entities.get(&qualified) {
            return Ok(Arc::clone(entity));
        }

        let mut state = self.state.write();
        if !state.classes.contains_key(&qualified) {
            let lazy = state.lazy_entry(&qualified);
            match lazy {
                Some(LazyClass::Source(entry)) => {
                    state.classes.insert(qualified.clone(), entry);
                }
                // No source directory to check against: cached, never listed
                Some(LazyClass::Unlisted(entry)) => {
                    let entity = Arc::new(self.build_class(&state, &qualified, &entry)?);
                    state.entities.insert(qualified.clone(), Arc::clone(&entity));
                    debug!(class = %qualified, "Class resolved from namespace");
                    return Ok(entity);
                }
                None => {
                    state.scan()?;
                    if !state.classes.contains_key(&qualified) {
                        return Err(SetupError::UnknownCallable(qualified).into());
                    }
                }
            }
        }

        let entry = state
            .classes
            .get(&qualified)
            .ok_or_else(|| SetupError::UnknownCallable(qualified.clone()))?;
        let entity = Arc::new(self.build_class(&state, &qualified, entry)?);
        state.entities.insert(qualified.clone(), Arc::clone(&entity));

        debug!(
            class = %qualified,
            external = %entity.external_name(),
            methods = entity.configured_methods().count(),
            "Class resolved"
        );

        Ok(entity)
    }

    /// Resolve a function by name
    pub fn resolve_function(&self, name: &str) -> Result<Arc<CallableEntity>> {
        if let Some(entity) = self.state.read().function_entities.get(name) {
            return Ok(Arc::clone(entity));
        }

        let mut state = self.state.write();
        let entry = state
            .functions
            .get(name)
            .ok_or_else(|| SetupError::UnknownCallable(name.to_string()))?;

        let external = entry
            .options
            .get("alias")
            .and_then(Value::as_str)
            .unwrap_or(name)
            .to_string();
        let identity = EntityIdentity {
            qualified_name: name.to_string(),
            external_name: external,
            kind: CallableKind::Function,
            separator: NAMESPACE_SEPARATOR,
            timestamp: entry.timestamp,
        };

        let entity = Arc::new(build_entity(
            identity,
            &[&self.defaults, &entry.options],
            &self.policy,
        )?);
        state
            .function_entities
            .insert(name.to_string(), Arc::clone(&entity));

        Ok(entity)
    }

    /// Map a client-facing class name back to its qualified name
    pub fn resolve_external(&self, name: &str) -> Result<Option<String>> {
        if let Some(found) = self.state.read().find_external(name) {
            return Ok(Some(found));
        }

        self.scan_if_needed()?;
        Ok(self.state.read().find_external(name))
    }

    /// Map a client-facing function name (its alias, if any) to its name
    pub fn resolve_function_external(&self, name: &str) -> Option<String> {
        let state = self.state.read();
        state
            .functions
            .iter()
            .find(|(fn_name, entry)| {
                match entry.options.get("alias").and_then(Value::as_str) {
                    Some(alias) => alias == name,
                    None => fn_name.as_str() == name,
                }
            })
            .map(|(fn_name, _)| fn_name.clone())
    }

    /// Check if a class is declared or already discovered, without scanning
    pub fn contains_class(&self, name: &str) -> bool {
        naming::normalize(name).is_some_and(|qualified| self.state.read().classes.contains_key(&qualified))
    }

    /// Check if a function is declared
    pub fn contains_function(&self, name: &str) -> bool {
        self.state.read().functions.contains_key(name.trim())
    }

    /// Qualified names of every known class, sorted
    pub fn class_names(&self) -> Result<Vec<String>> {
        self.scan_if_needed()?;
        Ok(self.state.read().classes.keys().cloned().collect())
    }

    /// Names of every declared function, sorted
    pub fn function_names(&self) -> Vec<String> {
        self.state.read().functions.keys().cloned().collect()
    }

    /// Declaration counts, without scanning
    pub fn stats(&self) -> RepositoryStats {
        let state = self.state.read();
        RepositoryStats {
            classes: state.classes.len(),
            functions: state.functions.len(),
            directories: state.directories.len(),
            namespaces: state.namespaces.len(),
        }
    }

    /// Content hash of everything that shapes generated client code
    ///
    /// Covers every class with its timestamp, every function, and every
    /// directory and namespace separator, in sorted order.
    pub fn invalidation_hash(&self) -> Result<String> {
        self.scan_if_needed()?;

        let state = self.state.read();
        let mut hasher = Sha256::new();

        for (name, entry) in &state.classes {
            hasher.update(format!("class:{name}:{}\n", entry.timestamp).as_bytes());
        }
        for (name, entry) in &state.functions {
            hasher.update(format!("function:{name}:{}\n", entry.timestamp).as_bytes());
        }
        for (path, scope) in &state.directories {
            hasher.update(format!("directory:{}:{}\n", path.display(), scope.separator).as_bytes());
        }
        for (ns, scope) in &state.namespaces {
            hasher.update(format!("namespace:{ns}:{}\n", scope.separator).as_bytes());
        }

        Ok(format!("{:x}", hasher.finalize()))
    }

    fn build_class(
        &self,
        state: &RepositoryState,
        qualified: &str,
        entry: &ClassEntry,
    ) -> Result<CallableEntity> {
        let scope = state.class_scope(qualified, entry);

        let mut scopes: Vec<&Options> = vec![&self.defaults];
        if let Some(options) = scope.options {
            scopes.push(options);
            scopes.extend(class_overrides(qualified, options, &scope)?);
        }
        scopes.push(&entry.options);

        let identity = EntityIdentity {
            qualified_name: qualified.to_string(),
            external_name: naming::external_name(qualified, scope.separator),
            kind: CallableKind::Class,
            separator: scope.separator,
            timestamp: entry.timestamp,
        };

        build_entity(identity, &scopes, &self.policy)
    }
}

impl Default for CallableRepository {
    fn default() -> Self {
        Self::new(Options::new(), MergePolicy::new())
    }
}

impl RepositoryState {
    fn invalidate(&mut self) {
        self.entities.clear();
    }

    /// Longest declared namespace containing a qualified name
    fn namespace_of(&self, qualified: &str) -> Option<&str> {
        self.namespaces
            .keys()
            .filter(|ns| {
                qualified
                    .strip_prefix(ns.as_str())
                    .is_some_and(|rest| rest.starts_with(PATH_SEPARATOR))
            })
            .max_by_key(|ns| ns.len())
            .map(String::as_str)
    }

    /// Class under a declared namespace, found without scanning
    ///
    /// A namespace with a directory only yields classes whose source file
    /// exists there.
    fn lazy_entry(&self, qualified: &str) -> Option<LazyClass> {
        let ns = self.namespace_of(qualified)?;
        let scope = self.namespaces.get(ns)?;

        let entry = |timestamp| ClassEntry {
            options: Options::new(),
            scope: Some(ScopeRef::Namespace(ns.to_string())),
            timestamp,
        };

        if scope.directory.is_none() {
            return Some(LazyClass::Unlisted(entry(0)));
        }

        let path = source_file(scope, ns, qualified)?;
        let timestamp = scanner::file_timestamp(&path).ok()?;
        debug!(class = %qualified, namespace = %ns, "Class resolved from namespace");
        Some(LazyClass::Source(entry(timestamp)))
    }

    fn scan(&mut self) -> Result<()> {
        if self.scanned {
            return Ok(());
        }

        let mut found = Vec::new();

        for (path, scope) in &self.directories {
            for file in scanner::scan_directory(path, false, &scope.extensions)? {
                found.push((
                    file.class_name().to_string(),
                    ScopeRef::Directory(path.clone()),
                    file.modified,
                ));
            }
        }

        for (ns, scope) in &self.namespaces {
            let Some(dir) = &scope.directory else {
                continue;
            };
            for file in scanner::scan_directory(dir, true, &scope.extensions)? {
                let qualified = format!("{ns}{PATH_SEPARATOR}{}", file.segments.join(PATH_SEPARATOR));
                found.push((qualified, ScopeRef::Namespace(ns.clone()), file.modified));
            }
        }

        let count = found.len();
        for (qualified, scope, modified) in found {
            self.discover(qualified, scope, modified);
        }

        self.scanned = true;
        self.invalidate();

        info!(classes = count, "Directories scanned");
        Ok(())
    }

    fn discover(&mut self, qualified: String, scope: ScopeRef, modified: u64) {
        debug!(class = %qualified, "Class discovered");

        match self.classes.get_mut(&qualified) {
            Some(entry) => {
                if entry.scope.is_none() {
                    entry.scope = Some(scope);
                }
                if !entry.options.contains_key("include") {
                    entry.timestamp = modified;
                }
            }
            None => {
                self.classes.insert(
                    qualified,
                    ClassEntry {
                        options: Options::new(),
                        scope: Some(scope),
                        timestamp: modified,
                    },
                );
            }
        }
    }

    fn class_scope<'a>(&'a self, qualified: &str, entry: &ClassEntry) -> ClassScope<'a> {
        let namespace = match &entry.scope {
            Some(ScopeRef::Directory(path)) => {
                if let Some(dir) = self.directories.get(path) {
                    return ClassScope {
                        options: Some(&dir.options),
                        relative_name: qualified.to_string(),
                        separator: dir.separator,
                    };
                }
                None
            }
            Some(ScopeRef::Namespace(ns)) => Some(ns.clone()),
            None => self.namespace_of(qualified).map(str::to_string),
        };

        match namespace.and_then(|ns| self.namespaces.get_key_value(&ns)) {
            Some((ns, scope)) => ClassScope {
                options: Some(&scope.options),
                relative_name: qualified
                    .strip_prefix(ns.as_str())
                    .and_then(|rest| rest.strip_prefix(PATH_SEPARATOR))
                    .unwrap_or(qualified)
                    .to_string(),
                separator: scope.separator,
            },
            None => ClassScope {
                options: None,
                relative_name: qualified.to_string(),
                separator: NAMESPACE_SEPARATOR,
            },
        }
    }

    fn find_external(&self, name: &str) -> Option<String> {
        if self.classes.contains_key(name) {
            return Some(name.to_string());
        }

        let known = self.classes.iter().find(|(qualified, entry)| {
            let separator = self.class_scope(qualified, entry).separator;
            naming::external_name(qualified, separator) == name
        });
        if let Some((qualified, _)) = known {
            return Some(qualified.clone());
        }

        let mut namespaces: Vec<_> = self.namespaces.iter().collect();
        namespaces.sort_by_key(|(ns, _)| std::cmp::Reverse(ns.len()));
        namespaces
            .into_iter()
            .find_map(|(ns, scope)| naming::qualify_external(ns, scope.separator, name))
    }
}

/// `classes["*"]`, then `classes[prefix]` for matching prefixes, shortest first
fn class_overrides<'a>(
    qualified: &str,
    scope_options: &'a Options,
    scope: &ClassScope<'_>,
) -> Result<Vec<&'a Options>> {
    let Some(classes) = scope_options.get("classes") else {
        return Ok(Vec::new());
    };
    let Value::Object(classes) = classes else {
        return Err(SetupError::malformed(qualified, "'classes' must be a map").into());
    };

    let relative = scope.relative_name.as_str();
    let relative_external = relative.replace(PATH_SEPARATOR, &scope.separator.to_string());

    let mut matching: Vec<(&str, &'a Options)> = Vec::new();
    for (key, value) in classes {
        let applies = key == WILDCARD
            || relative.starts_with(key.as_str())
            || relative_external.starts_with(key.as_str());
        if !applies {
            continue;
        }

        match value {
            Value::Object(options) => matching.push((key.as_str(), options)),
            _ => {
                return Err(SetupError::malformed(
                    qualified,
                    format!("class options for '{key}' must be a map"),
                )
                .into());
            }
        }
    }

    matching.sort_by_key(|(key, _)| if *key == WILDCARD { 0 } else { key.len() + 1 });
    Ok(matching.into_iter().map(|(_, options)| options).collect())
}

fn source_file(scope: &NamespaceScope, ns: &str, qualified: &str) -> Option<PathBuf> {
    let dir = scope.directory.as_ref()?;
    let relative = qualified.strip_prefix(ns)?.strip_prefix(PATH_SEPARATOR)?;
    let base: PathBuf = dir.join(relative.split(PATH_SEPARATOR).collect::<PathBuf>());

    scope
        .extensions
        .iter()
        .map(|ext| base.with_extension(ext))
        .find(|path| path.is_file())
}

fn include_timestamp(name: &str, options: &Options) -> Result<Option<u64>> {
    match options.get("include") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(path)) => scanner::file_timestamp(Path::new(path))
            .map(Some)
            .map_err(|e| SetupError::malformed(name, format!("cannot read include '{path}': {e}")).into()),
        Some(_) => Err(SetupError::malformed(name, "'include' must be a path").into()),
    }
}

fn separator_option(name: &str, options: &Options, default: char) -> Result<char> {
    match options.get("separator") {
        None | Some(Value::Null) => Ok(default),
        Some(Value::String(s)) if s == "." => Ok('.'),
        Some(Value::String(s)) if s == "_" => Ok('_'),
        Some(other) => Err(SetupError::malformed(
            name,
            format!("separator must be \".\" or \"_\", got {other}"),
        )
        .into()),
    }
}

fn extensions_option(name: &str, options: &Options) -> Result<Vec<String>> {
    match options.get("extensions") {
        None | Some(Value::Null) => Ok(DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|e| e.trim_start_matches('.').to_string())
                    .ok_or_else(|| SetupError::malformed(name, "extensions must be strings").into())
            })
            .collect(),
        Some(_) => Err(SetupError::malformed(name, "'extensions' must be a list").into()),
    }
}
