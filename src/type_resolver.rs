//! Locating type declarations across the modules of one or more crates.
//!
//! Packages are modules, addressed by canonical paths such as `shop::models`.
//! Declarations are read lazily: the first lookup in a module parses the file
//! that defines it, and the result is cached for the rest of the run.

use crate::error::{Error, Result};
use crate::parser::AstParser;
use crate::scanner::FileScanner;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A crate whose modules can be searched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrateRoot {
    pub name: String,
    /// Directory holding `lib.rs` / `main.rs`
    pub src_dir: PathBuf,
}

impl CrateRoot {
    pub fn new(name: &str, src_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: sanitize_crate_name(name),
            src_dir: src_dir.into(),
        }
    }

    /// Derive the crate from a directory: either a project containing `src/`,
    /// a `src/` directory itself, or a bare directory of modules.
    pub fn from_path(root: &Path) -> Self {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let (src_dir, name_dir) = if root.join("src").is_dir() {
            (root.join("src"), root.clone())
        } else if root.file_name().is_some_and(|n| n == "src") {
            let parent = root.parent().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
            (root.clone(), parent)
        } else {
            (root.clone(), root.clone())
        };
        let name = name_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "crate".to_string());
        Self::new(&name, src_dir)
    }
}

fn sanitize_crate_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Module-path segments of a file relative to its crate's source directory.
///
/// `a/b.rs` and `a/b/mod.rs` both give `["a", "b"]`; `lib.rs` and `main.rs` give `[]`.
pub fn module_segments(file: &Path, src_dir: &Path) -> Vec<String> {
    let relative = file.strip_prefix(src_dir).unwrap_or(file);
    let mut segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if let Some(last) = segments.last_mut() {
        if let Some(stem) = last.strip_suffix(".rs") {
            *last = stem.to_string();
        }
    }
    if segments.last().is_some_and(|s| s == "mod") {
        segments.pop();
    }
    if segments.len() == 1 && (segments[0] == "lib" || segments[0] == "main") {
        segments.clear();
    }
    segments
}

/// Last segment of a canonical module path.
pub fn short_package(package: &str) -> &str {
    package.rsplit("::").next().unwrap_or(package)
}

/// The module an item lives in, with the names its `use` declarations bring in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileScope {
    pub file: PathBuf,
    pub crate_name: String,
    /// Canonical module path, e.g. `shop::models`
    pub module_path: String,
    /// Imported name → path as written, e.g. `User` → `crate::models::User`
    pub imports: HashMap<String, String>,
    /// Paths imported with `::*`
    pub globs: Vec<String>,
}

impl FileScope {
    pub fn new(file: &Path, crate_name: &str, module_path: &str, items: &[syn::Item]) -> Self {
        let mut scope = Self {
            file: file.to_path_buf(),
            crate_name: crate_name.to_string(),
            module_path: module_path.to_string(),
            imports: HashMap::new(),
            globs: Vec::new(),
        };
        for item in items {
            if let syn::Item::Use(u) = item {
                scope.add_use_tree(&u.tree, Vec::new());
            }
        }
        scope
    }

    fn add_use_tree(&mut self, tree: &syn::UseTree, mut prefix: Vec<String>) {
        match tree {
            syn::UseTree::Path(p) => {
                prefix.push(p.ident.to_string());
                self.add_use_tree(&p.tree, prefix);
            }
            syn::UseTree::Name(n) => {
                let ident = n.ident.to_string();
                if ident == "self" {
                    if let Some(last) = prefix.last().cloned() {
                        self.imports.insert(last, prefix.join("::"));
                    }
                } else {
                    prefix.push(ident.clone());
                    self.imports.insert(ident, prefix.join("::"));
                }
            }
            syn::UseTree::Rename(r) => {
                let ident = r.ident.to_string();
                if ident != "self" {
                    prefix.push(ident);
                }
                self.imports.insert(r.rename.to_string(), prefix.join("::"));
            }
            syn::UseTree::Glob(_) => self.globs.push(prefix.join("::")),
            syn::UseTree::Group(g) => {
                for t in &g.items {
                    self.add_use_tree(t, prefix.clone());
                }
            }
        }
    }

    pub fn short_package(&self) -> &str {
        short_package(&self.module_path)
    }
}

/// A type-level declaration the resolver can return.
#[derive(Debug, Clone)]
pub enum DeclItem {
    Struct(syn::ItemStruct),
    Enum(syn::ItemEnum),
    Alias(syn::ItemType),
    Union(syn::ItemUnion),
}

impl DeclItem {
    pub fn ident(&self) -> &syn::Ident {
        match self {
            DeclItem::Struct(s) => &s.ident,
            DeclItem::Enum(e) => &e.ident,
            DeclItem::Alias(a) => &a.ident,
            DeclItem::Union(u) => &u.ident,
        }
    }

    /// Short description for diagnostics, e.g. `enum Status`.
    pub fn describe(&self) -> String {
        let kind = match self {
            DeclItem::Struct(s) => match s.fields {
                syn::Fields::Unnamed(_) => "tuple struct",
                _ => "struct",
            },
            DeclItem::Enum(_) => "enum",
            DeclItem::Alias(_) => "type alias",
            DeclItem::Union(_) => "union",
        };
        format!("{} {}", kind, self.ident())
    }

    pub fn attrs(&self) -> &[syn::Attribute] {
        match self {
            DeclItem::Struct(s) => &s.attrs,
            DeclItem::Enum(e) => &e.attrs,
            DeclItem::Alias(a) => &a.attrs,
            DeclItem::Union(u) => &u.attrs,
        }
    }

    pub fn generics(&self) -> &syn::Generics {
        match self {
            DeclItem::Struct(s) => &s.generics,
            DeclItem::Enum(e) => &e.generics,
            DeclItem::Alias(a) => &a.generics,
            DeclItem::Union(u) => &u.generics,
        }
    }
}

/// A declaration together with the scope it was declared in.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub item: DeclItem,
    pub scope: Rc<FileScope>,
}

/// Result of [`TypeResolver::resolve_type`].
#[derive(Debug, Clone)]
pub struct ResolvedType {
    pub declaration: Declaration,
    /// File the declaration is in
    pub file: PathBuf,
    /// Canonical module path of the declaring module
    pub package: String,
}

/// Type resolver - finds declarations by name across the module tree
pub struct TypeResolver {
    crates: Vec<CrateRoot>,
    /// Canonical module path → file defining it
    module_files: HashMap<String, PathBuf>,
    /// Canonical module path → declarations, filled lazily
    declarations: HashMap<String, Rc<Vec<Declaration>>>,
    loaded_files: HashSet<PathBuf>,
    package_loads: usize,
}

impl TypeResolver {
    /// Index the module files of every crate. Nothing is parsed yet.
    pub fn new(crates: Vec<CrateRoot>) -> Result<Self> {
        debug!("Initializing TypeResolver with {} crates", crates.len());
        let mut module_files = HashMap::new();

        for krate in &crates {
            let scan = FileScanner::new(krate.src_dir.clone())
                .scan()
                .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
            for file in scan.rust_files {
                let segments = module_segments(&file, &krate.src_dir);
                let module = canonical(&krate.name, &segments);
                let is_main = file.file_name().is_some_and(|n| n == "main.rs") && segments.is_empty();
                if is_main && module_files.contains_key(&module) {
                    continue;
                }
                debug!("Indexed module {} -> {}", module, file.display());
                module_files.insert(module, file);
            }
        }

        Ok(Self {
            crates,
            module_files,
            declarations: HashMap::new(),
            loaded_files: HashSet::new(),
            package_loads: 0,
        })
    }

    pub fn crates(&self) -> &[CrateRoot] {
        &self.crates
    }

    /// Number of source files parsed for declarations so far.
    pub fn package_loads(&self) -> usize {
        self.package_loads
    }

    /// Crate and canonical module path of a file under one of the crate roots.
    pub fn locate_file(&self, file: &Path) -> Option<(String, String)> {
        self.crates
            .iter()
            .filter(|c| file.starts_with(&c.src_dir))
            .max_by_key(|c| c.src_dir.components().count())
            .map(|c| {
                let segments = module_segments(file, &c.src_dir);
                (c.name.clone(), canonical(&c.name, &segments))
            })
    }

    /// Find the declaration of `name` in the package `package_spec`, as seen from `current`.
    ///
    /// An empty `package_spec` means the module of `current`, then its imports.
    pub fn resolve_type(
        &mut self,
        current: Option<&FileScope>,
        package_spec: &str,
        name: &str,
    ) -> Result<ResolvedType> {
        debug!("Resolving type {:?} in package {:?}", name, package_spec);

        if package_spec.is_empty() {
            let cur = current.ok_or_else(|| Error::PackageResolution {
                package: String::new(),
                reason: "no current module to resolve a bare name in".to_string(),
            })?;
            if let Some(found) = self.find_in(&cur.module_path, name)? {
                return Ok(found);
            }
            if let Some(target) = cur.imports.get(name).cloned() {
                if let Some((pkg, real)) = target.rsplit_once("::") {
                    debug!("{} is imported as {}", name, target);
                    return self.resolve_type(current, pkg, real);
                }
            }
            for glob in cur.globs.clone() {
                if let Ok(pkg) = self.resolve_package(current, &glob) {
                    if let Some(found) = self.find_in(&pkg, name)? {
                        return Ok(found);
                    }
                }
            }
            return Err(Error::TypeNotFound {
                package: cur.module_path.clone(),
                name: name.to_string(),
            });
        }

        let package = self.resolve_package(current, package_spec)?;
        self.find_in(&package, name)?.ok_or_else(|| Error::TypeNotFound {
            package,
            name: name.to_string(),
        })
    }

    /// Turn a package spec into a canonical module path.
    ///
    /// Tries the spec as a path first, then through the current module's imports,
    /// and finally as the unique module with that last segment.
    pub fn resolve_package(&mut self, current: Option<&FileScope>, spec: &str) -> Result<String> {
        let segments: Vec<String> = if spec.contains("::") {
            spec.split("::").map(str::to_string).collect()
        } else {
            spec.split('.').map(str::to_string).collect()
        };
        let segments: Vec<String> = segments.into_iter().filter(|s| !s.is_empty()).collect();

        if segments.is_empty() {
            return current.map(|c| c.module_path.clone()).ok_or_else(|| {
                Error::PackageResolution {
                    package: spec.to_string(),
                    reason: "empty package".to_string(),
                }
            });
        }

        if let Some(p) = self.direct_package(current, &segments)? {
            return Ok(p);
        }

        if let Some(target) = current.and_then(|c| c.imports.get(&segments[0])) {
            let mut full: Vec<String> = target.split("::").map(str::to_string).collect();
            full.extend(segments[1..].iter().cloned());
            debug!("Package {} resolved through import {}", spec, target);
            if let Some(p) = self.direct_package(current, &full)? {
                return Ok(p);
            }
        }

        if segments.len() == 1 {
            let mut candidates: Vec<String> = self
                .module_files
                .keys()
                .chain(self.declarations.keys())
                .filter(|m| short_package(m) == segments[0])
                .cloned()
                .collect();
            candidates.sort();
            candidates.dedup();
            if candidates.len() == 1 {
                return Ok(candidates.remove(0));
            }
            if candidates.len() > 1 {
                warn!("Package {} is ambiguous: {:?}", spec, candidates);
            }
        }

        Err(Error::PackageResolution {
            package: spec.to_string(),
            reason: "no module matches".to_string(),
        })
    }

    fn direct_package(
        &mut self,
        current: Option<&FileScope>,
        segments: &[String],
    ) -> Result<Option<String>> {
        let mut candidates = Vec::new();
        let first = segments[0].as_str();

        match first {
            "crate" => {
                let krate = current
                    .map(|c| c.crate_name.clone())
                    .or_else(|| self.crates.first().map(|c| c.name.clone()));
                if let Some(k) = krate {
                    candidates.push(canonical(&k, &segments[1..]));
                }
            }
            "self" => {
                if let Some(c) = current {
                    candidates.push(join(&c.module_path, &segments[1..]));
                }
            }
            "super" => {
                if let Some(c) = current {
                    let ups = segments.iter().take_while(|s| *s == "super").count();
                    let mut base: Vec<&str> = c.module_path.split("::").collect();
                    if ups < base.len() {
                        base.truncate(base.len() - ups);
                        candidates.push(join(&base.join("::"), &segments[ups..]));
                    }
                }
            }
            _ => {
                if self.crates.iter().any(|c| c.name == first) {
                    candidates.push(segments.join("::"));
                }
                if let Some(c) = current {
                    candidates.push(join(&c.module_path, segments));
                }
            }
        }

        for candidate in candidates {
            if self.locate(&candidate)?.is_some() {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    fn find_in(&mut self, package: &str, name: &str) -> Result<Option<ResolvedType>> {
        let decls = self.locate(package)?.ok_or_else(|| Error::PackageResolution {
            package: package.to_string(),
            reason: "module not found".to_string(),
        })?;
        Ok(decls
            .iter()
            .find(|d| d.item.ident() == name)
            .map(|d| ResolvedType {
                declaration: d.clone(),
                file: d.scope.file.clone(),
                package: package.to_string(),
            }))
    }

    /// Declarations of a module, parsing the file that holds it on first use.
    fn locate(&mut self, package: &str) -> Result<Option<Rc<Vec<Declaration>>>> {
        if let Some(decls) = self.declarations.get(package) {
            return Ok(Some(Rc::clone(decls)));
        }

        // The module is either a file of its own or inline in its nearest ancestor file.
        let mut ancestor = package;
        loop {
            if let Some(file) = self.module_files.get(ancestor).cloned() {
                if self.loaded_files.contains(&file) {
                    return Ok(None);
                }
                self.load_file(&file, ancestor)?;
                return Ok(self.declarations.get(package).cloned());
            }
            match ancestor.rsplit_once("::") {
                Some((parent, _)) => ancestor = parent,
                None => return Ok(None),
            }
        }
    }

    fn load_file(&mut self, file: &Path, module: &str) -> Result<()> {
        debug!("Loading declarations of {} from {}", module, file.display());
        let parsed = AstParser::parse_file(file).map_err(|e| Error::Parse {
            file: file.to_path_buf(),
            message: format!("{:#}", e),
        })?;
        self.loaded_files.insert(file.to_path_buf());
        self.package_loads += 1;

        let crate_name = module.split("::").next().unwrap_or(module).to_string();
        self.register_module(file, &crate_name, module, &parsed.syntax_tree.items);
        Ok(())
    }

    fn register_module(&mut self, file: &Path, crate_name: &str, module: &str, items: &[syn::Item]) {
        let scope = Rc::new(FileScope::new(file, crate_name, module, items));
        let mut decls = Vec::new();

        for item in items {
            let decl = match item {
                syn::Item::Struct(s) => DeclItem::Struct(s.clone()),
                syn::Item::Enum(e) => DeclItem::Enum(e.clone()),
                syn::Item::Type(t) => DeclItem::Alias(t.clone()),
                syn::Item::Union(u) => DeclItem::Union(u.clone()),
                syn::Item::Mod(m) => {
                    if let Some((_, inner)) = &m.content {
                        let child = format!("{}::{}", module, m.ident);
                        self.register_module(file, crate_name, &child, inner);
                    }
                    continue;
                }
                _ => continue,
            };
            decls.push(Declaration {
                item: decl,
                scope: Rc::clone(&scope),
            });
        }

        debug!("Module {} declares {} types", module, decls.len());
        self.declarations.insert(module.to_string(), Rc::new(decls));
    }
}

fn canonical(crate_name: &str, segments: &[String]) -> String {
    join(crate_name, segments)
}

fn join(base: &str, rest: &[String]) -> String {
    let mut path = base.to_string();
    for s in rest {
        path.push_str("::");
        path.push_str(s);
    }
    path
}
