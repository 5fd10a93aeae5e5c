//! Pipeline driver: scan source roots, run the directive parser over every
//! doc comment, and gather the result into one [`Program`].

use crate::config::Config;
use crate::docparse;
use crate::error::{Error, ErrorList, LocatedError, Result};
use crate::parser::{doc_comment, AstParser};
use crate::program::{Endpoint, Program};
use crate::scanner::{relative_path, FileScanner};
use crate::schema_generator::SchemaGenerator;
use crate::type_resolver::{CrateRoot, FileScope, TypeResolver};
use log::{debug, info};
use std::path::{Path, PathBuf};
use syn::visit::Visit;
use thiserror::Error;

/// State of one run. Build a fresh one for every run; nothing is shared.
pub struct Session {
    pub config: Config,
    pub program: Program,
    pub generator: SchemaGenerator,
}

impl Session {
    pub fn new(config: Config, crates: Vec<CrateRoot>) -> Result<Self> {
        let resolver = TypeResolver::new(crates)?;
        let generator = SchemaGenerator::new(resolver, &config);
        Ok(Self {
            config,
            program: Program::new(),
            generator,
        })
    }

    pub fn into_program(self) -> Program {
        self.program
    }
}

/// Why a run produced no program.
#[derive(Debug, Error)]
pub enum CollectError {
    /// One or more comment blocks were rejected; the rest of the tree was still scanned
    #[error("{0}")]
    Blocks(ErrorList),

    /// A source file or root could not be read or parsed
    #[error(transparent)]
    Fatal(#[from] Error),
}

/// Collect the endpoints and referenced types documented under `roots`.
///
/// Per-comment errors are gathered into [`CollectError::Blocks`], with paths
/// relative to the root they were found under. I/O and syntax errors in a
/// source file stop the run at once.
pub fn collect(roots: &[PathBuf], config: &Config) -> std::result::Result<Program, CollectError> {
    let roots = roots
        .iter()
        .map(|r| r.canonicalize())
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(Error::Io)?;
    let crates: Vec<CrateRoot> = roots.iter().map(|r| CrateRoot::from_path(r)).collect();
    for krate in &crates {
        debug!("Crate {} at {}", krate.name, krate.src_dir.display());
    }

    let mut session = Session::new(config.clone(), crates)?;
    let mut errors = ErrorList::default();

    for root in &roots {
        let scan = FileScanner::new(root.clone())
            .scan()
            .map_err(|e| Error::Io(std::io::Error::other(format!("{:#}", e))))?;
        info!("Scanning {} files under {}", scan.rust_files.len(), root.display());

        for file in &scan.rust_files {
            let outcome = collect_file(&mut session, file)?;
            session.program.endpoints.extend(outcome.endpoints);
            for mut err in outcome.errors {
                err.path = relative_path(root, &err.path);
                errors.push(err);
            }
        }
    }

    if !errors.is_empty() {
        return Err(CollectError::Blocks(errors));
    }

    let mut program = session.into_program();
    program.sort_endpoints();
    info!(
        "Collected {} endpoints and {} types",
        program.endpoints.len(),
        program.references.len()
    );
    Ok(program)
}

struct FileOutcome {
    endpoints: Vec<Endpoint>,
    errors: Vec<LocatedError>,
}

fn collect_file(session: &mut Session, file: &Path) -> Result<FileOutcome> {
    let parsed = AstParser::parse_file(file).map_err(|e| Error::Parse {
        file: file.to_path_buf(),
        message: format!("{:#}", e),
    })?;

    let scope = session
        .generator
        .type_resolver()
        .locate_file(file)
        .map(|(krate, module)| FileScope::new(file, &krate, &module, &parsed.syntax_tree.items));
    if scope.is_none() {
        debug!("{} is outside every crate source directory", file.display());
    }

    let mut visitor = CommentVisitor {
        session,
        file,
        scopes: scope.into_iter().collect(),
        endpoints: Vec::new(),
        errors: Vec::new(),
        fatal: None,
    };
    visitor.visit_doc(&parsed.syntax_tree.attrs);
    visitor.visit_file(&parsed.syntax_tree);

    if let Some(err) = visitor.fatal {
        return Err(err);
    }
    Ok(FileOutcome {
        endpoints: visitor.endpoints,
        errors: visitor.errors,
    })
}

/// Walks the items of one file, keeping track of the enclosing inline module.
struct CommentVisitor<'a> {
    session: &'a mut Session,
    file: &'a Path,
    scopes: Vec<FileScope>,
    endpoints: Vec<Endpoint>,
    errors: Vec<LocatedError>,
    fatal: Option<Error>,
}

impl CommentVisitor<'_> {
    fn visit_doc(&mut self, attrs: &[syn::Attribute]) {
        if self.fatal.is_some() {
            return;
        }
        let Some(comment) = doc_comment(attrs) else {
            return;
        };
        match docparse::parse_comment(self.session, &comment, self.file, self.scopes.last()) {
            Ok(endpoints) => self.endpoints.extend(endpoints),
            Err(err) if err.error.is_fatal() => self.fatal = Some(err.error),
            Err(err) => {
                debug!("Rejected comment block: {}", err);
                self.errors.push(err);
            }
        }
    }
}

impl<'ast> Visit<'ast> for CommentVisitor<'_> {
    fn visit_file(&mut self, node: &'ast syn::File) {
        for item in &node.items {
            self.visit_item(item);
        }
    }

    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        self.visit_doc(&node.attrs);
    }

    fn visit_item_struct(&mut self, node: &'ast syn::ItemStruct) {
        self.visit_doc(&node.attrs);
    }

    fn visit_item_enum(&mut self, node: &'ast syn::ItemEnum) {
        self.visit_doc(&node.attrs);
    }

    fn visit_item_const(&mut self, node: &'ast syn::ItemConst) {
        self.visit_doc(&node.attrs);
    }

    fn visit_item_static(&mut self, node: &'ast syn::ItemStatic) {
        self.visit_doc(&node.attrs);
    }

    fn visit_item_impl(&mut self, node: &'ast syn::ItemImpl) {
        for item in &node.items {
            self.visit_impl_item(item);
        }
    }

    fn visit_impl_item_fn(&mut self, node: &'ast syn::ImplItemFn) {
        self.visit_doc(&node.attrs);
    }

    fn visit_item_trait(&mut self, node: &'ast syn::ItemTrait) {
        for item in &node.items {
            self.visit_trait_item(item);
        }
    }

    fn visit_trait_item_fn(&mut self, node: &'ast syn::TraitItemFn) {
        self.visit_doc(&node.attrs);
    }

    fn visit_item_mod(&mut self, node: &'ast syn::ItemMod) {
        self.visit_doc(&node.attrs);
        let Some((_, items)) = &node.content else {
            return;
        };

        let child = self.scopes.last().map(|parent| {
            let module = format!("{}::{}", parent.module_path, node.ident);
            FileScope::new(self.file, &parent.crate_name, &module, items)
        });
        let pushed = child.is_some();
        self.scopes.extend(child);
        for item in items {
            self.visit_item(item);
        }
        if pushed {
            self.scopes.pop();
        }
    }
}
