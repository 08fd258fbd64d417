//! Source-file grouping: the set of files reachable from an entry file and
//! the module references between them.
//!
//! Files are discovered breadth-first. Each `module`/`using` path is handed to
//! the injected resolver; failures become diagnostics on the path string and
//! the grouping stays usable. A depth-first pass over the discovered graph
//! then marks every back-edge as a cycle, so the resolved edges always form a
//! DAG.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use super::reference::{ModuleReference, ReferenceFailure, ResolutionError, ResolutionStatus};
use super::resolver::{ModuleResolver, SourceTextProvider};
use crate::base::{FileId, SourceUri, TextRange};
use crate::hir::{Diagnostic, DiagnosticCategory, codes};
use crate::syntax::{ReferenceSite, SyntaxFile};

/// The compilation was cancelled before it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("compilation was cancelled")]
pub struct Cancelled;

/// One `module` or `using` reference between two files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEdge {
    pub from: FileId,
    pub site: ReferenceSite,
    /// `None` when the path was missing, interpolated or malformed
    pub reference: Option<ModuleReference>,
    pub status: ResolutionStatus,
}

/// Files reachable from an entry file, indexed by [`FileId`].
#[derive(Debug, Clone)]
pub struct SourceFileGrouping {
    entry: FileId,
    files: Vec<Arc<SyntaxFile>>,
    by_uri: FxHashMap<SourceUri, FileId>,
    edges: Vec<ModuleEdge>,
    diagnostics: Vec<Diagnostic>,
    /// Files ordered dependencies-first along resolved edges
    post_order: Vec<FileId>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    OnPath,
    Done,
}

impl SourceFileGrouping {
    /// Discover every file reachable from `entry`.
    ///
    /// `cancel` is checked before each resolver call. Parsing a file always
    /// runs to completion once started.
    pub fn build(
        entry: &SourceUri,
        sources: &dyn SourceTextProvider,
        resolver: &dyn ModuleResolver,
        cancel: &CancellationToken,
    ) -> Result<Self, Cancelled> {
        debug!("Building source file grouping for {}", entry);

        let mut grouping = SourceFileGrouping {
            entry: FileId::new(0),
            files: Vec::new(),
            by_uri: FxHashMap::default(),
            edges: Vec::new(),
            diagnostics: Vec::new(),
            post_order: Vec::new(),
        };

        let entry_text = match sources.source_text(entry) {
            Some(text) => text,
            None => {
                grouping.diagnostics.push(Diagnostic::error(
                    DiagnosticCategory::Resolution,
                    codes::MODULE_NOT_FOUND,
                    FileId::new(0),
                    TextRange::default(),
                    ResolutionError::NotFound(entry.to_string()).to_string(),
                ));
                Arc::from("")
            }
        };
        let entry_id = grouping.add_file(sources, entry.clone(), entry_text);

        let mut queue = VecDeque::from([entry_id]);
        while let Some(file_id) = queue.pop_front() {
            let from_uri = grouping.files[file_id.index()].uri().clone();
            for site in grouping.files[file_id.index()].references() {
                let edge = grouping.resolve_site(file_id, &from_uri, site, sources, resolver, cancel, &mut queue)?;
                grouping.edges.push(edge);
            }
        }

        grouping.detect_cycles();
        debug!(
            "Grouping complete: {} files, {} references, {} diagnostics",
            grouping.files.len(),
            grouping.edges.len(),
            grouping.diagnostics.len()
        );
        Ok(grouping)
    }

    /// Parse and register a file, reusing a parse `sources` already holds.
    fn add_file(&mut self, sources: &dyn SourceTextProvider, uri: SourceUri, text: Arc<str>) -> FileId {
        let file = match sources.parsed_file(&uri, &text) {
            Some(file) => {
                trace!("Reusing parse of {}", uri);
                file
            }
            None => Arc::new(SyntaxFile::new(uri, text)),
        };
        let id = FileId::new(self.files.len() as u32);
        self.by_uri.insert(file.uri().clone(), id);
        self.files.push(file);
        id
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_site(
        &mut self,
        from: FileId,
        from_uri: &SourceUri,
        site: ReferenceSite,
        sources: &dyn SourceTextProvider,
        resolver: &dyn ModuleResolver,
        cancel: &CancellationToken,
        queue: &mut VecDeque<FileId>,
    ) -> Result<ModuleEdge, Cancelled> {
        if site.interpolated {
            self.report(from, site.range, codes::INTERPOLATED_PATH, &ReferenceFailure::Interpolated);
            return Ok(ModuleEdge {
                from,
                site,
                reference: None,
                status: ResolutionStatus::Failed(ReferenceFailure::Interpolated),
            });
        }

        // A missing path is already a syntax error
        let Some(raw) = site.path.as_deref() else {
            return Ok(ModuleEdge {
                from,
                site,
                reference: None,
                status: ResolutionStatus::Unresolved,
            });
        };

        let reference = match ModuleReference::parse(raw) {
            Ok(reference) => reference,
            Err(e) => {
                let failure = ReferenceFailure::Resolution(e);
                self.report(from, site.range, codes::MALFORMED_REFERENCE, &failure);
                return Ok(ModuleEdge {
                    from,
                    site,
                    reference: None,
                    status: ResolutionStatus::Failed(failure),
                });
            }
        };

        if cancel.is_cancelled() {
            return Err(Cancelled);
        }

        trace!("Resolving '{}' from {}", reference, from_uri);
        let status = match resolver.resolve(from_uri, &reference) {
            Ok(resolved) => {
                let target = match self.by_uri.get(&resolved.uri) {
                    Some(&existing) => existing,
                    None => {
                        let id = self.add_file(sources, resolved.uri, resolved.text);
                        queue.push_back(id);
                        id
                    }
                };
                ResolutionStatus::Resolved(target)
            }
            Err(e) => {
                debug!("Failed to resolve '{}': {}", reference, e);
                let code = e.code();
                let failure = ReferenceFailure::Resolution(e);
                self.report(from, site.range, code, &failure);
                ResolutionStatus::Failed(failure)
            }
        };

        Ok(ModuleEdge {
            from,
            site,
            reference: Some(reference),
            status,
        })
    }

    fn report(&mut self, file: FileId, range: TextRange, code: &'static str, failure: &ReferenceFailure) {
        self.diagnostics.push(Diagnostic::error(
            DiagnosticCategory::Resolution,
            code,
            file,
            range,
            failure.to_string(),
        ));
    }

    /// Depth-first walk from the entry with an explicit ancestor stack; edges
    /// reaching a file still on the stack are cut and reported.
    fn detect_cycles(&mut self) {
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); self.files.len()];
        for (idx, edge) in self.edges.iter().enumerate() {
            if edge.status.resolved().is_some() {
                outgoing[edge.from.index()].push(idx);
            }
        }

        let mut state = vec![Visit::New; self.files.len()];
        let mut back_edges: Vec<(usize, Vec<SourceUri>)> = Vec::new();
        let mut post_order = Vec::with_capacity(self.files.len());
        let mut stack: Vec<(FileId, usize)> = vec![(self.entry, 0)];
        state[self.entry.index()] = Visit::OnPath;

        while let Some(frame) = stack.last_mut() {
            let file = frame.0;
            let Some(&edge_idx) = outgoing[file.index()].get(frame.1) else {
                state[file.index()] = Visit::Done;
                post_order.push(file);
                stack.pop();
                continue;
            };
            frame.1 += 1;

            let Some(target) = self.edges[edge_idx].status.resolved() else {
                continue;
            };
            match state[target.index()] {
                Visit::New => {
                    state[target.index()] = Visit::OnPath;
                    stack.push((target, 0));
                }
                Visit::OnPath => {
                    let start = stack
                        .iter()
                        .position(|(f, _)| *f == target)
                        .unwrap_or(0);
                    let mut path: Vec<SourceUri> = stack[start..]
                        .iter()
                        .map(|(f, _)| self.files[f.index()].uri().clone())
                        .collect();
                    path.push(self.files[target.index()].uri().clone());
                    back_edges.push((edge_idx, path));
                }
                Visit::Done => {}
            }
        }

        for (edge_idx, path) in back_edges {
            let failure = ReferenceFailure::Cycle(path);
            let (from, range) = {
                let edge = &self.edges[edge_idx];
                (edge.from, edge.site.range)
            };
            debug!("Module cycle: {}", failure);
            self.report(from, range, codes::MODULE_CYCLE, &failure);
            self.edges[edge_idx].status = ResolutionStatus::Failed(failure);
        }

        if post_order.len() != self.files.len() {
            error!(
                "Grouping invariant violated: {} of {} files reachable",
                post_order.len(),
                self.files.len()
            );
            debug_assert!(false, "every grouped file must be reachable from the entry");
        }
        self.post_order = post_order;
    }

    pub fn entry(&self) -> FileId {
        self.entry
    }

    pub fn entry_file(&self) -> &Arc<SyntaxFile> {
        &self.files[self.entry.index()]
    }

    pub fn file(&self, id: FileId) -> Option<&Arc<SyntaxFile>> {
        self.files.get(id.index())
    }

    pub fn file_id(&self, uri: &SourceUri) -> Option<FileId> {
        self.by_uri.get(uri).copied()
    }

    /// All files with their ids, in discovery order
    pub fn files(&self) -> impl Iterator<Item = (FileId, &Arc<SyntaxFile>)> {
        self.files
            .iter()
            .enumerate()
            .map(|(idx, file)| (FileId::new(idx as u32), file))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn edges(&self) -> &[ModuleEdge] {
        &self.edges
    }

    pub fn edges_from(&self, file: FileId) -> impl Iterator<Item = &ModuleEdge> {
        self.edges.iter().filter(move |e| e.from == file)
    }

    /// The edge whose path string sits at `range` in `file`
    pub fn edge_at(&self, file: FileId, range: TextRange) -> Option<&ModuleEdge> {
        self.edges_from(file).find(|e| e.site.range == range)
    }

    /// Dependencies before dependents; the entry is last
    pub fn post_order(&self) -> &[FileId] {
        &self.post_order
    }

    /// Resolution diagnostics
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_cycle(&self) -> bool {
        self.edges
            .iter()
            .any(|e| matches!(e.status, ResolutionStatus::Failed(ReferenceFailure::Cycle(_))))
    }
}
