//! Dependency graph over resources, modules and variables of one file.
//!
//! Edges come from every reference inside a declaration, explicit
//! `dependsOn` entries included. Nodes are arena indices in declaration
//! order; the index doubles as the tie-break for topological ordering.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};

use super::binder::{SymbolId, SymbolKind, SymbolTable, referenced_symbols};
use super::diagnostics::{Diagnostic, DiagnosticCategory, codes};
use crate::parser::{AstNode, Statement};
use crate::syntax::SyntaxFile;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: Vec<SymbolId>,
    kinds: Vec<SymbolKind>,
    index: FxHashMap<SymbolId, usize>,
    /// node → nodes it depends on, sorted
    edges: Vec<Vec<usize>>,
    existing: FxHashSet<usize>,
}

impl DependencyGraph {
    pub fn build(file: &SyntaxFile, table: &SymbolTable) -> Self {
        let mut graph = DependencyGraph::default();
        let Some(source_file) = file.source_file() else {
            return graph;
        };

        let mut statements = Vec::new();
        for statement in source_file.statements() {
            let range = statement.syntax().text_range();
            let Some(id) = table.declaration_at(range) else {
                continue;
            };
            let kind = table.symbol(id).kind;
            if !matches!(kind, SymbolKind::Resource | SymbolKind::Module | SymbolKind::Variable) {
                continue;
            }
            let node = graph.nodes.len();
            graph.nodes.push(id);
            graph.kinds.push(kind);
            graph.index.insert(id, node);
            if let Statement::Resource(resource) = &statement {
                if resource.is_existing() {
                    graph.existing.insert(node);
                }
            }
            statements.push(statement);
        }

        for (node, statement) in statements.iter().enumerate() {
            let mut deps: Vec<usize> = referenced_symbols(table, statement.syntax())
                .into_iter()
                .filter_map(|(_, id)| graph.index.get(&id).copied())
                .filter(|dep| *dep != node)
                .collect();
            deps.sort_unstable();
            deps.dedup();
            graph.edges.push(deps);
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct dependencies of `symbol`
    pub fn dependencies(&self, symbol: SymbolId) -> Vec<SymbolId> {
        self.index
            .get(&symbol)
            .map(|node| self.edges[*node].iter().map(|d| self.nodes[*d]).collect())
            .unwrap_or_default()
    }

    pub fn is_existing(&self, symbol: SymbolId) -> bool {
        self.index.get(&symbol).is_some_and(|n| self.existing.contains(n))
    }

    /// Deployed resources and modules `symbol` depends on, following
    /// variables and existing resources transitively.
    pub fn deployment_dependencies(&self, symbol: SymbolId) -> Vec<SymbolId> {
        let Some(&start) = self.index.get(&symbol) else {
            return Vec::new();
        };
        let mut found = BTreeSet::new();
        let mut visited = FxHashSet::default();
        let mut stack: Vec<usize> = self.edges[start].clone();
        while let Some(node) = stack.pop() {
            if node == start || !visited.insert(node) {
                continue;
            }
            let deployed = matches!(self.kinds[node], SymbolKind::Resource | SymbolKind::Module)
                && !self.existing.contains(&node);
            if deployed {
                found.insert(node);
            } else {
                stack.extend(self.edges[node].iter().copied());
            }
        }
        found.into_iter().map(|n| self.nodes[n]).collect()
    }

    /// Cycles, one per strongly connected component, each starting and
    /// ending at its earliest-declared member.
    pub fn cycles(&self) -> Vec<Vec<SymbolId>> {
        let mut cycles = Vec::new();
        for component in self.strongly_connected_components() {
            if component.len() < 2 {
                continue;
            }
            let Some(&start) = component.iter().min() else {
                continue;
            };
            let members: FxHashSet<usize> = component.iter().copied().collect();
            if let Some(path) = self.path_back(start, &members) {
                cycles.push(path.into_iter().map(|n| self.nodes[n]).collect());
            }
        }
        cycles.sort();
        cycles
    }

    /// Shortest path start → … → start within `members`
    fn path_back(&self, start: usize, members: &FxHashSet<usize>) -> Option<Vec<usize>> {
        let mut parent: FxHashMap<usize, usize> = FxHashMap::default();
        let mut queue = std::collections::VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for &dep in &self.edges[node] {
                if !members.contains(&dep) {
                    continue;
                }
                if dep == start {
                    let mut chain = vec![node];
                    let mut current = node;
                    while current != start {
                        current = *parent.get(&current)?;
                        chain.push(current);
                    }
                    chain.reverse();
                    chain.push(start);
                    return Some(chain);
                }
                if dep != start && !parent.contains_key(&dep) {
                    parent.insert(dep, node);
                    queue.push_back(dep);
                }
            }
        }
        None
    }

    /// Tarjan's algorithm, iterative
    fn strongly_connected_components(&self) -> Vec<Vec<usize>> {
        let n = self.nodes.len();
        let mut index = vec![usize::MAX; n];
        let mut low = vec![0; n];
        let mut on_stack = vec![false; n];
        let mut stack = Vec::new();
        let mut components = Vec::new();
        let mut counter = 0;

        for root in 0..n {
            if index[root] != usize::MAX {
                continue;
            }
            let mut work: Vec<(usize, usize)> = vec![(root, 0)];
            index[root] = counter;
            low[root] = counter;
            counter += 1;
            stack.push(root);
            on_stack[root] = true;

            while let Some(top) = work.last_mut() {
                let node = top.0;
                if let Some(&next) = self.edges[node].get(top.1) {
                    top.1 += 1;
                    if index[next] == usize::MAX {
                        index[next] = counter;
                        low[next] = counter;
                        counter += 1;
                        stack.push(next);
                        on_stack[next] = true;
                        work.push((next, 0));
                    } else if on_stack[next] {
                        low[node] = low[node].min(index[next]);
                    }
                    continue;
                }

                work.pop();
                if let Some(&(parent, _)) = work.last() {
                    low[parent] = low[parent].min(low[node]);
                }
                if low[node] == index[node] {
                    let mut component = Vec::new();
                    while let Some(member) = stack.pop() {
                        on_stack[member] = false;
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    component.sort_unstable();
                    components.push(component);
                }
            }
        }
        components
    }

    /// Deployed resources and modules, dependencies first. Ties go to the
    /// earlier declaration; members of cycles follow in declaration order.
    pub fn deployment_order(&self) -> Vec<SymbolId> {
        let n = self.nodes.len();
        let mut remaining: Vec<usize> = self.edges.iter().map(Vec::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (node, deps) in self.edges.iter().enumerate() {
            for &dep in deps {
                dependents[dep].push(node);
            }
        }

        let mut ready: BTreeSet<usize> = (0..n).filter(|node| remaining[*node] == 0).collect();
        let mut order = Vec::with_capacity(n);
        let mut placed = vec![false; n];
        while let Some(node) = ready.pop_first() {
            order.push(node);
            placed[node] = true;
            for &dependent in &dependents[node] {
                remaining[dependent] -= 1;
                if remaining[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }
        order.extend((0..n).filter(|node| !placed[*node]));

        order
            .into_iter()
            .filter(|node| {
                matches!(self.kinds[*node], SymbolKind::Resource | SymbolKind::Module)
                    && !self.existing.contains(node)
            })
            .map(|node| self.nodes[node])
            .collect()
    }

    /// One error per cycle member, naming the full cycle
    pub fn diagnostics(&self, table: &SymbolTable) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for cycle in self.cycles() {
            let path: Vec<&str> = cycle.iter().map(|id| table.symbol(*id).name.as_str()).collect();
            let path = path.join(" -> ");
            for id in &cycle[..cycle.len() - 1] {
                let symbol = table.symbol(*id);
                diagnostics.push(Diagnostic::error(
                    DiagnosticCategory::Type,
                    codes::DEPENDENCY_CYCLE,
                    table.file(),
                    symbol.name_range,
                    format!("the declaration '{}' is involved in a dependency cycle: {}", symbol.name, path),
                ));
            }
        }
        diagnostics
    }
}
