/// Annotated reference graph over a token document.
///
/// [`build_graph`] runs two passes:
///
/// 1. **Collection** — a single traversal gathers token nodes, group nodes,
///    and reference edges in document order. Effective types come from
///    declaration, group inheritance, or value-shape inference (advisory,
///    never overriding a declaration).
/// 2. **Resolution** — edges are matched against the document's pointer map,
///    cycles are found by tri-colour DFS over a petgraph arena, and each
///    token gets a reference depth (leaves 0, references 1 + max target
///    depth, cycle participants −1).
///
/// The graph is derived data: the document stays authoritative, and a
/// graph is immutable once built.
pub mod infer;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::Serialize;

use crate::dynvalue::{DynMap, DynValue};
use crate::model::{
    KEY_DESCRIPTION, KEY_REF, KEY_VALUE, NodeKind, TokenDocument, classify, declared_type,
    is_metadata_key,
};
use crate::path::TokenPath;
use crate::reference::{ParsedReference, RefKind, is_alias_syntax, parse_reference};

// ---------------------------------------------------------------------------
// Node and edge records
// ---------------------------------------------------------------------------

/// A token (leaf) in the graph.
#[derive(Debug, Clone, Serialize)]
pub struct TokenNode {
    /// Path from the document root.
    pub path: TokenPath,
    /// The token's own `$type`, if declared.
    pub declared_type: Option<String>,
    /// Declared, else inherited, else inferred type. `None` when nothing
    /// determined it.
    pub effective_type: Option<String>,
    /// `true` when the effective type came from value-shape inference.
    pub type_inferred: bool,
    /// The value payload: the `$value`, or the `$ref` container for
    /// direct-reference tokens.
    pub value: DynValue,
    /// `true` when the value contains at least one reference.
    pub has_reference: bool,
    /// 0 for leaves, 1 + max target depth for references, −1 in or behind
    /// a cycle.
    pub reference_depth: i32,
    /// `false` when any of the token's references failed to resolve or
    /// participates in a cycle.
    pub valid: bool,
    /// Human-readable notes attached during resolution.
    pub diagnostics: Vec<String>,
}

/// A group (interior node) in the graph.
#[derive(Debug, Clone, Serialize)]
pub struct GroupNode {
    /// Path from the document root.
    pub path: TokenPath,
    /// The group's `$type`, inherited by undeclared tokens beneath it.
    pub declared_type: Option<String>,
    /// The group's `$description`.
    pub description: Option<String>,
}

/// One discovered reference, in document traversal order.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceEdge {
    /// Path of the token containing the reference.
    pub from: TokenPath,
    /// The reference exactly as written.
    pub raw: String,
    /// Syntactic kind, determined entirely by how the reference is written.
    pub kind: RefKind,
    /// The token-level target path, when resolution succeeded. External
    /// references are never resolved at graph level.
    pub target: Option<TokenPath>,
    /// `true` when the target was found (external edges are presumed valid
    /// here; the resolver checks them for real).
    pub valid: bool,
}

/// Aggregate counts for one graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Number of token nodes.
    pub token_count: usize,
    /// Number of group nodes.
    pub group_count: usize,
    /// Number of reference edges.
    pub reference_count: usize,
    /// Edges whose target resolved.
    pub valid_references: usize,
    /// Edges whose target did not resolve.
    pub invalid_references: usize,
    /// Number of reference cycles.
    pub circular_references: usize,
    /// Tokens whose effective type was inferred from the value shape.
    pub inferred_types: usize,
    /// Largest non-negative reference depth.
    pub max_reference_depth: i32,
}

/// The annotated graph over one document.
#[derive(Debug, Clone, Serialize)]
pub struct TokenGraph {
    /// Token nodes in document order.
    pub tokens: Vec<TokenNode>,
    /// Group nodes in document order.
    pub groups: Vec<GroupNode>,
    /// Reference edges in discovery order.
    pub edges: Vec<ReferenceEdge>,
    /// Reverse index: target token pointer → referencing token pointers.
    pub reverse: BTreeMap<String, BTreeSet<String>>,
    /// Cycle chains, each rotated to start at its smallest path.
    pub cycles: Vec<Vec<TokenPath>>,
    /// Aggregate counts.
    pub stats: GraphStats,
}

impl TokenGraph {
    /// Looks up a token node by its pointer string.
    pub fn token_by_pointer(&self, pointer: &str) -> Option<&TokenNode> {
        self.tokens.iter().find(|t| t.path.to_pointer() == pointer)
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Builds the annotated graph for `doc`.
pub fn build_graph(doc: &TokenDocument) -> TokenGraph {
    let mut collector = Collector::default();
    collector.walk_group(&doc.root, &TokenPath::root(), None);

    let Collector {
        mut tokens,
        groups,
        mut edges,
        token_refs,
    } = collector;

    // Pointer → token index, for both token-level and value-level spellings.
    let mut pointer_index: HashMap<String, usize> = HashMap::new();
    for (i, token) in tokens.iter().enumerate() {
        let pointer = token.path.to_pointer();
        pointer_index.insert(format!("{pointer}/{KEY_VALUE}"), i);
        pointer_index.insert(pointer, i);
    }

    // Resolve edges and build the petgraph arena for depth/cycle work.
    let mut arena: StableDiGraph<usize, usize> = StableDiGraph::new();
    let node_indices: Vec<NodeIndex> = (0..tokens.len()).map(|i| arena.add_node(i)).collect();
    let mut reverse: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for (edge_index, edge) in edges.iter_mut().enumerate() {
        let parsed = parse_reference(&edge.raw);
        match parsed {
            ParsedReference::Internal(_) | ParsedReference::Alias(_) => {
                let token_pointer = match &parsed {
                    ParsedReference::Internal(p) => {
                        TokenPath::from_pointer_token_level(p).to_pointer()
                    }
                    ParsedReference::Alias(d) => TokenPath::from_dotted(d).to_pointer(),
                    ParsedReference::External { .. } => continue,
                };
                match pointer_index.get(&token_pointer) {
                    Some(&target_idx) => {
                        edge.target = Some(tokens[target_idx].path.clone());
                        edge.valid = true;
                        let from_idx = token_refs[edge_index];
                        arena.add_edge(
                            node_indices[from_idx],
                            node_indices[target_idx],
                            edge_index,
                        );
                        reverse
                            .entry(token_pointer)
                            .or_default()
                            .insert(edge.from.to_pointer());
                    }
                    None => {
                        edge.valid = false;
                        let from_idx = token_refs[edge_index];
                        tokens[from_idx]
                            .diagnostics
                            .push(format!("unresolved reference {:?}", edge.raw));
                    }
                }
            }
            ParsedReference::External { file, .. } => {
                // Cross-file targets are outside this document; the resolver
                // verifies them when it runs with a loader.
                edge.valid = !file.is_empty();
            }
        }
    }

    // Cycle detection: tri-colour DFS over the arena.
    let cycles = find_cycles(&arena, &node_indices, &tokens);

    let mut in_cycle: Vec<bool> = vec![false; tokens.len()];
    let cycle_pointers: BTreeSet<String> = cycles
        .iter()
        .flatten()
        .map(TokenPath::to_pointer)
        .collect();
    for (i, token) in tokens.iter().enumerate() {
        if cycle_pointers.contains(&token.path.to_pointer()) {
            in_cycle[i] = true;
        }
    }

    // Reference depths with memoization; −1 propagates from cycles.
    let mut depth_memo: Vec<Option<i32>> = vec![None; tokens.len()];
    for i in 0..tokens.len() {
        compute_depth(i, &arena, &node_indices, &token_refs, &in_cycle, &mut depth_memo);
    }
    for (i, token) in tokens.iter_mut().enumerate() {
        token.reference_depth = depth_memo[i].unwrap_or(0);
        if in_cycle[i] {
            token.valid = false;
            token.diagnostics.push("participates in a reference cycle".to_owned());
        }
    }

    // Token validity also reflects unresolved edges.
    for (edge_index, edge) in edges.iter().enumerate() {
        if !edge.valid {
            tokens[token_refs[edge_index]].valid = false;
        }
    }

    // Stats.
    let valid_references = edges.iter().filter(|e| e.valid).count();
    let stats = GraphStats {
        token_count: tokens.len(),
        group_count: groups.len(),
        reference_count: edges.len(),
        valid_references,
        invalid_references: edges.len() - valid_references,
        circular_references: cycles.len(),
        inferred_types: tokens.iter().filter(|t| t.type_inferred).count(),
        max_reference_depth: tokens
            .iter()
            .map(|t| t.reference_depth)
            .filter(|d| *d >= 0)
            .max()
            .unwrap_or(0),
    };

    TokenGraph {
        tokens,
        groups,
        edges,
        reverse,
        cycles,
        stats,
    }
}

// ---------------------------------------------------------------------------
// Pass 1: collection
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Collector {
    tokens: Vec<TokenNode>,
    groups: Vec<GroupNode>,
    edges: Vec<ReferenceEdge>,
    /// For each edge, the index of the token that contains it.
    token_refs: Vec<usize>,
}

impl Collector {
    fn walk_group(&mut self, members: &DynMap, path: &TokenPath, inherited: Option<&str>) {
        let group_type = members
            .get(crate::model::KEY_TYPE)
            .and_then(DynValue::as_str)
            .or(inherited);

        for (name, node) in members {
            if is_metadata_key(name) {
                continue;
            }
            let child_path = path.child(name);
            match classify(node) {
                NodeKind::Token => self.collect_token(node, child_path, group_type),
                NodeKind::Group => {
                    let Some(child_members) = node.as_object() else {
                        continue;
                    };
                    self.groups.push(GroupNode {
                        path: child_path.clone(),
                        declared_type: node
                            .get(crate::model::KEY_TYPE)
                            .and_then(DynValue::as_str)
                            .map(str::to_owned),
                        description: node
                            .get(KEY_DESCRIPTION)
                            .and_then(DynValue::as_str)
                            .map(str::to_owned),
                    });
                    self.walk_group(child_members, &child_path, group_type);
                }
                NodeKind::Other => {}
            }
        }
    }

    fn collect_token(&mut self, node: &DynValue, path: TokenPath, inherited: Option<&str>) {
        let declared = declared_type(node).map(str::to_owned);

        // The value payload: $value, or the $ref container for tokens that
        // reference directly.
        let value = match node.get(KEY_VALUE) {
            Some(v) => v.clone(),
            None => {
                let mut container = DynMap::new();
                if let Some(r) = node.get(KEY_REF) {
                    container.insert(KEY_REF.to_owned(), r.clone());
                }
                DynValue::Object(container)
            }
        };

        let token_index = self.tokens.len();
        let edges_before = self.edges.len();
        self.scan_value(&value, &path, token_index);
        let has_reference = self.edges.len() > edges_before;

        let (effective, inferred) = match declared.as_deref().or(inherited) {
            Some(t) => (Some(t.to_owned()), false),
            None => match infer::infer_type(&value) {
                Some(t) => (Some(t.to_owned()), true),
                None => (None, false),
            },
        };

        self.tokens.push(TokenNode {
            path,
            declared_type: declared,
            effective_type: effective,
            type_inferred: inferred,
            value,
            has_reference,
            reference_depth: 0,
            valid: true,
            diagnostics: Vec::new(),
        });
    }

    /// Scans a value payload for references, in traversal order.
    fn scan_value(&mut self, value: &DynValue, from: &TokenPath, token_index: usize) {
        match value {
            DynValue::Object(map) => {
                if let Some(raw) = map.get(KEY_REF).and_then(DynValue::as_str) {
                    self.push_edge(from, raw, token_index);
                    return;
                }
                for member in map.values() {
                    self.scan_value(member, from, token_index);
                }
            }
            DynValue::Array(items) => {
                for item in items {
                    self.scan_value(item, from, token_index);
                }
            }
            DynValue::String(s) => {
                if is_alias_syntax(s) {
                    self.push_edge(from, s, token_index);
                }
            }
            DynValue::Null
            | DynValue::Bool(_)
            | DynValue::Integer(_)
            | DynValue::UnsignedInteger(_)
            | DynValue::Float(_) => {}
        }
    }

    fn push_edge(&mut self, from: &TokenPath, raw: &str, token_index: usize) {
        let kind = parse_reference(raw).kind();
        self.edges.push(ReferenceEdge {
            from: from.clone(),
            raw: raw.to_owned(),
            kind,
            target: None,
            valid: false,
        });
        self.token_refs.push(token_index);
    }
}

// ---------------------------------------------------------------------------
// Pass 2: cycles and depth
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum Colour {
    White,
    Grey,
    Black,
}

/// Tri-colour DFS cycle extraction.
///
/// Each back edge to a grey node yields one cycle: the slice of the current
/// DFS stack from that node onward, rotated so the lexicographically
/// smallest path leads.
fn find_cycles(
    arena: &StableDiGraph<usize, usize>,
    node_indices: &[NodeIndex],
    tokens: &[TokenNode],
) -> Vec<Vec<TokenPath>> {
    let mut colour = vec![Colour::White; tokens.len()];
    let mut cycles = Vec::new();

    for start in 0..tokens.len() {
        if colour[start] != Colour::White {
            continue;
        }
        // Iterative DFS: (token index, neighbor cursor).
        let mut stack: Vec<(usize, Vec<usize>, usize)> = Vec::new();
        let mut path_stack: Vec<usize> = Vec::new();

        colour[start] = Colour::Grey;
        path_stack.push(start);
        stack.push((start, neighbors(arena, node_indices[start]), 0));

        loop {
            let step = {
                let Some((_node, neigh, cursor)) = stack.last_mut() else {
                    break;
                };
                if *cursor >= neigh.len() {
                    None
                } else {
                    let next = neigh[*cursor];
                    *cursor += 1;
                    Some(next)
                }
            };
            match step {
                None => {
                    if let Some((done, _, _)) = stack.pop() {
                        colour[done] = Colour::Black;
                        path_stack.pop();
                    }
                }
                Some(next) => match colour[next] {
                    Colour::White => {
                        colour[next] = Colour::Grey;
                        path_stack.push(next);
                        stack.push((next, neighbors(arena, node_indices[next]), 0));
                    }
                    Colour::Grey => {
                        // Back edge: extract the chain from `next` to the top.
                        if let Some(pos) = path_stack.iter().position(|&i| i == next) {
                            let chain: Vec<TokenPath> = path_stack[pos..]
                                .iter()
                                .map(|&i| tokens[i].path.clone())
                                .collect();
                            cycles.push(rotate_to_smallest(chain));
                        }
                    }
                    Colour::Black => {}
                },
            }
        }
    }

    cycles
}

fn neighbors(arena: &StableDiGraph<usize, usize>, node: NodeIndex) -> Vec<usize> {
    arena
        .neighbors(node)
        .map(|n| arena[n])
        .collect::<Vec<usize>>()
        .into_iter()
        .rev()
        .collect()
}

/// Rotates a cycle chain so its smallest path comes first.
fn rotate_to_smallest(chain: Vec<TokenPath>) -> Vec<TokenPath> {
    let Some(min_pos) = chain
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
    else {
        return chain;
    };
    let mut rotated = Vec::with_capacity(chain.len());
    rotated.extend_from_slice(&chain[min_pos..]);
    rotated.extend_from_slice(&chain[..min_pos]);
    rotated
}

/// Memoized depth computation; −1 marks cycle participation and propagates
/// to everything that references into a cycle.
fn compute_depth(
    index: usize,
    arena: &StableDiGraph<usize, usize>,
    node_indices: &[NodeIndex],
    token_refs: &[usize],
    in_cycle: &[bool],
    memo: &mut Vec<Option<i32>>,
) -> i32 {
    if let Some(d) = memo[index] {
        return d;
    }
    if in_cycle[index] {
        memo[index] = Some(-1);
        return -1;
    }

    let has_edges = token_refs.iter().any(|&t| t == index);
    if !has_edges {
        memo[index] = Some(0);
        return 0;
    }

    // Mark before recursing; acyclic by this point, so a revisit on the
    // current path is impossible and the placeholder only guards reentry.
    memo[index] = Some(0);

    let mut best = 0;
    let mut cyclic = false;
    let targets: Vec<usize> = arena
        .neighbors(node_indices[index])
        .map(|neighbor| arena[neighbor])
        .collect();
    for target in targets {
        let d = compute_depth(target, arena, node_indices, token_refs, in_cycle, memo);
        if d == -1 {
            cyclic = true;
            break;
        }
        best = best.max(d);
    }

    let depth = if cyclic { -1 } else { 1 + best };
    memo[index] = Some(depth);
    depth
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    fn graph_of(json: &str) -> TokenGraph {
        let doc = TokenDocument::from_json(json).expect("valid document");
        build_graph(&doc)
    }

    // --- collection ---

    #[test]
    fn counts_tokens_and_groups() {
        let g = graph_of(
            r##"{"color":{"$description":"palette","primary":{"$value":"#000000"},
                "secondary":{"$value":"#ffffff"}},
                "size":{"small":{"$value":"4px"}}}"##,
        );
        assert_eq!(g.stats.token_count, 3);
        assert_eq!(g.stats.group_count, 2);
        assert_eq!(g.groups[0].description.as_deref(), Some("palette"));
    }

    #[test]
    fn token_count_matches_leaf_count_with_direct_ref() {
        // Leaves with $value or a top-level $ref both count.
        let g = graph_of(r##"{"a":{"$value":1},"b":{"$ref":"#/a"}}"##);
        assert_eq!(g.stats.token_count, 2);
    }

    #[test]
    fn empty_document_yields_empty_graph() {
        let g = graph_of("{}");
        assert_eq!(g.stats, GraphStats::default());
    }

    #[test]
    fn metadata_only_document_has_no_nodes() {
        let g = graph_of(r#"{"$type":"color","$description":"nothing here"}"#);
        assert_eq!(g.stats.token_count, 0);
        assert_eq!(g.stats.group_count, 0);
    }

    // --- types ---

    #[test]
    fn effective_type_prefers_declared() {
        let g = graph_of(r##"{"a":{"$type":"dimension","$value":"#000000"}}"##);
        assert_eq!(g.tokens[0].effective_type.as_deref(), Some("dimension"));
        assert!(!g.tokens[0].type_inferred);
    }

    #[test]
    fn effective_type_inherits_from_group() {
        let g = graph_of(r#"{"color":{"$type":"color","primary":{"$value":"zzz"}}}"#);
        assert_eq!(g.tokens[0].effective_type.as_deref(), Some("color"));
        assert!(!g.tokens[0].type_inferred);
    }

    #[test]
    fn effective_type_inherits_through_nested_groups() {
        let g = graph_of(
            r#"{"color":{"$type":"color","brand":{"primary":{"$value":"zzz"}}}}"#,
        );
        assert_eq!(g.tokens[0].effective_type.as_deref(), Some("color"));
    }

    #[test]
    fn effective_type_falls_back_to_inference() {
        let g = graph_of(r##"{"a":{"$value":"#aabbcc"},"b":{"$value":"7rem"},"c":{"$value":5}}"##);
        assert_eq!(g.tokens[0].effective_type.as_deref(), Some("color"));
        assert_eq!(g.tokens[1].effective_type.as_deref(), Some("dimension"));
        assert_eq!(g.tokens[2].effective_type.as_deref(), Some("number"));
        assert!(g.tokens.iter().all(|t| t.type_inferred));
        assert_eq!(g.stats.inferred_types, 3);
    }

    #[test]
    fn undeterminable_type_stays_empty() {
        let g = graph_of(r#"{"a":{"$value":true}}"#);
        assert_eq!(g.tokens[0].effective_type, None);
        assert!(!g.tokens[0].type_inferred);
    }

    // --- edges ---

    #[test]
    fn pointer_ref_in_value_is_internal_edge() {
        let g = graph_of(
            r##"{"p":{"$value":"#000000"},"s":{"$value":{"$ref":"#/p/$value"}}}"##,
        );
        assert_eq!(g.stats.reference_count, 1);
        let edge = &g.edges[0];
        assert_eq!(edge.kind, RefKind::Internal);
        assert_eq!(edge.from.to_string(), "s");
        assert_eq!(edge.target.as_ref().map(|p| p.to_string()), Some("p".to_owned()));
        assert!(edge.valid);
        assert!(g.tokens[1].has_reference);
        assert!(!g.tokens[0].has_reference);
    }

    #[test]
    fn alias_string_is_alias_edge() {
        let g = graph_of(r#"{"p":{"$value":1},"s":{"$value":"{p}"}}"#);
        assert_eq!(g.edges[0].kind, RefKind::Alias);
        assert!(g.edges[0].valid);
    }

    #[test]
    fn alias_target_appearing_later_still_resolves() {
        let g = graph_of(r#"{"s":{"$value":"{p}"},"p":{"$value":1}}"#);
        assert!(g.edges[0].valid, "resolution is a second pass; order is free");
    }

    #[test]
    fn external_ref_is_external_edge() {
        let g = graph_of(r#"{"c":{"$value":{"$ref":"./ext.json#/blue"}}}"#);
        assert_eq!(g.edges[0].kind, RefKind::External);
        assert!(g.edges[0].target.is_none());
        assert!(g.edges[0].valid, "externals are checked by the resolver, not here");
    }

    #[test]
    fn unresolved_internal_ref_invalidates_token() {
        let g = graph_of(r##"{"s":{"$value":{"$ref":"#/missing"}}}"##);
        assert!(!g.edges[0].valid);
        assert!(!g.tokens[0].valid);
        assert_eq!(g.stats.invalid_references, 1);
        assert!(!g.tokens[0].diagnostics.is_empty());
    }

    #[test]
    fn refs_inside_composite_values_are_found() {
        let g = graph_of(
            r##"{"c":{"$value":"#000000"},
                "sh":{"$type":"shadow","$value":{"color":{"$ref":"#/c/$value"},"blur":"2px"}}}"##,
        );
        assert_eq!(g.stats.reference_count, 1);
        assert_eq!(g.edges[0].from.to_string(), "sh");
    }

    #[test]
    fn refs_inside_arrays_are_found_in_order() {
        let g = graph_of(
            r##"{"a":{"$value":1},"b":{"$value":2},
                "list":{"$value":[{"$ref":"#/a"},{"$ref":"#/b"}]}}"##,
        );
        assert_eq!(g.stats.reference_count, 2);
        assert_eq!(g.edges[0].raw, "#/a");
        assert_eq!(g.edges[1].raw, "#/b");
    }

    #[test]
    fn reverse_index_maps_target_to_sources() {
        let g = graph_of(
            r##"{"p":{"$value":1},"s1":{"$value":"{p}"},"s2":{"$value":{"$ref":"#/p"}}}"##,
        );
        let sources = g.reverse.get("#/p").expect("reverse entry");
        assert!(sources.contains("#/s1"));
        assert!(sources.contains("#/s2"));
    }

    #[test]
    fn reference_to_document_root_is_invalid() {
        let g = graph_of(r##"{"s":{"$value":{"$ref":"#"}}}"##);
        assert!(!g.edges[0].valid, "the root is a group, not a token");
    }

    // --- depth and cycles ---

    #[test]
    fn depths_follow_chain_length() {
        let g = graph_of(
            r##"{"a":{"$value":1},
                "b":{"$value":{"$ref":"#/a/$value"}},
                "c":{"$value":{"$ref":"#/b/$value"}}}"##,
        );
        let depth_of = |name: &str| {
            g.tokens
                .iter()
                .find(|t| t.path.to_string() == name)
                .map(|t| t.reference_depth)
        };
        assert_eq!(depth_of("a"), Some(0));
        assert_eq!(depth_of("b"), Some(1));
        assert_eq!(depth_of("c"), Some(2));
        assert_eq!(g.stats.max_reference_depth, 2);
    }

    #[test]
    fn two_token_cycle_reported_once_with_ordered_chain() {
        let g = graph_of(
            r##"{"a":{"$value":{"$ref":"#/b/$value"}},"b":{"$value":{"$ref":"#/a/$value"}}}"##,
        );
        assert_eq!(g.cycles.len(), 1);
        let chain: Vec<String> = g.cycles[0].iter().map(ToString::to_string).collect();
        assert_eq!(chain, ["a", "b"]);
        assert!(g.tokens.iter().all(|t| t.reference_depth == -1));
        assert!(g.tokens.iter().all(|t| !t.valid));
        assert_eq!(g.stats.circular_references, 1);
    }

    #[test]
    fn cycle_chain_starts_at_smallest_path() {
        let g = graph_of(
            r##"{"z":{"$value":{"$ref":"#/m"}},
                "m":{"$value":{"$ref":"#/z"}}}"##,
        );
        let chain: Vec<String> = g.cycles[0].iter().map(ToString::to_string).collect();
        assert_eq!(chain[0], "m", "rotated to the lexicographically smallest");
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let g = graph_of(r##"{"a":{"$value":{"$ref":"#/a/$value"}}}"##);
        assert_eq!(g.cycles.len(), 1);
        assert_eq!(g.tokens[0].reference_depth, -1);
    }

    #[test]
    fn token_referencing_into_cycle_gets_negative_depth() {
        let g = graph_of(
            r##"{"a":{"$value":{"$ref":"#/b"}},
                "b":{"$value":{"$ref":"#/a"}},
                "outside":{"$value":{"$ref":"#/a"}}}"##,
        );
        let outside = g
            .tokens
            .iter()
            .find(|t| t.path.to_string() == "outside")
            .expect("outside token");
        assert_eq!(outside.reference_depth, -1);
    }

    #[test]
    fn external_edge_counts_one_hop() {
        let g = graph_of(r#"{"c":{"$value":{"$ref":"./ext.json#/blue"}}}"#);
        assert_eq!(g.tokens[0].reference_depth, 1);
    }

    #[test]
    fn stats_reconcile() {
        let g = graph_of(
            r##"{"p":{"$value":1},
                "ok":{"$value":"{p}"},
                "bad":{"$value":{"$ref":"#/nope"}}}"##,
        );
        assert_eq!(g.stats.reference_count, 2);
        assert_eq!(g.stats.valid_references, 1);
        assert_eq!(g.stats.invalid_references, 1);
        assert_eq!(
            g.stats.valid_references + g.stats.invalid_references,
            g.stats.reference_count
        );
    }
}
