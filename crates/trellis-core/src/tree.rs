//! Radix tree
//!
//! Every router owns one tree. Nodes store a prefix of the route pattern and
//! their children are bucketed by [`NodeKind`], which is also the lookup
//! precedence: static text, then regexp params, then params, then the
//! catch-all.
//!
//! ```text
//! /
//! ├── favicon.ico
//! ├── article
//! │   └── /
//! │       ├── near
//! │       ├── {id:[0-9]+}        regexp, tail '/'
//! │       │   └── /comments
//! │       └── {id}               param, tail '/'
//! │           └── /edit
//! └── files/
//!     └── *                      catch-all
//! ```
//!
//! Each node carries an endpoint table keyed by method plus an "any method"
//! slot, so a single tree serves all methods. Lookup backtracks: when the
//! most specific branch dead-ends, the next branch in precedence order is
//! tried from the same position.

use crate::chain::ChainHandler;
use crate::context::RouteContext;
use crate::error::RouteError;
use crate::handler::BoxHandler;
use crate::method::{MethodFilter, STANDARD_METHODS};
use crate::mux::Routes;
use crate::pattern::{compile_regex, NodeKind, Segment};
use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// A registered handler together with the pattern it was registered under.
#[derive(Clone)]
pub(crate) struct Endpoint {
    pub(crate) handler: Arc<ChainHandler>,
    pub(crate) pattern: Arc<str>,
}

/// Per-method endpoints of a node.
#[derive(Clone, Default)]
struct Endpoints {
    methods: SmallVec<[(Method, Endpoint); 2]>,
    any: Option<Endpoint>,
    /// Set on the routes a mount point registers on behalf of a sub-router.
    stub: bool,
}

impl Endpoints {
    fn is_leaf(&self) -> bool {
        !self.methods.is_empty() || self.any.is_some()
    }

    fn get(&self, method: &Method) -> Option<&Endpoint> {
        self.methods
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, e)| e)
            .or(self.any.as_ref())
    }

    fn set_method(&mut self, method: Method, endpoint: Endpoint) {
        match self.methods.iter_mut().find(|(m, _)| *m == method) {
            Some((_, slot)) => *slot = endpoint,
            None => {
                let pos = self
                    .methods
                    .iter()
                    .position(|(m, _)| m.as_str() > method.as_str())
                    .unwrap_or(self.methods.len());
                self.methods.insert(pos, (method, endpoint));
            }
        }
    }

    fn set(&mut self, filter: &MethodFilter, endpoint: Endpoint) {
        match filter {
            MethodFilter::One(method) => self.set_method(method.clone(), endpoint),
            MethodFilter::Any => {
                for (_, slot) in self.methods.iter_mut() {
                    *slot = endpoint.clone();
                }
                for method in STANDARD_METHODS.iter() {
                    self.set_method(method.clone(), endpoint.clone());
                }
                self.any = Some(endpoint);
            }
        }
    }

    /// Methods in name order.
    fn methods(&self) -> impl Iterator<Item = (&Method, &Endpoint)> {
        self.methods.iter().map(|(m, e)| (m, e))
    }

    fn any(&self) -> Option<&Endpoint> {
        self.any.as_ref()
    }
}

/// A radix tree node.
pub(crate) struct Node {
    kind: NodeKind,
    /// First character of the prefix, used to pick static edges.
    label: char,
    /// Byte terminating a param value.
    tail: u8,
    prefix: String,
    /// Param name of wild nodes.
    key: Option<Arc<str>>,
    regex: Option<Regex>,
    endpoints: Endpoints,
    subroutes: Option<BoxHandler>,
    children: [Vec<Node>; NodeKind::COUNT],
}

impl Default for Node {
    fn default() -> Self {
        Self::new_static("")
    }
}

impl Node {
    fn new_static(prefix: &str) -> Self {
        Self {
            kind: NodeKind::Static,
            label: prefix.chars().next().unwrap_or_default(),
            tail: 0,
            prefix: prefix.to_string(),
            key: None,
            regex: None,
            endpoints: Endpoints::default(),
            subroutes: None,
            children: Default::default(),
        }
    }

    fn new_wild(seg: &Segment<'_>, text: &str, pattern: &str) -> Result<Self, RouteError> {
        let regex = match &seg.regex {
            Some(source) => Some(compile_regex(source, pattern)?),
            None => None,
        };
        Ok(Self {
            kind: seg.kind,
            label: text.chars().next().unwrap_or_default(),
            tail: seg.tail,
            prefix: text.to_string(),
            key: Some(Arc::from(seg.key)),
            regex,
            endpoints: Endpoints::default(),
            subroutes: None,
            children: Default::default(),
        })
    }

    /// Register `handler` for `filter` under `pattern`.
    ///
    /// Registering the same method and pattern again replaces the handler.
    pub(crate) fn insert_route(
        &mut self,
        filter: &MethodFilter,
        pattern: &str,
        handler: Arc<ChainHandler>,
    ) -> Result<&mut Node, RouteError> {
        let node = self.insert(pattern)?;
        node.endpoints.set(
            filter,
            Endpoint {
                handler,
                pattern: Arc::from(pattern),
            },
        );
        Ok(node)
    }

    /// Flag the node's endpoints as a mount stub and attach the sub-router
    /// they delegate to, if any.
    pub(crate) fn mark_mount(&mut self, subroutes: Option<BoxHandler>) {
        self.endpoints.stub = true;
        if subroutes.is_some() {
            self.subroutes = subroutes;
        }
    }

    /// Find or create the node for `pattern`.
    pub(crate) fn insert(&mut self, pattern: &str) -> Result<&mut Node, RouteError> {
        self.insert_at(pattern, pattern)
    }

    fn insert_at(&mut self, search: &str, pattern: &str) -> Result<&mut Node, RouteError> {
        let Some(label) = search.chars().next() else {
            return Ok(self);
        };

        let seg = if label == '{' || label == '*' {
            Some(Segment::next(search)?)
        } else {
            None
        };

        let (kind, tail, regex) = match &seg {
            Some(seg) => (seg.kind, seg.tail, seg.regex.as_deref()),
            None => (NodeKind::Static, 0, None),
        };

        let Some(idx) = self.edge(kind, label, tail, regex) else {
            return self.add_child(search, pattern);
        };

        if let Some(seg) = seg {
            let child = &mut self.children[kind.index()][idx];
            if let Some(existing) = &child.key {
                if &**existing != seg.key {
                    return Err(RouteError::ParamConflict {
                        pattern: pattern.to_string(),
                        existing: existing.to_string(),
                        new: seg.key.to_string(),
                    });
                }
            }
            return child.insert_at(&search[seg.end..], pattern);
        }

        let child = &mut self.children[NodeKind::Static.index()][idx];
        let common = longest_prefix(search, &child.prefix);
        if common == child.prefix.len() {
            return child.insert_at(&search[common..], pattern);
        }

        // Split: the edge keeps the shared prefix and the old node moves
        // below it with the rest of its prefix.
        let mut old = std::mem::replace(child, Node::new_static(&search[..common]));
        old.prefix.drain(..common);
        old.label = old.prefix.chars().next().unwrap_or_default();
        child.children[NodeKind::Static.index()].push(old);

        let rest = &search[common..];
        if rest.is_empty() {
            return Ok(child);
        }
        child.add_child(rest, pattern)
    }

    /// Attach the whole of `search` below this node as new nodes and return
    /// the deepest one.
    fn add_child(&mut self, search: &str, pattern: &str) -> Result<&mut Node, RouteError> {
        let seg = Segment::next(search)?;

        let (child, rest) = if seg.kind == NodeKind::Static {
            (Node::new_static(search), "")
        } else if seg.start > 0 {
            (Node::new_static(&search[..seg.start]), &search[seg.start..])
        } else {
            (
                Node::new_wild(&seg, &search[..seg.end], pattern)?,
                &search[seg.end..],
            )
        };

        let kind = child.kind;
        let idx = self.push_child(child);
        let node = &mut self.children[kind.index()][idx];
        if rest.is_empty() {
            Ok(node)
        } else {
            node.add_child(rest, pattern)
        }
    }

    /// Insert a child keeping the bucket ordered, returning its index.
    ///
    /// Static children are sorted by label. Wild children keep insertion
    /// order, except that `/`-tailed nodes go last so more specific tails
    /// are tried first.
    fn push_child(&mut self, child: Node) -> usize {
        let bucket = &mut self.children[child.kind.index()];
        let pos = if child.kind == NodeKind::Static {
            bucket
                .binary_search_by_key(&child.label, |n| n.label)
                .unwrap_or_else(|pos| pos)
        } else if child.tail == b'/' {
            bucket.len()
        } else {
            bucket
                .iter()
                .position(|n| n.tail == b'/')
                .unwrap_or(bucket.len())
        };
        bucket.insert(pos, child);
        pos
    }

    fn edge(&self, kind: NodeKind, label: char, tail: u8, regex: Option<&str>) -> Option<usize> {
        let bucket = &self.children[kind.index()];
        if kind == NodeKind::Static {
            return bucket.binary_search_by_key(&label, |n| n.label).ok();
        }
        bucket.iter().position(|n| {
            n.label == label
                && n.tail == tail
                && (kind != NodeKind::Regexp || n.regex.as_ref().map(Regex::as_str) == regex)
        })
    }

    /// Whether a node for exactly `pattern` exists.
    pub(crate) fn find_pattern(&self, pattern: &str) -> bool {
        let Some(label) = pattern.chars().next() else {
            return true;
        };

        if label == '{' || label == '*' {
            let Ok(seg) = Segment::next(pattern) else {
                return false;
            };
            return self
                .edge(seg.kind, label, seg.tail, seg.regex.as_deref())
                .map(|idx| self.children[seg.kind.index()][idx].find_pattern(&pattern[seg.end..]))
                .unwrap_or(false);
        }

        match self.edge(NodeKind::Static, label, 0, None) {
            Some(idx) => {
                let child = &self.children[NodeKind::Static.index()][idx];
                match pattern.strip_prefix(child.prefix.as_str()) {
                    Some(rest) => child.find_pattern(rest),
                    None => false,
                }
            }
            None => false,
        }
    }

    /// Look up `path` for `method`.
    ///
    /// On a match the captured params are written to `ctx` (both the route
    /// params of this lookup and the cumulative URL params), the matched
    /// pattern is pushed onto the context's pattern stack and the leaf node
    /// is returned. On a miss `ctx` records whether the path exists under
    /// other methods.
    pub(crate) fn find_route(
        &self,
        ctx: &mut RouteContext,
        method: &Method,
        path: &str,
    ) -> Option<&Node> {
        ctx.route_params.clear();
        ctx.methods_allowed.clear();
        ctx.method_not_allowed = false;

        let mut lookup = Lookup {
            method,
            path,
            captures: SmallVec::new(),
            methods_allowed: SmallVec::new(),
            method_not_allowed: false,
        };

        let Some(node) = self.find(&mut lookup, path) else {
            ctx.method_not_allowed = lookup.method_not_allowed;
            ctx.methods_allowed = lookup.methods_allowed;
            return None;
        };

        for (key, start, end) in lookup.captures.iter() {
            ctx.route_params.push(Arc::clone(key), &path[*start..*end]);
        }
        ctx.url_params.extend_from(&ctx.route_params);
        if let Some(endpoint) = node.endpoints.get(method) {
            ctx.route_patterns.push(endpoint.pattern.clone());
        }
        Some(node)
    }

    /// The endpoint for `method` on this node.
    pub(crate) fn endpoint(&self, method: &Method) -> Option<&Endpoint> {
        self.endpoints.get(method)
    }

    /// The router mounted at this node, if any.
    pub(crate) fn subroutes(&self) -> Option<&BoxHandler> {
        self.subroutes.as_ref()
    }

    fn find<'t>(&'t self, lookup: &mut Lookup<'t, '_>, search: &str) -> Option<&'t Node> {
        for kind in NodeKind::ALL {
            let nodes = &self.children[kind.index()];
            if nodes.is_empty() {
                continue;
            }

            match kind {
                NodeKind::Static => {
                    let Some(label) = search.chars().next() else {
                        continue;
                    };
                    let Ok(idx) = nodes.binary_search_by_key(&label, |n| n.label) else {
                        continue;
                    };
                    let xn = &nodes[idx];
                    let Some(rest) = search.strip_prefix(xn.prefix.as_str()) else {
                        continue;
                    };
                    if let Some(found) = xn.visit(lookup, rest) {
                        return Some(found);
                    }
                }
                NodeKind::Regexp | NodeKind::Param => {
                    // Params never match an empty remainder.
                    if search.is_empty() {
                        continue;
                    }
                    for xn in nodes {
                        let end = match search.bytes().position(|b| b == xn.tail) {
                            Some(0) if kind == NodeKind::Regexp => continue,
                            Some(end) => end,
                            None if xn.tail == b'/' => search.len(),
                            None => continue,
                        };
                        let value = &search[..end];

                        match &xn.regex {
                            Some(rex) if kind == NodeKind::Regexp => {
                                if !rex.is_match(value) {
                                    continue;
                                }
                            }
                            _ => {
                                if value.contains('/') {
                                    continue;
                                }
                            }
                        }

                        lookup.capture(xn, search, end);
                        if let Some(found) = xn.visit(lookup, &search[end..]) {
                            return Some(found);
                        }
                        lookup.captures.pop();
                    }
                }
                NodeKind::CatchAll => {
                    let xn = &nodes[0];
                    lookup.capture(xn, search, search.len());
                    if let Some(found) = xn.visit(lookup, "") {
                        return Some(found);
                    }
                    lookup.captures.pop();
                }
            }
        }
        None
    }

    fn visit<'t>(&'t self, lookup: &mut Lookup<'t, '_>, search: &str) -> Option<&'t Node> {
        if search.is_empty() && self.endpoints.is_leaf() {
            if self.endpoints.get(lookup.method).is_some() {
                return Some(self);
            }
            lookup.method_not_allowed = true;
            for (m, _) in self.endpoints.methods() {
                if !lookup.methods_allowed.contains(m) {
                    lookup.methods_allowed.push(m.clone());
                }
            }
        }
        self.find(lookup, search)
    }

    /// Introspection records for every pattern registered in this tree.
    pub(crate) fn routes(&self) -> Vec<Route> {
        let mut routes = Vec::new();
        self.collect_routes(&mut routes);
        routes
    }

    fn collect_routes(&self, routes: &mut Vec<Route>) {
        let eps = &self.endpoints;
        let skip = eps.stub && self.subroutes.is_none();
        if eps.is_leaf() && !skip {
            let pattern = eps
                .any()
                .map(|e| e.pattern.clone())
                .or_else(|| eps.methods().next().map(|(_, e)| e.pattern.clone()));
            if let Some(pattern) = pattern {
                routes.push(Route {
                    pattern: pattern.to_string(),
                    handlers: eps
                        .methods()
                        .map(|(m, e)| (m.clone(), e.handler.clone()))
                        .collect(),
                    any: eps.any().map(|e| e.handler.clone()),
                    sub_routes: self.subroutes.clone(),
                });
            }
        }
        for bucket in self.children.iter() {
            for child in bucket {
                child.collect_routes(routes);
            }
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("prefix", &self.prefix)
            .field("key", &self.key)
            .field("children", &self.children)
            .finish()
    }
}

struct Lookup<'t, 'm> {
    method: &'m Method,
    path: &'m str,
    /// Param key with the byte span of its value in `path`.
    captures: SmallVec<[(&'t Arc<str>, usize, usize); 4]>,
    methods_allowed: SmallVec<[Method; 4]>,
    method_not_allowed: bool,
}

impl<'t> Lookup<'t, '_> {
    fn capture(&mut self, node: &'t Node, search: &str, len: usize) {
        if let Some(key) = &node.key {
            let start = self.path.len() - search.len();
            self.captures.push((key, start, start + len));
        }
    }
}

/// Length in bytes of the common prefix of `a` and `b`, ending on a char
/// boundary.
fn longest_prefix(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| a.len().min(b.len()))
}

/// Introspection record of one registered pattern.
#[derive(Clone)]
pub struct Route {
    pub pattern: String,
    /// Handlers per method, in method name order.
    pub handlers: Vec<(Method, Arc<ChainHandler>)>,
    /// Handler registered for any method, if any.
    pub any: Option<Arc<ChainHandler>>,
    pub(crate) sub_routes: Option<BoxHandler>,
}

impl Route {
    /// The route table of the router mounted at this pattern.
    pub fn sub_routes(&self) -> Option<&dyn Routes> {
        self.sub_routes.as_deref().and_then(|h| h.as_routes())
    }

    pub fn handler(&self, method: &Method) -> Option<&Arc<ChainHandler>> {
        self.handlers
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, h)| h)
            .or(self.any.as_ref())
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field(
                "methods",
                &self.handlers.iter().map(|(m, _)| m.as_str()).collect::<Vec<_>>(),
            )
            .field("any", &self.any.is_some())
            .field("sub_routes", &self.sub_routes.is_some())
            .finish()
    }
}
