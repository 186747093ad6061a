//! Query façade: project, query, resolve
//!
//! ```
//! use hiccup_core::{Hiccup, ObjectRef, Record};
//!
//! let x = ObjectRef::from("x");
//! let root = ObjectRef::from(
//!     Record::new("Post")
//!         .field("name", ObjectRef::from("a"))
//!         .field("tags", ObjectRef::from(vec![x.clone(), ObjectRef::from("y")])),
//! );
//!
//! let hiccup = Hiccup::new();
//! let tags = hiccup.query_all(&root, "//tags/primitivish").unwrap();
//! assert_eq!(tags.len(), 2);
//! assert!(ObjectRef::ptr_eq(&tags[0], &x));
//! ```

use std::any::Any;
use std::time::Instant;

use hiccup_core_types::QueryId;
use hiccup_xpath::{QueryEngine, XPathEngine};

use crate::adapters::Adapters;
use crate::builder::TreeBuilder;
use crate::config::HiccupConfig;
use crate::context::Context;
use crate::diagnostics::DiagnosticSink;
use crate::errors::{HiccupError, Result};
use crate::exclusion::{ExclusionRules, Rule};
use crate::hooks::TreeHook;
use crate::members::{MemberEnumerator, RegisteredMembers};
use crate::object::ObjectRef;
use crate::projection::Projection;
use crate::{log_op_end, log_op_error, log_op_start};

/// Projection and query engine with its adapters, rules and collaborators
///
/// Not thread-safe; build one per thread.
pub struct Hiccup {
    config: HiccupConfig,
    adapters: Adapters,
    rules: ExclusionRules,
    members: Box<dyn MemberEnumerator>,
    engine: Box<dyn QueryEngine>,
    hook: Option<Box<dyn TreeHook>>,
    diagnostics: Option<Box<dyn DiagnosticSink>>,
}

impl Default for Hiccup {
    fn default() -> Self {
        Self::assemble(HiccupConfig::default())
    }
}

impl Hiccup {
    /// Engine with the default configuration and collaborators
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` does not validate.
    pub fn from_config(config: HiccupConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config))
    }

    fn assemble(config: HiccupConfig) -> Self {
        let rules = if config.default_exclusions {
            ExclusionRules::default()
        } else {
            ExclusionRules::empty()
        };
        Self {
            config,
            adapters: Adapters::default(),
            rules,
            members: Box::new(RegisteredMembers::new()),
            engine: Box::new(XPathEngine),
            hook: None,
            diagnostics: None,
        }
    }

    pub fn config(&self) -> &HiccupConfig {
        &self.config
    }

    pub fn with_adapters(mut self, adapters: Adapters) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn with_members(mut self, members: impl MemberEnumerator + 'static) -> Self {
        self.members = Box::new(members);
        self
    }

    pub fn with_engine(mut self, engine: impl QueryEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    pub fn with_hook(mut self, hook: impl TreeHook + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn with_diagnostics(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.diagnostics = Some(Box::new(sink));
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.add(rule);
        self
    }

    pub fn adapters_mut(&mut self) -> &mut Adapters {
        &mut self.adapters
    }

    pub fn rules(&self) -> &ExclusionRules {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut ExclusionRules {
        &mut self.rules
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.add(rule);
    }

    /// Skip member `attr` on values of type `T`
    pub fn ignore<T: Any>(&mut self, attr: impl Into<String>) {
        self.rules.ignore::<T>(attr);
    }

    /// Tag values of type `T` with `name` instead of their type name
    pub fn set_type_name<T: Any>(&mut self, name: impl Into<String>) {
        self.adapters.set_type_name::<T>(name);
    }

    /// Build the tree for `root`, run the hook, and keep the registry for
    /// later resolution
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedValue`, `CycleDetected` or `HookFailed`.
    pub fn project(&self, root: &ObjectRef) -> Result<Projection> {
        let query_id = QueryId::new();
        let start = Instant::now();
        log_op_start!("project", query_id = %query_id);

        let result = self.build(root);
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(projection) => {
                let node_count = projection.tree().map_or(0, |t| t.subtree_len());
                log_op_end!(
                    "project",
                    duration_ms = duration_ms,
                    query_id = %query_id,
                    node_count = node_count,
                );
            }
            Err(err) => {
                log_op_error!("project", err, duration_ms = duration_ms, query_id = %query_id);
            }
        }
        result
    }

    /// Every object whose node matches `query`, in engine order
    ///
    /// # Errors
    ///
    /// Returns projection errors, `HookFailed`, `InvalidQuery` or
    /// `UnknownIdentity`.
    pub fn query_all(&self, root: &ObjectRef, query: &str) -> Result<Vec<ObjectRef>> {
        let query_id = QueryId::new();
        let start = Instant::now();
        log_op_start!("query_all", query_id = %query_id, query = query);

        let result = self.run_query(root, query);
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(matches) => {
                log_op_end!(
                    "query_all",
                    duration_ms = duration_ms,
                    query_id = %query_id,
                    match_count = matches.len(),
                );
            }
            Err(err) => {
                log_op_error!("query_all", err, duration_ms = duration_ms, query_id = %query_id);
            }
        }
        result
    }

    /// The single object matching `query`
    ///
    /// # Errors
    ///
    /// Returns `AmbiguousResult` unless exactly one node matches, plus every
    /// error of [`Hiccup::query_all`].
    pub fn query_one(&self, root: &ObjectRef, query: &str) -> Result<ObjectRef> {
        let query_id = QueryId::new();
        let start = Instant::now();
        log_op_start!("query_one", query_id = %query_id, query = query);

        let result = self.run_query(root, query).and_then(|mut matches| {
            if matches.len() == 1 {
                Ok(matches.remove(0))
            } else {
                Err(HiccupError::AmbiguousResult {
                    query: query.to_string(),
                    count: matches.len(),
                })
            }
        });
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                log_op_end!("query_one", duration_ms = duration_ms, query_id = %query_id);
            }
            Err(err) => {
                log_op_error!("query_one", err, duration_ms = duration_ms, query_id = %query_id);
            }
        }
        result
    }

    fn run_query(&self, root: &ObjectRef, query: &str) -> Result<Vec<ObjectRef>> {
        let projection = self.build(root)?;
        projection.select(self.engine.as_ref(), query)
    }

    fn build(&self, root: &ObjectRef) -> Result<Projection> {
        let mut builder = TreeBuilder::new(
            &self.adapters,
            &self.rules,
            self.members.as_ref(),
            &self.config.identity_attr,
        )
        .with_cycle_guard(self.config.cycle_guard);
        if let Some(sink) = self.diagnostics.as_deref() {
            builder = builder.with_diagnostics(sink);
        }

        let mut ctx = Context::new(root.clone());
        let mut tree = builder.project(&mut ctx)?;

        if let (Some(hook), Some(tree)) = (&self.hook, tree.as_mut()) {
            hook.rewrite(tree)
                .map_err(|e| HiccupError::HookFailed { message: e.message })?;
        }

        Ok(Projection::new(
            tree,
            builder.into_registry(),
            self.config.identity_attr.clone(),
        ))
    }
}

/// Query `root` once with a default engine
///
/// # Errors
///
/// See [`Hiccup::query_all`].
pub fn xquery(root: &ObjectRef, query: &str) -> Result<Vec<ObjectRef>> {
    Hiccup::new().query_all(root, query)
}

/// Single-result query with a default engine
///
/// # Errors
///
/// See [`Hiccup::query_one`].
pub fn xquery_single(root: &ObjectRef, query: &str) -> Result<ObjectRef> {
    Hiccup::new().query_one(root, query)
}

/// Alias of [`xquery`]
///
/// # Errors
///
/// See [`Hiccup::query_all`].
pub fn xfind_all(root: &ObjectRef, query: &str) -> Result<Vec<ObjectRef>> {
    xquery(root, query)
}

/// Alias of [`xquery_single`]
///
/// # Errors
///
/// See [`Hiccup::query_one`].
pub fn xfind(root: &ObjectRef, query: &str) -> Result<ObjectRef> {
    xquery_single(root, query)
}
