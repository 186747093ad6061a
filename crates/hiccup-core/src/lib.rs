//! Hiccup kernel
//!
//! Projects an in-memory object graph into a labeled tree, runs path queries
//! against the tree and hands back the original objects that matched, by
//! identity rather than by copy.
//!
//! - [`object`]: type-erased handles (`ObjectRef`) and dynamic records
//! - [`adapters`]: primitive, sequence and mapping classification
//! - [`exclusion`]: rules deciding which members are left out
//! - [`members`]: member enumeration for record-like values
//! - [`builder`]: the tree builder
//! - [`query`]: the `Hiccup` façade and one-shot query functions

pub use hiccup_core_types as core_types;
pub use hiccup_xpath::{Node, QueryEngine, XPathEngine};

pub mod adapters;
pub mod builder;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod errors;
pub mod exclusion;
pub mod hooks;
pub mod logging_facility;
pub mod members;
pub mod object;
pub mod projection;
pub mod query;
pub mod registry;

pub use adapters::{
    Adapters, DefaultMappings, DefaultPrimitives, DefaultSequences, DefaultTypeNamer,
    MappingAdapter, PrimitiveAdapter, SequenceAdapter, TypeNamer,
};
pub use builder::{TreeBuilder, LIST_TAG, PRIMITIVE_TAG};
pub use config::{CyclePolicy, HiccupConfig, DEFAULT_IDENTITY_ATTR};
pub use context::{Context, Frame};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink};
pub use errors::{HiccupError, HiccupErrorKind, Result};
pub use exclusion::{ExclusionRules, Predicate, Rule};
pub use hooks::{HookChain, HookError, NoopHook, TreeHook};
pub use members::{AccessFailure, MemberEnumerator, RegisteredMembers};
pub use object::{Callable, Mapping, Member, ObjectRef, Property, Record, Tuple};
pub use projection::Projection;
pub use query::{xfind, xfind_all, xquery, xquery_single, Hiccup};
pub use registry::IdentityRegistry;
