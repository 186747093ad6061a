//! Tree builder: projects an object graph into a labeled tree
//!
//! Classification order for the value of the current frame:
//! 1. excluded by the rules: no node
//! 2. sequence: `listish` node, one unnamed child per item
//! 3. primitive: `primitivish` node with the rendered text
//! 4. anything else: node tagged with the type name, one child per mapping
//!    entry or member, each relabelled with its key or member name
//!
//! Every node carries the identity token of its source object. Shared
//! objects reachable by several paths are projected once per path.

use hiccup_xpath::Node;

use crate::adapters::Adapters;
use crate::config::CyclePolicy;
use crate::context::Context;
use crate::diagnostics::{emit, Diagnostic, DiagnosticSink};
use crate::errors::{HiccupError, Result};
use crate::exclusion::ExclusionRules;
use crate::members::MemberEnumerator;
use crate::object::ObjectRef;
use crate::registry::IdentityRegistry;

/// Tag of sequence nodes before they are relabelled
pub const LIST_TAG: &str = "listish";
/// Tag of primitive nodes before they are relabelled
pub const PRIMITIVE_TAG: &str = "primitivish";

pub struct TreeBuilder<'a> {
    adapters: &'a Adapters,
    rules: &'a ExclusionRules,
    members: &'a dyn MemberEnumerator,
    identity_attr: &'a str,
    cycle_guard: CyclePolicy,
    diagnostics: Option<&'a dyn DiagnosticSink>,
    registry: IdentityRegistry,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        adapters: &'a Adapters,
        rules: &'a ExclusionRules,
        members: &'a dyn MemberEnumerator,
        identity_attr: &'a str,
    ) -> Self {
        Self {
            adapters,
            rules,
            members,
            identity_attr,
            cycle_guard: CyclePolicy::default(),
            diagnostics: None,
            registry: IdentityRegistry::new(),
        }
    }

    pub fn with_cycle_guard(mut self, policy: CyclePolicy) -> Self {
        self.cycle_guard = policy;
        self
    }

    pub fn with_diagnostics(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn into_registry(self) -> IdentityRegistry {
        self.registry
    }

    /// Project the value of the current frame of `ctx`
    ///
    /// Returns `Ok(None)` when the value is excluded. `ctx` is left as it was
    /// found, on success and on error.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedValue` for primitives that cannot be rendered and
    /// `CycleDetected` when the cycle guard is on and the value is one of its
    /// own ancestors.
    pub fn project(&mut self, ctx: &mut Context) -> Result<Option<Node>> {
        if self.rules.is_excluded(ctx) {
            return Ok(None);
        }
        let Some(object) = ctx.object().cloned() else {
            return Ok(None);
        };
        if self.cycle_guard == CyclePolicy::Error && ctx.has_ancestor(&object) {
            return Err(HiccupError::CycleDetected { path: ctx.path() });
        }

        let token = self.registry.register(object.clone());

        let mut node = if let Some(items) = self.adapters.sequences.classify(&object) {
            let mut node = Node::new(LIST_TAG);
            for item in items {
                ctx.push(None, item);
                let child = self.project(ctx);
                ctx.pop();
                if let Some(child) = child? {
                    node.push_child(child);
                }
            }
            node
        } else if let Some(text) = self.adapters.primitives.classify(&object)? {
            let mut node = Node::new(PRIMITIVE_TAG);
            node.set_text(text);
            node
        } else {
            let mut node = Node::new(self.adapters.type_name(&object));
            for (name, value) in self.entries(&object, ctx) {
                ctx.push(name.clone(), value);
                let child = self.project(ctx).map(|child| self.relabel(child, name, ctx));
                ctx.pop();
                if let Some(child) = child? {
                    node.push_child(child);
                }
            }
            node
        };

        node.set_attribute(self.identity_attr, token.to_string());
        Ok(Some(node))
    }

    /// Named children of a non-sequence, non-primitive value
    fn entries(
        &self,
        object: &ObjectRef,
        ctx: &mut Context,
    ) -> Vec<(Option<String>, ObjectRef)> {
        if let Some(pairs) = self.adapters.mappings.classify(object) {
            return pairs
                .into_iter()
                .map(|(key, value)| (self.key_name(&key), value))
                .collect();
        }

        let mut entries = Vec::new();
        for result in self.members.enumerate(object, ctx, self.rules) {
            match result {
                Ok((name, value)) => entries.push((Some(name), value)),
                Err(failure) => emit(
                    self.diagnostics,
                    Diagnostic::AccessFailure {
                        path: ctx.path(),
                        member: failure.member,
                        message: failure.message,
                    },
                ),
            }
        }
        entries
    }

    /// Text form of a mapping key: strings as-is, primitives rendered
    fn key_name(&self, key: &ObjectRef) -> Option<String> {
        if let Some(s) = key.downcast_ref::<String>() {
            return Some(s.clone());
        }
        self.adapters.primitives.classify(key).ok().flatten()
    }

    /// Give a projected child its member or key name, dropping it (with a
    /// diagnostic) when the name is not a legal tag
    fn relabel(&self, child: Option<Node>, name: Option<String>, ctx: &Context) -> Option<Node> {
        let mut child = child?;
        let tag = name.unwrap_or_default();
        match child.set_tag(&tag) {
            Ok(()) => Some(child),
            Err(_) => {
                emit(
                    self.diagnostics,
                    Diagnostic::InvalidTag {
                        path: ctx.path(),
                        tag,
                    },
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::members::RegisteredMembers;
    use crate::object::{Mapping, Record};
    use hiccup_xpath::is_valid_tag;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    struct Fixture {
        adapters: Adapters,
        rules: ExclusionRules,
        members: RegisteredMembers,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                adapters: Adapters::default(),
                rules: ExclusionRules::default(),
                members: RegisteredMembers::new(),
            }
        }

        fn builder(&self) -> TreeBuilder<'_> {
            TreeBuilder::new(&self.adapters, &self.rules, &self.members, "_hiccup_id")
        }
    }

    fn project(fixture: &Fixture, root: &ObjectRef) -> (Option<Node>, IdentityRegistry) {
        let mut builder = fixture.builder();
        let mut ctx = Context::new(root.clone());
        let tree = builder.project(&mut ctx).unwrap();
        assert_eq!(ctx.depth(), 0);
        (tree, builder.into_registry())
    }

    fn resolve<'r>(registry: &'r IdentityRegistry, node: &Node) -> &'r ObjectRef {
        registry
            .resolve_str(node.attribute("_hiccup_id").unwrap())
            .unwrap()
    }

    #[test]
    fn test_record_projection_shape() {
        let name = ObjectRef::from("a");
        let x = ObjectRef::from("x");
        let root = ObjectRef::from(
            Record::new("Record")
                .field("name", name.clone())
                .field("tags", ObjectRef::from(vec![x.clone(), ObjectRef::from("y")]))
                .field("meta", ObjectRef::none()),
        );
        let fixture = Fixture::new();
        let (tree, registry) = project(&fixture, &root);
        let tree = tree.unwrap();

        assert_eq!(tree.tag(), "Record");
        let tags: Vec<_> = tree.children().iter().map(|c| c.tag()).collect();
        assert_eq!(tags, vec!["name", "tags", "meta"]);

        let tags_node = &tree.children()[1];
        assert_eq!(tags_node.children().len(), 2);
        assert_eq!(tags_node.children()[0].tag(), PRIMITIVE_TAG);
        assert_eq!(tags_node.children()[0].text(), Some("x"));
        assert_eq!(tree.children()[2].text(), Some("none"));

        assert!(ObjectRef::ptr_eq(resolve(&registry, &tree), &root));
        assert!(ObjectRef::ptr_eq(resolve(&registry, &tree.children()[0]), &name));
        assert!(ObjectRef::ptr_eq(resolve(&registry, &tags_node.children()[0]), &x));
    }

    #[test]
    fn test_root_sequence_and_primitive() {
        let fixture = Fixture::new();
        let (tree, _) = project(&fixture, &ObjectRef::from(vec![ObjectRef::from(1i64)]));
        let tree = tree.unwrap();
        assert_eq!(tree.tag(), LIST_TAG);
        assert_eq!(tree.children()[0].text(), Some("1"));

        let (tree, _) = project(&fixture, &ObjectRef::from(true));
        assert_eq!(tree.unwrap().text(), Some("true"));
    }

    #[test]
    fn test_unrelabelled_nodes_get_legal_type_tags() {
        let root = ObjectRef::from(vec![
            ObjectRef::from(Record::new("my record")),
            ObjectRef::new((1i64, 2i64)),
        ]);
        let fixture = Fixture::new();
        let (tree, _) = project(&fixture, &root);
        let tree = tree.unwrap();

        let tags: Vec<_> = tree.children().iter().map(|c| c.tag()).collect();
        assert_eq!(tags, vec!["my_record", "_i64__i64_"]);
        assert!(tree.children().iter().all(|c| is_valid_tag(c.tag())));
    }

    #[test]
    fn test_excluded_members_produce_no_nodes() {
        let root = ObjectRef::from(
            Record::new("R")
                .field("__hidden", ObjectRef::from(1i64))
                .method("run", |_| ObjectRef::none())
                .field("shown", ObjectRef::from(2i64)),
        );
        let fixture = Fixture::new();
        let (tree, _) = project(&fixture, &root);
        let tree = tree.unwrap();
        assert_eq!(tree.children().len(), 1);
        assert_eq!(tree.children()[0].tag(), "shown");
    }

    #[test]
    fn test_excluded_root_projects_to_nothing() {
        let fixture = Fixture::new();
        let callable = ObjectRef::new(crate::object::Callable::new("f", |_| ObjectRef::none()));
        let (tree, registry) = project(&fixture, &callable);
        assert!(tree.is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalid_keys_drop_only_that_child() {
        let mut map = BTreeMap::new();
        map.insert("0".to_string(), ObjectRef::from(1i64));
        map.insert("has space".to_string(), ObjectRef::from(2i64));
        map.insert("ok".to_string(), ObjectRef::from(3i64));
        let root = ObjectRef::new(map);

        let fixture = Fixture::new();
        let sink = CollectingSink::new();
        let mut builder = fixture.builder().with_diagnostics(&sink);
        let tree = builder
            .project(&mut Context::new(root))
            .unwrap()
            .unwrap();

        assert_eq!(tree.children().len(), 1);
        assert_eq!(tree.children()[0].tag(), "ok");
        assert_eq!(
            sink.diagnostics(),
            vec![
                Diagnostic::InvalidTag {
                    path: "/0".to_string(),
                    tag: "0".to_string(),
                },
                Diagnostic::InvalidTag {
                    path: "/has space".to_string(),
                    tag: "has space".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_non_string_mapping_keys_are_rendered() {
        let root = ObjectRef::new(
            Mapping::new()
                .entry(true, ObjectRef::from(1i64))
                .entry(ObjectRef::new(vec![ObjectRef::none()]), ObjectRef::from(2i64)),
        );
        let fixture = Fixture::new();
        let sink = CollectingSink::new();
        let mut builder = fixture.builder().with_diagnostics(&sink);
        let tree = builder
            .project(&mut Context::new(root))
            .unwrap()
            .unwrap();

        assert_eq!(tree.children().len(), 1);
        assert_eq!(tree.children()[0].tag(), "true");
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_failing_property_is_skipped_with_diagnostic() {
        let root = ObjectRef::from(
            Record::new("R")
                .property("broken", || Err("no access".to_string()))
                .field("fine", ObjectRef::from(1i64)),
        );
        let fixture = Fixture::new();
        let sink = CollectingSink::new();
        let mut builder = fixture.builder().with_diagnostics(&sink);
        let tree = builder
            .project(&mut Context::new(root))
            .unwrap()
            .unwrap();

        assert_eq!(tree.children().len(), 1);
        assert_eq!(
            sink.diagnostics(),
            vec![Diagnostic::AccessFailure {
                path: "/".to_string(),
                member: "broken".to_string(),
                message: "no access".to_string(),
            }]
        );
    }

    #[test]
    fn test_shared_object_projected_per_path_with_one_token() {
        let shared = ObjectRef::from("s");
        let root = ObjectRef::from(
            Record::new("R")
                .field("a", shared.clone())
                .field("b", shared.clone()),
        );
        let fixture = Fixture::new();
        let (tree, registry) = project(&fixture, &root);
        let tree = tree.unwrap();

        assert_eq!(tree.children().len(), 2);
        assert_eq!(
            tree.children()[0].attribute("_hiccup_id"),
            tree.children()[1].attribute("_hiccup_id")
        );
        assert!(ObjectRef::ptr_eq(resolve(&registry, &tree.children()[1]), &shared));
    }

    #[test]
    fn test_unsupported_primitive_aborts() {
        struct Opaque;
        let mut primitives = crate::adapters::DefaultPrimitives::default();
        primitives.mark_primitive::<Opaque>();
        let mut fixture = Fixture::new();
        fixture.adapters = Adapters::default().with_primitives(primitives);

        let root = ObjectRef::from(Record::new("R").field("o", ObjectRef::new(Opaque)));
        let mut builder = fixture.builder();
        let mut ctx = Context::new(root);
        let err = builder.project(&mut ctx).unwrap_err();

        assert!(matches!(err, HiccupError::UnsupportedValue { .. }));
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_cycle_detected() {
        // A property returning its own record closes the loop
        let slot: Rc<RefCell<Option<ObjectRef>>> = Rc::default();
        let inner = slot.clone();
        let root = ObjectRef::from(Record::new("Loop").property("me", move || {
            inner.borrow().clone().ok_or_else(|| "unset".to_string())
        }));
        *slot.borrow_mut() = Some(root.clone());

        let fixture = Fixture::new();
        let mut builder = fixture.builder();
        let mut ctx = Context::new(root);
        let err = builder.project(&mut ctx).unwrap_err();

        assert_eq!(
            err,
            HiccupError::CycleDetected {
                path: "/me".to_string()
            }
        );
        assert_eq!(ctx.depth(), 0);

        slot.borrow_mut().take();
    }
}
