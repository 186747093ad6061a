//! Traversal context: the chain of (name, object) frames from the root to
//! the value currently being projected

use crate::object::ObjectRef;

/// One step of the traversal
#[derive(Debug, Clone)]
pub struct Frame {
    /// Member or key name; `None` for the root and for sequence items
    pub name: Option<String>,
    pub object: ObjectRef,
}

/// Stack of frames, pushed before descending and popped after
#[derive(Debug, Clone)]
pub struct Context {
    frames: Vec<Frame>,
}

impl Context {
    /// Context holding only the root frame
    pub fn new(root: ObjectRef) -> Self {
        Self {
            frames: vec![Frame {
                name: None,
                object: root,
            }],
        }
    }

    pub fn push(&mut self, name: Option<String>, object: ObjectRef) {
        self.frames.push(Frame { name, object });
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn current(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn parent(&self) -> Option<&Frame> {
        self.frames.iter().rev().nth(1)
    }

    pub fn object(&self) -> Option<&ObjectRef> {
        self.current().map(|f| &f.object)
    }

    pub fn name(&self) -> Option<&str> {
        self.current().and_then(|f| f.name.as_deref())
    }

    /// Number of descents from the root; the root itself is at depth 0
    pub fn depth(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Slash-separated names below the root, `*` for unnamed frames
    ///
    /// The root alone is `/`; the second item of `tags` is `/tags/*`.
    pub fn path(&self) -> String {
        if self.frames.len() <= 1 {
            return "/".to_string();
        }
        self.frames
            .iter()
            .skip(1)
            .map(|f| format!("/{}", f.name.as_deref().unwrap_or("*")))
            .collect()
    }

    /// Whether the current object also appears in an enclosing frame
    pub fn has_ancestor(&self, object: &ObjectRef) -> bool {
        let Some((_, ancestors)) = self.frames.split_last() else {
            return false;
        };
        ancestors.iter().any(|f| ObjectRef::ptr_eq(&f.object, object))
    }
}
