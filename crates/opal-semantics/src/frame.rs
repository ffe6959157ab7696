//! Local variable frames and scopes.
//!
//! One `LocalFrame` per method, constructor or closure body; scopes nest
//! inside a frame, frames nest when closures nest. Variable slots are
//! logical indices; physical layout is the code generator's business.

use rustc_hash::FxHashMap;

use crate::types::TypeRef;

/// A variable bound in some frame: its logical slot and type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalBinding {
    pub index: usize,
    pub ty: TypeRef,
}

/// A binding as seen from an expression: how many frames out it lives.
/// Distance 0 is the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturedBinding {
    pub frame: usize,
    pub index: usize,
    pub ty: TypeRef,
}

#[derive(Debug, Default)]
struct ScopeData {
    bindings: FxHashMap<String, LocalBinding>,
}

/// Variable slots of one method or closure body.
#[derive(Debug)]
pub struct LocalFrame {
    scopes: Vec<ScopeData>,
    /// Active scope chain, innermost last. Indexes into `scopes`.
    scope_stack: Vec<usize>,
    next_index: usize,
    closed: bool,
}

impl LocalFrame {
    pub fn new() -> Self {
        Self {
            scopes: vec![ScopeData::default()],
            scope_stack: vec![0],
            next_index: 0,
            closed: false,
        }
    }

    pub fn open_scope(&mut self) {
        let id = self.scopes.len();
        self.scopes.push(ScopeData::default());
        self.scope_stack.push(id);
    }

    pub fn close_scope(&mut self) {
        // the root scope stays
        if self.scope_stack.len() > 1 {
            self.scope_stack.pop();
        }
    }

    /// Bind a new variable in the innermost scope. `None` when the name is
    /// already bound there.
    pub fn add(&mut self, name: &str, ty: TypeRef) -> Option<usize> {
        let current = *self.scope_stack.last()?;
        if self.scopes[current].bindings.contains_key(name) {
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;
        self.scopes[current]
            .bindings
            .insert(name.to_string(), LocalBinding { index, ty });
        Some(index)
    }

    /// Find a binding anywhere along the active scope chain.
    pub fn lookup(&self, name: &str) -> Option<LocalBinding> {
        self.scope_stack
            .iter()
            .rev()
            .find_map(|&s| self.scopes[s].bindings.get(name).copied())
    }

    /// Find a binding in the innermost scope only.
    pub fn lookup_current_scope(&self, name: &str) -> Option<LocalBinding> {
        let current = *self.scope_stack.last()?;
        self.scopes[current].bindings.get(name).copied()
    }

    /// Types of every variable ever bound in this frame, by slot index.
    pub fn entries(&self) -> Vec<TypeRef> {
        let mut all: Vec<LocalBinding> = self
            .scopes
            .iter()
            .flat_map(|s| s.bindings.values().copied())
            .collect();
        all.sort_by_key(|b| b.index);
        all.into_iter().map(|b| b.ty).collect()
    }

    pub fn size(&self) -> usize {
        self.next_index
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn set_closed(&mut self) {
        self.closed = true;
    }
}

impl Default for LocalFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of a frame once its body has been checked; carried on the IR
/// for the code generator.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    /// Variable types by logical slot index.
    pub entries: Vec<TypeRef>,
    /// A closed frame is captured by some closure and must live in a frame
    /// object.
    pub closed: bool,
    /// Nesting depth: 0 for a method frame, 1 for a closure directly inside
    /// it, and so on.
    pub depth: usize,
}

/// The frame stack while checking one member body, plus naming for
/// compiler-introduced temporaries.
#[derive(Debug)]
pub struct LocalContext {
    frames: Vec<LocalFrame>,
    pub is_static: bool,
    temp_counter: u32,
}

impl LocalContext {
    pub fn new(is_static: bool) -> Self {
        Self {
            frames: vec![LocalFrame::new()],
            is_static,
            temp_counter: 0,
        }
    }

    fn current(&mut self) -> &mut LocalFrame {
        self.frames.last_mut().unwrap()
    }

    /// Enter a closure body.
    pub fn open_frame(&mut self) {
        self.frames.push(LocalFrame::new());
    }

    /// Leave a closure body, returning its snapshot.
    pub fn close_frame(&mut self) -> FrameSnapshot {
        let depth = self.frames.len() - 1;
        let frame = self.frames.pop().unwrap();
        FrameSnapshot {
            entries: frame.entries(),
            closed: frame.is_closed(),
            depth,
        }
    }

    /// Snapshot the outermost frame after checking a method body.
    pub fn finish(mut self) -> FrameSnapshot {
        let frame = self.frames.remove(0);
        debug_assert!(self.frames.is_empty());
        FrameSnapshot {
            entries: frame.entries(),
            closed: frame.is_closed(),
            depth: 0,
        }
    }

    /// Current closure nesting depth.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn open_scope(&mut self) {
        self.current().open_scope();
    }

    pub fn close_scope(&mut self) {
        self.current().close_scope();
    }

    pub fn add(&mut self, name: &str, ty: TypeRef) -> Option<usize> {
        self.current().add(name, ty)
    }

    /// Look a name up through the frame stack, nearest frame first.
    pub fn lookup(&self, name: &str) -> Option<CapturedBinding> {
        for (distance, frame) in self.frames.iter().rev().enumerate() {
            if let Some(b) = frame.lookup(name) {
                return Some(CapturedBinding {
                    frame: distance,
                    index: b.index,
                    ty: b.ty,
                });
            }
        }
        None
    }

    pub fn lookup_current_scope(&self, name: &str) -> Option<CapturedBinding> {
        self.frames
            .last()
            .and_then(|f| f.lookup_current_scope(name))
            .map(|b| CapturedBinding {
                frame: 0,
                index: b.index,
                ty: b.ty,
            })
    }

    /// Mark every frame enclosing the current one as closed. Called when a
    /// closure is created, since it may outlive those frames.
    pub fn mark_enclosing_closed(&mut self) {
        let last = self.frames.len() - 1;
        for frame in &mut self.frames[..last] {
            frame.set_closed();
        }
    }

    /// Fresh name for a synthesized temporary, never clashing with source
    /// identifiers.
    pub fn temp_name(&mut self) -> String {
        let n = self.temp_counter;
        self.temp_counter += 1;
        format!("sym#{n}")
    }
}
