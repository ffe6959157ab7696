//! Physical layout of a checked frame.
//!
//! The analyzer hands over logical variable slots; here they become
//! physical locations. An open frame spreads its variables over local
//! slots, widening as needed. A closed frame is captured by a closure and
//! lives in a heap frame object instead, one cell per logical slot, with
//! a single local holding the frame reference.

use opal_semantics::frame::FrameSnapshot;
use opal_semantics::TypeRef;

fn width(ty: TypeRef) -> u16 {
    ty.width() as u16
}

/// Where the variables of one frame live at run time.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameLayout {
    Open {
        /// Physical slot per logical index.
        slots: Vec<u16>,
        /// Widths per logical index, for load/store sizing.
        wide: Vec<bool>,
        locals: u16,
    },
    Closed {
        /// Local slot holding the frame object reference.
        frame_local: u16,
        /// Cells in the frame object, one per logical slot.
        frame_size: u16,
        wide: Vec<bool>,
        locals: u16,
    },
}

impl FrameLayout {
    /// Lay out a checked frame. `base` is the first free local slot: 1
    /// for instance members (the receiver sits at 0), 0 for static ones.
    /// `params` of the entries arrive in physical local slots either way.
    pub fn of(snapshot: &FrameSnapshot, base: u16, params: usize) -> FrameLayout {
        let wide: Vec<bool> = snapshot.entries.iter().map(|&t| width(t) == 2).collect();
        if snapshot.closed {
            // arguments land in locals, then get copied into the frame
            let arg_slots: u16 = snapshot.entries[..params].iter().map(|&t| width(t)).sum();
            let frame_local = base + arg_slots;
            FrameLayout::Closed {
                frame_local,
                frame_size: snapshot.entries.len() as u16,
                wide,
                locals: frame_local + 1,
            }
        } else {
            let mut slots = Vec::with_capacity(snapshot.entries.len());
            let mut next = base;
            for &ty in &snapshot.entries {
                slots.push(next);
                next += width(ty);
            }
            FrameLayout::Open {
                slots,
                wide,
                locals: next,
            }
        }
    }

    pub fn locals(&self) -> u16 {
        match self {
            FrameLayout::Open { locals, .. } | FrameLayout::Closed { locals, .. } => *locals,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, FrameLayout::Closed { .. })
    }

    /// Physical slot of an argument before any frame copy, by logical
    /// index. Only meaningful for the first `params` entries.
    pub fn arg_slot(snapshot: &FrameSnapshot, base: u16, index: usize) -> u16 {
        base + snapshot.entries[..index]
            .iter()
            .map(|&t| width(t))
            .sum::<u16>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(entries: Vec<TypeRef>, closed: bool) -> FrameSnapshot {
        FrameSnapshot {
            entries,
            closed,
            depth: 0,
        }
    }

    #[test]
    fn open_layout_widens_slots() {
        let s = snapshot(vec![TypeRef::INT, TypeRef::LONG, TypeRef::BOOLEAN], false);
        let FrameLayout::Open { slots, wide, locals } = FrameLayout::of(&s, 1, 1) else {
            panic!("expected an open layout");
        };
        assert_eq!(slots, vec![1, 2, 4]);
        assert_eq!(wide, vec![false, true, false]);
        assert_eq!(locals, 5);
    }

    #[test]
    fn closed_layout_reserves_a_frame_local() {
        let s = snapshot(vec![TypeRef::INT, TypeRef::DOUBLE, TypeRef::INT], true);
        // instance member with two checked params: int and double
        let layout = FrameLayout::of(&s, 1, 2);
        let FrameLayout::Closed { frame_local, frame_size, locals, .. } = layout else {
            panic!("expected a closed layout");
        };
        assert_eq!(frame_local, 4); // receiver + int + double
        assert_eq!(frame_size, 3);
        assert_eq!(locals, 5);
        assert_eq!(FrameLayout::arg_slot(&s, 1, 1), 2);
    }
}
