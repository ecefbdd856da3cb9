//! Shared keyboard state
//!
//! One [`Keyboard`] models the physical key state of one host surface. Every
//! [`Keybinding`](crate::Keybinding) attached to it observes the same
//! pressed-set and receives every dispatch independently.
//!
//! ## Press path
//!
//! ```text
//! raw key-down ──► canonicalize ──► unsupported? ──► ignored
//!                                        │
//!                          ┌─────────────┴─────────────┐
//!                     already held                 newly pressed
//!                    ┌─────┴──────┐                     │
//!                modifier     non-modifier        insert + re-sort
//!                    │             │                     │
//!             ModifierRepeat     Repeat                Fresh
//!                    └─────────────┴──────────┬──────────┘
//!                                             ▼
//!                 offer fingerprint to every attached engine
//! ```
//!
//! Each engine's [`RepeatPolicy`](crate::RepeatPolicy) decides whether a
//! repeat kind fires. The default fires auto-repeat of printable keys and
//! suppresses modifier repeats.
//!
//! ## Release path
//!
//! A modifier release is ignored while the host's live flags still report
//! that modifier as held: some platforms swallow or reorder modifier
//! release events when several keys are let go at once, and the flags are
//! the authority on what is physically down. Releases never dispatch.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::binding::KeyChord;
use crate::engine::EngineCore;
use crate::error::DispatchFault;
use crate::key::{canonicalize, is_modifier_currently_held, KeyName, ModifierState};

/// A raw press or release notification from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// Platform key identifier (`"Control"`, `"a"`, `"!"`, `"ArrowUp"`, ...)
    pub key: String,
    /// Live modifier flags at the time of the event
    pub modifiers: ModifierState,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, modifiers: ModifierState) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }

    /// The canonical key this event refers to.
    pub fn canonical_key(&self) -> KeyName {
        canonicalize(&self.key)
    }
}

/// Host capability reporting whether focus is on an editable text surface.
pub trait FocusProbe {
    fn is_editable_focused(&self) -> bool;
}

impl<F> FocusProbe for F
where
    F: Fn() -> bool,
{
    fn is_editable_focused(&self) -> bool {
        self()
    }
}

/// How a key-down relates to the pressed-set it arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PressKind {
    /// The key was not held before this event.
    Fresh,
    /// A non-modifier key that was already held (OS auto-repeat).
    Repeat,
    /// A modifier that was already held.
    ModifierRepeat,
}

/// Outcome of offering one press to the attached engines.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Handlers invoked, including ones that failed.
    pub invoked: usize,
    /// Faults captured from failing handlers.
    pub faults: Vec<DispatchFault>,
}

impl DispatchReport {
    pub(crate) fn merge(&mut self, other: DispatchReport) {
        self.invoked += other.invoked;
        self.faults.extend(other.faults);
    }

    /// True if at least one handler ran.
    pub fn fired(&self) -> bool {
        self.invoked > 0
    }

    /// True if no handler failed.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Result of [`Keyboard::key_down`].
#[derive(Debug)]
pub enum KeyDown {
    /// The key is outside the supported vocabulary.
    Ignored,
    Pressed {
        key: KeyName,
        kind: PressKind,
        report: DispatchReport,
    },
}

impl KeyDown {
    /// Handlers invoked by this press.
    pub fn invoked(&self) -> usize {
        match self {
            KeyDown::Ignored => 0,
            KeyDown::Pressed { report, .. } => report.invoked,
        }
    }
}

/// Result of [`Keyboard::key_up`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyUp {
    /// The key is outside the supported vocabulary.
    Ignored,
    /// Modifier release ignored because the live flags say it is still down.
    StillHeld(KeyName),
    /// The key left the pressed-set.
    Released(KeyName),
    /// The key was not in the pressed-set.
    NotPressed(KeyName),
}

/// Duplicate-free pressed keys, kept in canonical order.
#[derive(Debug, Default)]
struct PressedSet {
    keys: Vec<KeyName>,
}

impl PressedSet {
    /// Insert a key; returns false if it was already present.
    fn insert(&mut self, key: KeyName) -> bool {
        match self.keys.binary_search(&key) {
            Ok(_) => false,
            Err(pos) => {
                self.keys.insert(pos, key);
                true
            }
        }
    }

    /// Remove a key; returns false if it was not present.
    fn remove(&mut self, key: &KeyName) -> bool {
        match self.keys.binary_search(key) {
            Ok(pos) => {
                self.keys.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    fn contains(&self, key: &KeyName) -> bool {
        self.keys.binary_search(key).is_ok()
    }

    fn chord(&self) -> KeyChord {
        KeyChord::from_sorted(self.keys.clone())
    }
}

pub(crate) struct KeyboardShared {
    pressed: RefCell<PressedSet>,
    engines: RefCell<Vec<Weak<EngineCore>>>,
    focus: RefCell<Option<Rc<dyn FocusProbe>>>,
}

thread_local! {
    static DEFAULT_SURFACE: RefCell<Weak<KeyboardShared>> = RefCell::new(Weak::new());
}

/// Reference-counted handle to one surface's keyboard state.
///
/// Clones share the same state. The state lives as long as any handle,
/// including the ones held by attached engines.
#[derive(Clone)]
pub struct Keyboard {
    shared: Rc<KeyboardShared>,
}

impl Keyboard {
    /// Create the state for a new, independent surface.
    pub fn new() -> Self {
        Self {
            shared: Rc::new(KeyboardShared {
                pressed: RefCell::new(PressedSet::default()),
                engines: RefCell::new(Vec::new()),
                focus: RefCell::new(None),
            }),
        }
    }

    /// The default surface of the current thread.
    ///
    /// Created on first use and dropped with its last handle; the next call
    /// after that starts from an empty pressed-set.
    pub fn shared() -> Self {
        DEFAULT_SURFACE.with(|slot| {
            let existing = slot.borrow().upgrade();
            if let Some(shared) = existing {
                return Keyboard { shared };
            }

            tracing::debug!("Creating default keyboard surface");
            let keyboard = Keyboard::new();
            *slot.borrow_mut() = Rc::downgrade(&keyboard.shared);
            keyboard
        })
    }

    /// Install the host's editable-focus predicate.
    pub fn set_focus_probe(&self, probe: impl FocusProbe + 'static) {
        *self.shared.focus.borrow_mut() = Some(Rc::new(probe));
    }

    /// Remove the focus predicate; focus is then never considered editable.
    pub fn clear_focus_probe(&self) {
        self.shared.focus.borrow_mut().take();
    }

    /// Ask the host whether an editable element holds focus.
    pub fn is_editable_focused(&self) -> bool {
        let probe = self.shared.focus.borrow().clone();
        probe.is_some_and(|p| p.is_editable_focused())
    }

    /// The live fingerprint of the pressed-set.
    pub fn fingerprint(&self) -> KeyChord {
        self.shared.pressed.borrow().chord()
    }

    /// Currently pressed keys in canonical order.
    pub fn pressed_keys(&self) -> Vec<KeyName> {
        self.shared.pressed.borrow().keys.clone()
    }

    pub fn is_pressed(&self, key: &KeyName) -> bool {
        self.shared.pressed.borrow().contains(key)
    }

    /// Number of engines currently attached.
    pub fn engine_count(&self) -> usize {
        self.shared
            .engines
            .borrow()
            .iter()
            .filter(|engine| engine.strong_count() > 0)
            .count()
    }

    /// Check whether two handles refer to the same surface.
    pub fn same_surface(&self, other: &Keyboard) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    /// Process a raw key-down.
    pub fn key_down(&self, event: &KeyEvent) -> KeyDown {
        let key = event.canonical_key();
        if !key.is_supported() {
            tracing::trace!("Ignoring unsupported key-down {:?}", event.key);
            return KeyDown::Ignored;
        }

        let (kind, chord) = {
            let mut pressed = self.shared.pressed.borrow_mut();
            let kind = if pressed.insert(key.clone()) {
                PressKind::Fresh
            } else if key.is_modifier() {
                PressKind::ModifierRepeat
            } else {
                PressKind::Repeat
            };
            (kind, pressed.chord())
        };

        tracing::trace!(key = %key, ?kind, fingerprint = %chord, "key down");

        let report = self.dispatch(&chord, kind);
        KeyDown::Pressed { key, kind, report }
    }

    /// Process a raw key-up.
    pub fn key_up(&self, event: &KeyEvent) -> KeyUp {
        let key = event.canonical_key();
        if !key.is_supported() {
            tracing::trace!("Ignoring unsupported key-up {:?}", event.key);
            return KeyUp::Ignored;
        }

        if is_modifier_currently_held(&key, &event.modifiers) {
            tracing::trace!(key = %key, "modifier still held, ignoring release");
            return KeyUp::StillHeld(key);
        }

        let removed = self.shared.pressed.borrow_mut().remove(&key);
        tracing::trace!(key = %key, fingerprint = %self.fingerprint(), "key up");

        if removed {
            KeyUp::Released(key)
        } else {
            KeyUp::NotPressed(key)
        }
    }

    /// Offer a fingerprint to every attached engine, in attach order.
    fn dispatch(&self, chord: &KeyChord, kind: PressKind) -> DispatchReport {
        let engines: Vec<Rc<EngineCore>> = {
            let mut engines = self.shared.engines.borrow_mut();
            engines.retain(|engine| engine.strong_count() > 0);
            engines.iter().filter_map(Weak::upgrade).collect()
        };

        let mut report = DispatchReport::default();
        for engine in &engines {
            report.merge(EngineCore::offer(engine, chord, kind));
        }
        report
    }

    pub(crate) fn attach(&self, engine: &Rc<EngineCore>) {
        self.shared.engines.borrow_mut().push(Rc::downgrade(engine));
        tracing::debug!("Attached keybinding ({} attached)", self.engine_count());
    }

    pub(crate) fn detach(&self, engine: &Rc<EngineCore>) {
        let target = Rc::downgrade(engine);
        self.shared
            .engines
            .borrow_mut()
            .retain(|e| e.strong_count() > 0 && !Weak::ptr_eq(e, &target));
        tracing::debug!("Detached keybinding ({} attached)", self.engine_count());
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Keyboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyboard")
            .field("pressed", &self.shared.pressed.borrow().keys)
            .field("engines", &self.engine_count())
            .finish()
    }
}
