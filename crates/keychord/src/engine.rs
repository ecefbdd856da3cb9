//! Binding engine
//!
//! A [`Keybinding`] owns a handler table keyed by [`KeyChord`] and a set of
//! disabled scopes. It attaches to a [`Keyboard`] on construction and is
//! offered every press from then on, until [`Keybinding::destroy`].
//!
//! # Example
//!
//! ```
//! use keychord::{Handler, KeyEvent, Keybinding, Keyboard, Modifier, ModifierState};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let keyboard = Keyboard::new();
//! let keys = Keybinding::new(&keyboard);
//!
//! let saves = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&saves);
//! let save = Handler::infallible(move |_| counter.set(counter.get() + 1));
//! keys.register("ctrl + s", &save);
//!
//! let ctrl = ModifierState::NONE.with(Modifier::Control);
//! keyboard.key_down(&KeyEvent::new("Control", ctrl));
//! keyboard.key_down(&KeyEvent::new("s", ctrl));
//! assert_eq!(saves.get(), 1);
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::binding::{parse_bindings, KeyChord};
use crate::error::{DispatchFault, HandlerError};
use crate::key::KeyName;
use crate::keyboard::{DispatchReport, Keyboard, PressKind};
use crate::options::KeybindingOptions;

/// Scope used when none is given.
pub const DEFAULT_SCOPE: &str = "default";

/// Reserved scope name that suppresses every handler of an engine.
pub const ALL_SCOPE: &str = "all";

pub type HandlerResult = Result<(), HandlerError>;

type HandlerFn = dyn Fn(&Keybinding) -> HandlerResult;

/// A handler reference.
///
/// Identity is reference identity: clones of one `Handler` are the same
/// handler for [`Keybinding::unregister`] and duplicate detection, two
/// separately built handlers never are.
#[derive(Clone)]
pub struct Handler(Rc<HandlerFn>);

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Keybinding) -> HandlerResult + 'static,
    {
        Handler(Rc::new(f))
    }

    /// Wrap a handler that cannot fail.
    pub fn infallible<F>(f: F) -> Self
    where
        F: Fn(&Keybinding) + 'static,
    {
        Handler::new(move |engine| {
            f(engine);
            Ok(())
        })
    }

    pub fn ptr_eq(&self, other: &Handler) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Run the handler, capturing both errors and panics.
    fn invoke(&self, engine: &Keybinding, chord: &KeyChord, scope: &str) -> Result<(), DispatchFault> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.0)(engine))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(DispatchFault::Failed {
                chord: chord.clone(),
                scope: scope.to_string(),
                source,
            }),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                Err(DispatchFault::Panicked {
                    chord: chord.clone(),
                    scope: scope.to_string(),
                    message,
                })
            }
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// One or more scope names for [`Keybinding::enable`] / [`Keybinding::disable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scopes {
    /// The reserved `"all"` scope.
    All,
    One(String),
    Many(Vec<String>),
}

impl From<&str> for Scopes {
    fn from(scope: &str) -> Self {
        if scope == ALL_SCOPE {
            Scopes::All
        } else {
            Scopes::One(scope.to_string())
        }
    }
}

impl From<String> for Scopes {
    fn from(scope: String) -> Self {
        Scopes::from(scope.as_str())
    }
}

impl From<Vec<String>> for Scopes {
    fn from(scopes: Vec<String>) -> Self {
        Scopes::Many(scopes)
    }
}

impl From<Vec<&str>> for Scopes {
    fn from(scopes: Vec<&str>) -> Self {
        Scopes::Many(scopes.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Scopes {
    fn from(scopes: &[&str]) -> Self {
        Scopes::Many(scopes.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Scopes {
    fn from(scopes: [&str; N]) -> Self {
        Scopes::Many(scopes.iter().map(|s| s.to_string()).collect())
    }
}

#[derive(Debug, Clone)]
struct Registration {
    handler: Handler,
    scope: String,
}

impl Registration {
    fn matches(&self, handler: &Handler, scope: &str) -> bool {
        self.handler.ptr_eq(handler) && self.scope == scope
    }
}

/// Tables of a live engine. Dropped as a whole on destroy.
struct EngineState {
    keyboard: Keyboard,
    handlers: HashMap<KeyChord, Vec<Registration>>,
    disabled: HashSet<String>,
}

impl EngineState {
    fn is_suppressed(&self, scope: &str) -> bool {
        self.disabled.contains(ALL_SCOPE) || self.disabled.contains(scope)
    }
}

pub(crate) struct EngineCore {
    options: KeybindingOptions,
    state: RefCell<Option<EngineState>>,
}

impl EngineCore {
    /// Handle one press offered by the keyboard.
    pub(crate) fn offer(core: &Rc<EngineCore>, chord: &KeyChord, kind: PressKind) -> DispatchReport {
        let mut report = DispatchReport::default();

        if !core.options.repeat.allows(kind) {
            return report;
        }

        let (registrations, keyboard) = {
            let state = core.state.borrow();
            let Some(state) = state.as_ref() else {
                return report;
            };
            if state.disabled.contains(ALL_SCOPE) {
                return report;
            }
            match state.handlers.get(chord) {
                Some(registrations) if !registrations.is_empty() => {
                    (registrations.clone(), state.keyboard.clone())
                }
                _ => return report,
            }
        };

        if core.options.filter_editable && keyboard.is_editable_focused() {
            tracing::trace!(fingerprint = %chord, "editable element focused, skipping dispatch");
            return report;
        }

        let engine = Keybinding {
            core: Rc::clone(core),
        };

        for registration in &registrations {
            // Handlers may disable scopes or destroy the engine mid-dispatch
            let suppressed = match core.state.borrow().as_ref() {
                None => break,
                Some(state) => state.is_suppressed(&registration.scope),
            };
            if suppressed {
                continue;
            }

            report.invoked += 1;
            if let Err(fault) = registration
                .handler
                .invoke(&engine, chord, &registration.scope)
            {
                tracing::error!("{}", fault);
                report.faults.push(fault);
            }
        }

        report
    }
}

/// A keyboard-shortcut engine instance.
///
/// Clones are handles to the same instance.
#[derive(Clone)]
pub struct Keybinding {
    core: Rc<EngineCore>,
}

impl Keybinding {
    /// Create an engine with default options and attach it to `keyboard`.
    pub fn new(keyboard: &Keyboard) -> Self {
        Self::with_options(keyboard, KeybindingOptions::default())
    }

    pub fn with_options(keyboard: &Keyboard, options: KeybindingOptions) -> Self {
        let core = Rc::new(EngineCore {
            options,
            state: RefCell::new(Some(EngineState {
                keyboard: keyboard.clone(),
                handlers: HashMap::new(),
                disabled: HashSet::new(),
            })),
        });
        keyboard.attach(&core);
        Keybinding { core }
    }

    pub fn options(&self) -> KeybindingOptions {
        self.core.options
    }

    /// False once [`Keybinding::destroy`] has run.
    pub fn is_active(&self) -> bool {
        self.core.state.borrow().is_some()
    }

    /// Check whether two handles refer to the same engine.
    pub fn same_engine(&self, other: &Keybinding) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }

    /// Run `f` against the live tables, or log and skip after destroy.
    fn with_state<R>(&self, operation: &str, f: impl FnOnce(&mut EngineState) -> R) -> Option<R> {
        let mut state = self.core.state.borrow_mut();
        match state.as_mut() {
            Some(state) => Some(f(state)),
            None => {
                tracing::debug!("Ignoring {} on destroyed keybinding", operation);
                None
            }
        }
    }

    /// Bind `handler` to every chord of `spec` in the default scope.
    pub fn register(&self, spec: &str, handler: &Handler) {
        self.register_scoped(spec, handler, DEFAULT_SCOPE);
    }

    /// Bind `handler` to every chord of `spec` in `scope`.
    ///
    /// Registering the same handler twice in the same scope is a no-op.
    pub fn register_scoped(&self, spec: &str, handler: &Handler, scope: &str) {
        let chords = parse_bindings(spec);
        self.with_state("register", |state| {
            for chord in chords {
                let registrations = state.handlers.entry(chord.clone()).or_default();
                if registrations.iter().any(|r| r.matches(handler, scope)) {
                    tracing::debug!("Handler already bound to '{}' in scope '{}'", chord.describe(), scope);
                    continue;
                }
                tracing::debug!("Registered '{}' in scope '{}'", chord.describe(), scope);
                registrations.push(Registration {
                    handler: handler.clone(),
                    scope: scope.to_string(),
                });
            }
        });
    }

    /// Remove `handler` from every chord of `spec` in the default scope.
    pub fn unregister(&self, spec: &str, handler: &Handler) {
        self.unregister_scoped(spec, handler, DEFAULT_SCOPE);
    }

    /// Remove the first registration of (`handler`, `scope`) under each chord.
    pub fn unregister_scoped(&self, spec: &str, handler: &Handler, scope: &str) {
        let chords = parse_bindings(spec);
        self.with_state("unregister", |state| {
            for chord in &chords {
                let Some(registrations) = state.handlers.get_mut(chord) else {
                    continue;
                };
                if let Some(idx) = registrations.iter().position(|r| r.matches(handler, scope)) {
                    registrations.remove(idx);
                    tracing::debug!("Unregistered '{}' in scope '{}'", chord.describe(), scope);
                }
                if registrations.is_empty() {
                    state.handlers.remove(chord);
                }
            }
        });
    }

    /// Suppress the given scope(s). [`Scopes::All`] suppresses everything.
    pub fn disable(&self, scopes: impl Into<Scopes>) {
        let scopes = scopes.into();
        self.with_state("disable", |state| {
            match scopes {
                Scopes::All => {
                    state.disabled.insert(ALL_SCOPE.to_string());
                }
                Scopes::One(scope) => {
                    state.disabled.insert(scope);
                }
                Scopes::Many(scopes) => state.disabled.extend(scopes),
            }
            tracing::debug!("Disabled scopes: {:?}", state.disabled);
        });
    }

    /// Lift suppression of the given scope(s).
    ///
    /// [`Scopes::All`], or `"all"` anywhere in a list, re-enables every scope
    /// and ignores the rest of the list.
    pub fn enable(&self, scopes: impl Into<Scopes>) {
        let scopes = scopes.into();
        self.with_state("enable", |state| {
            match scopes {
                Scopes::All => state.disabled.clear(),
                Scopes::One(scope) => {
                    state.disabled.remove(&scope);
                }
                Scopes::Many(scopes) => {
                    for scope in scopes {
                        if scope == ALL_SCOPE {
                            state.disabled.clear();
                            break;
                        }
                        state.disabled.remove(&scope);
                    }
                }
            }
            tracing::debug!("Disabled scopes: {:?}", state.disabled);
        });
    }

    pub fn disable_all(&self) {
        self.disable(Scopes::All);
    }

    pub fn enable_all(&self) {
        self.enable(Scopes::All);
    }

    /// Check whether `scope` is currently suppressed, directly or via `"all"`.
    pub fn is_scope_disabled(&self, scope: &str) -> bool {
        self.core
            .state
            .borrow()
            .as_ref()
            .is_some_and(|state| state.is_suppressed(scope))
    }

    /// Registrations under the chord(s) of `spec`.
    pub fn handler_count(&self, spec: &str) -> usize {
        let state = self.core.state.borrow();
        let Some(state) = state.as_ref() else {
            return 0;
        };
        parse_bindings(spec)
            .iter()
            .filter_map(|chord| state.handlers.get(chord))
            .map(Vec::len)
            .sum()
    }

    /// The live fingerprint of the attached keyboard.
    ///
    /// Empty after destroy.
    pub fn pressed_keys(&self) -> KeyChord {
        self.core
            .state
            .borrow()
            .as_ref()
            .map(|state| state.keyboard.fingerprint())
            .unwrap_or_default()
    }

    /// Check whether a key is currently held on the attached keyboard.
    pub fn is_pressed(&self, key: &KeyName) -> bool {
        self.core
            .state
            .borrow()
            .as_ref()
            .is_some_and(|state| state.keyboard.is_pressed(key))
    }

    /// Detach from the keyboard and drop every registration.
    ///
    /// Later calls on this engine (or its clones) are ignored.
    pub fn destroy(&self) {
        let state = self.core.state.borrow_mut().take();
        match state {
            Some(state) => {
                state.keyboard.detach(&self.core);
                tracing::debug!("Destroyed keybinding with {} binding key(s)", state.handlers.len());
            }
            None => tracing::debug!("Ignoring destroy on destroyed keybinding"),
        }
    }
}

impl fmt::Debug for Keybinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.core.state.borrow();
        let mut s = f.debug_struct("Keybinding");
        s.field("options", &self.core.options);
        match state.as_ref() {
            Some(state) => s
                .field("bindings", &state.handlers.len())
                .field("disabled", &state.disabled),
            None => s.field("destroyed", &true),
        };
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::key::{Modifier, ModifierState};
    use crate::keyboard::{KeyDown, KeyEvent};
    use crate::options::RepeatPolicy;

    /// Handler that counts its invocations.
    fn counter() -> (Handler, Rc<Cell<usize>>) {
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        let handler = Handler::infallible(move |_| seen.set(seen.get() + 1));
        (handler, count)
    }

    /// Simulated host that tracks live modifier flags like a real platform.
    struct Host {
        keyboard: Keyboard,
        flags: ModifierState,
    }

    impl Host {
        fn new() -> Self {
            Self {
                keyboard: Keyboard::new(),
                flags: ModifierState::NONE,
            }
        }

        fn down(&mut self, key: &str) -> KeyDown {
            if let Some(m) = crate::key::canonicalize(key).modifier() {
                self.flags.set(m, true);
            }
            self.keyboard.key_down(&KeyEvent::new(key, self.flags))
        }

        fn up(&mut self, key: &str) {
            if let Some(m) = crate::key::canonicalize(key).modifier() {
                self.flags.set(m, false);
            }
            self.keyboard.key_up(&KeyEvent::new(key, self.flags));
        }

        fn tap_chord(&mut self, keys: &[&str]) {
            for key in keys {
                self.down(key);
            }
            for key in keys {
                self.up(key);
            }
        }
    }

    #[test]
    fn test_ctrl_a_fires_once_per_press() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let (handler, count) = counter();
        keys.register("ctrl+a", &handler);

        host.down("Control");
        host.down("a");
        assert_eq!(count.get(), 1);

        host.up("Control");
        host.up("a");
        assert_eq!(count.get(), 1, "release must not fire");

        host.down("Control");
        host.down("a");
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_unregister_stops_firing() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let (handler, count) = counter();

        keys.register("ctrl + a", &handler);
        host.tap_chord(&["Control", "a"]);
        keys.unregister("ctrl + a", &handler);
        host.tap_chord(&["Control", "a"]);

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_case_and_whitespace_insensitive_binding() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let (handler, count) = counter();

        keys.register("ShiFt     +    A", &handler);
        host.tap_chord(&["Shift", "A"]);
        assert_eq!(count.get(), 1);

        keys.unregister("shIFt  +  a", &handler);
        host.tap_chord(&["Shift", "A"]);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_printable_repeat_fires_modifier_repeat_does_not() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let (handler, count) = counter();
        keys.register("shift + a", &handler);

        host.down("Shift");
        host.down("a");
        assert_eq!(count.get(), 1);

        host.down("a");
        host.down("a");
        host.down("a");
        assert_eq!(count.get(), 4, "auto-repeat of a printable key keeps firing");

        // Second physical Shift reports the same canonical key
        host.down("Shift");
        assert_eq!(count.get(), 4, "modifier repeat must not re-fire");
    }

    #[test]
    fn test_modifier_aliases() {
        let cases = [
            ("control + a", "Control"),
            ("ctrl + a", "Control"),
            ("meta + a", "Meta"),
            ("command + a", "Meta"),
            ("windows + a", "Meta"),
            ("cmd + a", "Meta"),
            ("alt + a", "Alt"),
            ("option + a", "Alt"),
        ];

        for (spec, modifier) in cases {
            let mut host = Host::new();
            let keys = Keybinding::new(&host.keyboard);
            let (handler, count) = counter();
            keys.register(spec, &handler);

            host.down(modifier);
            host.down("a");
            host.down("a");
            host.down(modifier);
            assert_eq!(count.get(), 2, "binding {spec:?}");
        }
    }

    #[test]
    fn test_special_keys() {
        let mut cases: Vec<(String, String)> = [
            ("left", "ArrowLeft"),
            ("up", "ArrowUp"),
            ("right", "ArrowRight"),
            ("down", "ArrowDown"),
            ("space", " "),
            ("esc", "Escape"),
            ("enter", "Enter"),
            ("tab", "Tab"),
            ("backspace", "Backspace"),
        ]
        .iter()
        .map(|(spec, raw)| (spec.to_string(), raw.to_string()))
        .collect();
        cases.extend((1..=12).map(|n| (format!("f{n}"), format!("F{n}"))));

        for (spec, raw) in &cases {
            let mut host = Host::new();
            let keys = Keybinding::new(&host.keyboard);
            let (handler, count) = counter();
            keys.register(spec, &handler);

            for _ in 0..4 {
                host.tap_chord(&[raw.as_str()]);
            }
            assert_eq!(count.get(), 4, "binding {spec:?}");

            keys.unregister(spec, &handler);
            host.tap_chord(&[raw.as_str()]);
            assert_eq!(count.get(), 4, "binding {spec:?} after unregister");
        }
    }

    #[test]
    fn test_shift_one_matches_exclamation() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let (handler, count) = counter();
        keys.register("shift+1", &handler);

        host.down("Shift");
        host.down("!");
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_modifier_only_binding_fires_on_fresh_press() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let (handler, count) = counter();
        keys.register("shift", &handler);

        host.down("Shift");
        host.down("Shift");
        host.down("Shift");
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_alternatives_share_handler() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let (handler, count) = counter();
        keys.register("ctrl+y, ctrl+shift+z", &handler);

        host.tap_chord(&["Control", "y"]);
        host.tap_chord(&["Control", "Shift", "z"]);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_duplicate_registration_fires_once() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let (handler, count) = counter();

        keys.register("f5", &handler);
        keys.register("F5", &handler);
        assert_eq!(keys.handler_count("f5"), 1);

        host.tap_chord(&["F5"]);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_same_handler_in_two_scopes() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let (handler, count) = counter();

        keys.register_scoped("f5", &handler, "s1");
        keys.register_scoped("f5", &handler, "s2");
        assert_eq!(keys.handler_count("f5"), 2);

        host.tap_chord(&["F5"]);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_unregister_only_exact_pair() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let (first, first_count) = counter();
        let (second, second_count) = counter();

        keys.register("ctrl+a", &first);
        keys.register("ctrl+a", &second);
        keys.register_scoped("ctrl+a", &first, "other");

        keys.unregister("ctrl+a", &first);
        host.tap_chord(&["Control", "a"]);

        assert_eq!(first_count.get(), 1, "'other' registration survives");
        assert_eq!(second_count.get(), 1);
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let keys = Keybinding::new(&Keyboard::new());
        let (handler, _) = counter();
        keys.unregister("ctrl+q", &handler);
        keys.unregister_scoped("not a key", &handler, "nowhere");
        assert_eq!(keys.handler_count("ctrl+q"), 0);
    }

    #[test]
    fn test_disable_single_scope() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let (c, c_count) = counter();
        let (d, d_count) = counter();
        keys.register_scoped("f5", &c, "s1");
        keys.register_scoped("f5", &d, "s2");

        keys.disable("s2");
        host.tap_chord(&["F5"]);

        assert_eq!(c_count.get(), 1);
        assert_eq!(d_count.get(), 0);
        assert!(keys.is_scope_disabled("s2"));
        assert!(!keys.is_scope_disabled("s1"));
    }

    #[test]
    fn test_default_disable_and_enable() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let (one, one_count) = counter();
        let (two, two_count) = counter();
        let (three, three_count) = counter();
        keys.register("ctrl + a", &one);
        keys.register_scoped("ctrl + a", &two, "scope2");
        keys.register_scoped("ctrl + a", &three, "scope3");

        host.tap_chord(&["Control", "a"]);
        keys.disable_all();
        host.tap_chord(&["Control", "a"]);
        keys.enable_all();
        host.tap_chord(&["Control", "a"]);

        assert_eq!(one_count.get(), 2);
        assert_eq!(two_count.get(), 2);
        assert_eq!(three_count.get(), 2);
    }

    #[test]
    fn test_enable_disable_with_parameter() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let (one, one_count) = counter();
        let (two, two_count) = counter();
        let (three, three_count) = counter();
        keys.register("ctrl + a", &one);
        keys.register_scoped("ctrl + a", &two, "scope2");
        keys.register_scoped("ctrl + a", &three, "scope3");

        host.tap_chord(&["Control", "a"]);
        keys.disable("scope2");
        host.tap_chord(&["Control", "a"]);
        keys.disable("scope3");
        host.tap_chord(&["Control", "a"]);
        keys.enable("all");
        host.tap_chord(&["Control", "a"]);

        assert_eq!(one_count.get(), 4);
        assert_eq!(two_count.get(), 2);
        assert_eq!(three_count.get(), 3);
    }

    #[test]
    fn test_disable_many_and_enable_list_with_all() {
        let keys = Keybinding::new(&Keyboard::new());
        keys.disable(["a", "b", "c"]);
        assert!(keys.is_scope_disabled("a"));
        assert!(keys.is_scope_disabled("c"));

        keys.enable(vec!["a"]);
        assert!(!keys.is_scope_disabled("a"));
        assert!(keys.is_scope_disabled("b"));

        keys.enable(["all", "b"]);
        assert!(!keys.is_scope_disabled("b"));
        assert!(!keys.is_scope_disabled("c"));
    }

    #[test]
    fn test_enable_list_short_circuits_after_all() {
        let keys = Keybinding::new(&Keyboard::new());
        keys.disable(["x", "y"]);
        // "y" is cleared by "all"; nothing after it is processed
        keys.enable(["x", "all", "y"]);
        assert!(!keys.is_scope_disabled("x"));
        assert!(!keys.is_scope_disabled("y"));
    }

    #[test]
    fn test_disable_all_string_suppresses_every_scope() {
        let keys = Keybinding::new(&Keyboard::new());
        keys.disable("all");
        assert!(keys.is_scope_disabled("default"));
        assert!(keys.is_scope_disabled("anything"));
    }

    #[test]
    fn test_destroy_stops_dispatch() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let (handler, count) = counter();
        keys.register("ctrl + a", &handler);

        host.tap_chord(&["Control", "a"]);
        host.tap_chord(&["Control", "a"]);
        assert_eq!(count.get(), 2);

        keys.destroy();
        assert!(!keys.is_active());
        assert_eq!(host.keyboard.engine_count(), 0);

        host.tap_chord(&["Control", "a"]);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_calls_after_destroy_are_noops() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let (handler, count) = counter();
        keys.destroy();

        keys.register("a", &handler);
        keys.disable("x");
        keys.enable_all();
        keys.unregister("a", &handler);
        keys.destroy();

        host.tap_chord(&["a"]);
        assert_eq!(count.get(), 0);
        assert_eq!(keys.handler_count("a"), 0);
        assert!(keys.pressed_keys().is_empty());
    }

    #[test]
    fn test_dropped_engine_receives_nothing() {
        let mut host = Host::new();
        let (handler, count) = counter();
        {
            let keys = Keybinding::new(&host.keyboard);
            keys.register("a", &handler);
        }
        host.tap_chord(&["a"]);
        assert_eq!(count.get(), 0);
        assert_eq!(host.keyboard.engine_count(), 0);
    }

    #[test]
    fn test_multiple_engines_share_pressed_state() {
        let mut host = Host::new();
        let first = Keybinding::new(&host.keyboard);
        let second = Keybinding::new(&host.keyboard);
        let (a, a_count) = counter();
        let (b, b_count) = counter();
        first.register("ctrl+a", &a);
        second.register("ctrl+a", &b);

        host.down("Control");
        assert_eq!(first.pressed_keys(), second.pressed_keys());
        host.down("a");
        assert_eq!(a_count.get(), 1);
        assert_eq!(b_count.get(), 1);

        first.disable_all();
        host.up("a");
        host.down("a");
        assert_eq!(a_count.get(), 1, "disabled engine stays silent");
        assert_eq!(b_count.get(), 2, "other engine is unaffected");
    }

    #[test]
    fn test_failing_handler_does_not_block_siblings() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let failing = Handler::new(|_| Err(HandlerError::msg("boom")));
        let (after, after_count) = counter();
        keys.register("a", &failing);
        keys.register("a", &after);

        let result = host.down("a");
        assert_eq!(after_count.get(), 1);
        match result {
            KeyDown::Pressed { report, .. } => {
                assert_eq!(report.invoked, 2);
                assert_eq!(report.faults.len(), 1);
                assert!(report.faults[0].to_string().contains("boom"));
                assert_eq!(report.faults[0].scope(), DEFAULT_SCOPE);
            }
            KeyDown::Ignored => panic!("key should be supported"),
        }
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let panicking = Handler::infallible(|_| panic!("handler exploded"));
        let (after, after_count) = counter();
        keys.register("b", &panicking);
        keys.register("b", &after);

        let result = host.down("b");
        assert_eq!(after_count.get(), 1);
        match result {
            KeyDown::Pressed { report, .. } => {
                assert!(matches!(
                    &report.faults[..],
                    [DispatchFault::Panicked { message, .. }] if message.contains("exploded")
                ));
            }
            KeyDown::Ignored => panic!("key should be supported"),
        }
    }

    #[test]
    fn test_handler_receives_engine_and_can_call_back() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let (later, later_count) = counter();
        let disabler = Handler::infallible(|engine| engine.disable("late"));
        keys.register("a", &disabler);
        keys.register_scoped("a", &later, "late");

        host.down("a");
        assert_eq!(later_count.get(), 0, "scope disabled earlier in the same dispatch");
        assert!(keys.is_scope_disabled("late"));
    }

    #[test]
    fn test_destroy_from_handler_stops_remaining() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let (later, later_count) = counter();
        let destroyer = Handler::infallible(|engine| engine.destroy());
        keys.register("a", &destroyer);
        keys.register("a", &later);

        host.down("a");
        assert_eq!(later_count.get(), 0);
        assert!(!keys.is_active());
    }

    #[test]
    fn test_handler_sees_live_fingerprint() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let seen = Rc::new(RefCell::new(String::new()));
        let sink = Rc::clone(&seen);
        let handler = Handler::infallible(move |engine| {
            *sink.borrow_mut() = engine.pressed_keys().to_string();
        });
        keys.register("ctrl+a", &handler);

        host.down("Control");
        host.down("a");
        assert_eq!(seen.borrow().as_str(), "Controla");
    }

    #[test]
    fn test_filter_editable_skips_dispatch() {
        let mut host = Host::new();
        let editing = Rc::new(Cell::new(true));
        let probe = Rc::clone(&editing);
        host.keyboard.set_focus_probe(move || probe.get());

        let filtered = Keybinding::new(&host.keyboard);
        let unfiltered = Keybinding::with_options(
            &host.keyboard,
            KeybindingOptions {
                filter_editable: false,
                ..KeybindingOptions::default()
            },
        );
        let (a, a_count) = counter();
        let (b, b_count) = counter();
        filtered.register("a", &a);
        unfiltered.register("a", &b);

        host.tap_chord(&["a"]);
        assert_eq!(a_count.get(), 0);
        assert_eq!(b_count.get(), 1);

        editing.set(false);
        host.tap_chord(&["a"]);
        assert_eq!(a_count.get(), 1);
        assert_eq!(b_count.get(), 2);
    }

    #[test]
    fn test_repeat_policy_always_refires_modifier() {
        let mut host = Host::new();
        let keys = Keybinding::with_options(
            &host.keyboard,
            KeybindingOptions {
                repeat: RepeatPolicy::Always,
                ..KeybindingOptions::default()
            },
        );
        let (handler, count) = counter();
        keys.register("shift", &handler);

        host.down("Shift");
        host.down("Shift");
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_repeat_policy_never_ignores_autorepeat() {
        let mut host = Host::new();
        let keys = Keybinding::with_options(
            &host.keyboard,
            KeybindingOptions {
                repeat: RepeatPolicy::Never,
                ..KeybindingOptions::default()
            },
        );
        let (handler, count) = counter();
        keys.register("a", &handler);

        host.down("a");
        host.down("a");
        host.down("a");
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_extra_key_prevents_match() {
        let mut host = Host::new();
        let keys = Keybinding::new(&host.keyboard);
        let (handler, count) = counter();
        keys.register("ctrl+a", &handler);

        host.down("Control");
        host.down("Shift");
        host.down("a");
        assert_eq!(count.get(), 0, "Ctrl+Shift+A is not Ctrl+A");
    }

    #[test]
    fn test_swallowed_modifier_release_keeps_chord() {
        let keyboard = Keyboard::new();
        let keys = Keybinding::new(&keyboard);
        let (handler, count) = counter();
        keys.register("meta+k", &handler);

        let meta = ModifierState::NONE.with(Modifier::Meta);
        keyboard.key_down(&KeyEvent::new("Meta", meta));
        keyboard.key_down(&KeyEvent::new("k", meta));
        assert_eq!(count.get(), 1);

        // A stray Meta up arrives while the platform still reports Meta held
        keyboard.key_up(&KeyEvent::new("Meta", meta));
        keyboard.key_up(&KeyEvent::new("k", meta));
        keyboard.key_down(&KeyEvent::new("k", meta));
        assert_eq!(count.get(), 2, "Meta is still physically down");
    }
}
