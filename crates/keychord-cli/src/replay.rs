//! Event-script replay
//!
//! A script is JSON lines, one key event per line:
//!
//! ```text
//! {"down": "Control"}
//! {"down": "s"}
//! {"up": "s"}
//! {"up": "Control", "modifiers": []}
//! ```
//!
//! Without an explicit `"modifiers"` list the live flags are derived from
//! the script itself. Each distinct modifier key name is one physical key:
//! repeated `down` lines for it are auto-repeat and its first `up` releases
//! it. Sided names (`"ShiftLeft"`, `"MetaRight"`, ...) tell two physical
//! keys of the same modifier apart and reach the engine as the plain
//! modifier name. Blank lines and lines starting with `#` are skipped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use keychord::{Handler, KeyDown, KeyEvent, Keybinding, Keyboard, Modifier, ModifierState};
use keychord_config::Config;
use miette::{miette, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptLine {
    down: Option<String>,
    up: Option<String>,
    modifiers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Down,
    Up,
}

/// One parsed script step.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScriptEvent {
    line: usize,
    direction: Direction,
    key: String,
    modifiers: Option<ModifierState>,
}

/// An action fired during replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiredAction {
    pub line: usize,
    pub action: String,
    pub scope: String,
    pub keys: String,
}

/// A handler fault captured during replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayFault {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ReplayOutcome {
    pub fired: Vec<FiredAction>,
    pub faults: Vec<ReplayFault>,
}

fn parse_modifiers(names: &[String], line: usize) -> Result<ModifierState> {
    let mut state = ModifierState::NONE;
    for name in names {
        let modifier = Modifier::from_flag_name(name)
            .ok_or_else(|| miette!("line {}: unknown modifier flag '{}'", line, name))?;
        state.set(modifier, true);
    }
    Ok(state)
}

fn parse_script(script: &str) -> Result<Vec<ScriptEvent>> {
    let mut events = Vec::new();

    for (idx, raw) in script.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let parsed: ScriptLine = serde_json::from_str(trimmed)
            .map_err(|e| miette!("line {}: invalid event: {}", line, e))?;

        let (direction, key) = match (parsed.down, parsed.up) {
            (Some(key), None) => (Direction::Down, key),
            (None, Some(key)) => (Direction::Up, key),
            _ => {
                return Err(miette!(
                    "line {}: expected exactly one of \"down\" or \"up\"",
                    line
                ))
            }
        };

        let modifiers = parsed
            .modifiers
            .as_deref()
            .map(|names| parse_modifiers(names, line))
            .transpose()?;

        events.push(ScriptEvent {
            line,
            direction,
            key,
            modifiers,
        });
    }

    Ok(events)
}

/// The modifier a script key drives, accepting `Left`/`Right` suffixes.
fn physical_modifier(key: &str) -> Option<Modifier> {
    let lower = key.to_lowercase();
    let base = lower
        .strip_suffix("left")
        .or_else(|| lower.strip_suffix("right"))
        .filter(|base| !base.is_empty())
        .unwrap_or(lower.as_str());
    keychord::canonicalize(base).modifier()
}

/// Derives live flags from the physical modifier keys currently down.
#[derive(Debug, Default)]
struct HeldModifiers {
    held: HashMap<String, Modifier>,
}

impl HeldModifiers {
    /// Update the held set and return the live flags plus the identifier
    /// to hand to the keyboard.
    fn apply(&mut self, event: &ScriptEvent) -> (ModifierState, String) {
        let Some(modifier) = physical_modifier(&event.key) else {
            return (self.flags(), event.key.clone());
        };

        let physical = event.key.to_lowercase();
        match event.direction {
            Direction::Down => {
                self.held.insert(physical, modifier);
            }
            Direction::Up => {
                self.held.remove(&physical);
            }
        }
        (self.flags(), modifier.key_name().to_string())
    }

    fn flags(&self) -> ModifierState {
        let mut state = ModifierState::NONE;
        for modifier in self.held.values() {
            state.set(*modifier, true);
        }
        state
    }
}

/// Feed `script` through an engine built from `config`.
pub fn run(config: &Config, script: &str) -> Result<ReplayOutcome> {
    let events = parse_script(script)?;

    let keyboard = Keyboard::new();
    let engine = Keybinding::with_options(&keyboard, config.options.to_engine_options());

    let current_line = Rc::new(RefCell::new(0usize));
    let fired = Rc::new(RefCell::new(Vec::new()));

    config.install(&engine, |scope, binding| {
        let line = Rc::clone(&current_line);
        let fired = Rc::clone(&fired);
        let action = FiredAction {
            line: 0,
            action: binding.action.clone(),
            scope: scope.name.clone(),
            keys: binding.keys.clone(),
        };
        Handler::infallible(move |_| {
            fired.borrow_mut().push(FiredAction {
                line: *line.borrow(),
                ..action.clone()
            });
        })
    });

    let mut held = HeldModifiers::default();
    let mut faults = Vec::new();

    for event in &events {
        *current_line.borrow_mut() = event.line;
        let (derived, key) = held.apply(event);
        let key_event = KeyEvent::new(key, event.modifiers.unwrap_or(derived));

        match event.direction {
            Direction::Down => {
                if let KeyDown::Pressed { report, .. } = keyboard.key_down(&key_event) {
                    faults.extend(report.faults.iter().map(|fault| ReplayFault {
                        line: event.line,
                        message: fault.to_string(),
                    }));
                }
            }
            Direction::Up => {
                let outcome = keyboard.key_up(&key_event);
                tracing::debug!("line {}: {:?}", event.line, outcome);
            }
        }
    }

    engine.destroy();
    let fired = fired.borrow().clone();
    Ok(ReplayOutcome { fired, faults })
}
