//! Live evdev listening

use std::path::Path;

use anyhow::{Context, Result};
use evdev::InputEventKind;
use keychord::{Handler, Keybinding, Keyboard};
use keychord_config::Config;

use crate::device;
use crate::keymap::{KeyTranslator, RawKeyEvent};

/// Read `device_path` until Ctrl-C, printing every action that fires.
pub fn run(config: &Config, device_path: &Path) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;

    runtime.block_on(listen(config, device_path))
}

async fn listen(config: &Config, device_path: &Path) -> Result<()> {
    let device = device::open_keyboard(device_path)?;
    let mut stream = device.into_event_stream().with_context(|| {
        format!(
            "Failed to create event stream for {}",
            device_path.display()
        )
    })?;

    let keyboard = Keyboard::new();
    let engine = Keybinding::with_options(&keyboard, config.options.to_engine_options());
    let installed = config.install(&engine, |scope, binding| {
        let line = format!("{} -> {} [{}]", binding.keys, binding.action, scope.name);
        Handler::infallible(move |_| println!("{}", line))
    });

    println!(
        "Listening on {} with {} binding(s). Press Ctrl-C to stop.",
        device_path.display(),
        installed
    );

    let mut translator = KeyTranslator::default();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl-C")?;
                tracing::info!("Interrupted, shutting down");
                break;
            }
            event = stream.next_event() => {
                let event = event.context("Failed to read input event")?;
                let InputEventKind::Key(key) = event.kind() else {
                    continue;
                };
                match translator.translate(key, event.value()) {
                    Some(RawKeyEvent::Down(e)) => {
                        keyboard.key_down(&e);
                    }
                    Some(RawKeyEvent::Up(e)) => {
                        keyboard.key_up(&e);
                    }
                    None => {}
                }
            }
        }
    }

    engine.destroy();
    Ok(())
}
