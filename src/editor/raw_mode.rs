use std::io;
use std::sync::Once;

use crossterm::terminal;

static SET_PANIC_HOOK: Once = Once::new();

/// Keeps the terminal in raw mode while alive.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enter() -> io::Result<Self> {
        // a panic while editing must not leave the terminal raw
        SET_PANIC_HOOK.call_once(|| {
            let prev = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                let _ = terminal::disable_raw_mode();
                prev(info);
            }));
        });

        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            tracing::warn!("failed to leave raw mode: {}", e);
        }
    }
}
