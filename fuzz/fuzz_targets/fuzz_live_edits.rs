//! Fuzz target for the playground event loop.
//!
//! Drives a playground with an arbitrary sequence of user actions and checks
//! that the state and the live surface agree once the loop is idle.

#![no_main]

use alert_banner::{Playground, PlaygroundOptions, Variant};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Action {
    Edit(String),
    Type(String),
    Variant(u8),
    ToggleTheme,
    Resize(u16),
    Pump(u8),
}

fuzz_target!(|actions: Vec<Action>| {
    let mut playground = Playground::new(PlaygroundOptions::default().max_tasks_per_turn(64));
    playground.run_until_idle();

    for action in actions.into_iter().take(32) {
        match action {
            Action::Edit(html) => {
                let _ = playground.edit_live_text(&html);
            }
            Action::Type(text) => {
                let _ = playground.type_live_text(&text);
            }
            Action::Variant(n) => {
                playground.select_variant(Variant::ALL[usize::from(n) % Variant::ALL.len()]);
            }
            Action::ToggleTheme => {
                playground.toggle_theme();
            }
            Action::Resize(width) => {
                let _ = playground.resize_live(f64::from(width));
            }
            Action::Pump(n) => {
                for _ in 0..n % 4 {
                    playground.run_until_idle();
                }
            }
        }
    }

    while playground.run_until_idle() > 0 {}
    assert!(playground.source().starts_with("<svg"));
    assert!(!playground.host().has_work());
});
