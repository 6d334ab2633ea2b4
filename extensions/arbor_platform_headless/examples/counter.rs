//! Counter Demo
//!
//! Mounts a small counter app on the headless platform, taps its buttons and
//! prints the view tree after every main-loop turn.
//!
//! Run with: RUST_LOG=arbor_core=debug cargo run -p arbor_platform_headless --example counter

use anyhow::Result;
use arbor_core::prelude::*;
use arbor_platform_headless::prelude::*;

#[derive(Debug)]
struct CounterApp {
    count: State<i32>,
    step: State<i32>,
}

impl Component for CounterApp {
    fn properties(&self) -> Vec<PropertyRef<'_>> {
        vec![self.count.as_property(), self.step.as_property()]
    }

    fn body(&self) -> Element {
        let count = self.count.get();
        let step = self.step.get();
        let increment = self.count.clone();
        let decrement = self.count.clone();
        let bigger_steps = self.step.clone();

        vstack([
            text(format!("Count: {count}")).card(),
            hstack([
                button("-", move || decrement.update(|n| n - step)),
                spacer(),
                button("+", move || increment.update(|n| n + step)),
            ])
            .spacing(4.0)
            .into(),
            button(format!("Step: {step}"), move || bigger_steps.update(|s| s * 2))
                .disabled(step >= 8),
        ])
        .spacing(8.0)
        .into()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let app = HeadlessApp::new();
    app.mount(Element::composite(CounterApp {
        count: State::new(0),
        step: State::new(1),
    }))?;
    println!("{}", app.render_tree()?);

    for label in ["+", "+", "Step: 1", "+", "-"] {
        app.tap_text(label)?;
        app.run_until_idle();
        println!("after tapping {label:?}:\n{}", app.render_tree()?);
    }

    let stats = app.reconciler().stats()?;
    tracing::info!(
        "{} mounted, {} updated, {} flushes",
        stats.mounted,
        stats.updated,
        stats.flushes
    );
    Ok(())
}
