use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;

use pane_engine::{ActionRequest, PaneConfig, PaneController, Readiness, WidgetRegistry};

/// Widget types the headless driver knows how to "build".
const WIDGET_TYPES: [&str; 3] = ["editor", "terminal", "explorer"];

fn main() -> anyhow::Result<()> {
    if std::env::args().any(|a| a == "--help" || a == "-h") {
        println!("usage: pane-engine [CONFIG.toml] < actions.jsonl");
        println!("Reads one JSON action request per line, prints events as JSON lines,");
        println!("then prints the final layout state.");
        return Ok(());
    }

    env_logger::init();
    log::info!("pane-engine v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => PaneConfig::load(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PaneConfig::default(),
    };

    let widgets = WidgetRegistry::new(WIDGET_TYPES, Readiness::Ready);
    let mut controller = PaneController::new(config, widgets);

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for (lineno, line) in stdin.lock().lines().enumerate() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        match ActionRequest::from_json(&line) {
            Ok(request) => {
                if !controller.handle_request(request) {
                    log::warn!("line {}: action not applied", lineno + 1);
                }
            }
            Err(e) => log::warn!("line {}: {e}", lineno + 1),
        }
        flush_events(&mut controller, &mut out, Instant::now())?;
    }

    // Let every deferred focus announcement fire before the final snapshot.
    if let Some(deadline) = controller.next_focus_deadline() {
        flush_events(&mut controller, &mut out, deadline)?;
    }

    let state = controller.get_state().to_json()?;
    writeln!(out, "{state}")?;
    controller.shutdown();
    Ok(())
}

fn flush_events(
    controller: &mut PaneController<WidgetRegistry>,
    out: &mut impl Write,
    now: Instant,
) -> anyhow::Result<()> {
    controller.poll(now);
    for event in controller.drain_events() {
        writeln!(out, "{}", serde_json::to_string(&event)?)?;
    }
    Ok(())
}
