//! Foreground focus session.
//!
//! The session is driven by a one-second interval. Commands are read line by
//! line from stdin while it runs:
//!
//! | input | action                |
//! |-------|-----------------------|
//! | `p`   | pause                 |
//! | `r`   | resume / start        |
//! | `s`   | skip the current break|
//! | `c`   | complete early        |
//! | `q`   | quit                  |
//!
//! Every event is printed as one JSON line on stdout.
//!
//! The session holds the focus lease in the database for as long as it
//! runs, so other commands cannot change the profile underneath it.

use std::time::Duration;

use clap::Subcommand;
use devquest_core::{Clock, Config, Database, Engine, Event, FocusPhase, SystemClock};
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use super::{commit_engine, print_events, resolve_task, restore_engine, CmdResult};

#[derive(Subcommand)]
pub enum FocusAction {
    /// Run a focus session in the foreground
    Run {
        /// Count up without a fixed length
        #[arg(long)]
        flow: bool,
        /// Quest to watch for overtime and finish on early completion
        #[arg(long)]
        quest: Option<String>,
        /// Stop after this many completed focus phases
        #[arg(long)]
        cycles: Option<u32>,
    },
    /// Print the focus settings in effect
    Status,
}

pub fn run(action: FocusAction) -> CmdResult {
    match action {
        FocusAction::Run { flow, quest, cycles } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let result = runtime.block_on(run_session(flow, quest, cycles));
            // A pending stdin read cannot be cancelled.
            runtime.shutdown_timeout(Duration::from_millis(100));
            result
        }
        FocusAction::Status => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config.focus)?);
            Ok(())
        }
    }
}

enum Control {
    Continue,
    Quit,
}

/// The database plus the lease this session writes under.
struct Store {
    db: Database,
    lease: Uuid,
}

async fn run_session(flow: bool, quest: Option<String>, cycles: Option<u32>) -> CmdResult {
    let store = Store {
        db: Database::open()?,
        lease: Uuid::new_v4(),
    };
    store.db.hold_focus_lease(store.lease, SystemClock.now())?;
    let result = drive(&store, flow, quest, cycles).await;
    if let Err(e) = store.db.release_focus_lease(store.lease) {
        tracing::warn!(error = %e, "failed to release focus lease");
    }
    result
}

async fn drive(store: &Store, flow: bool, quest: Option<String>, cycles: Option<u32>) -> CmdResult {
    let mut engine = restore_engine(&store.db)?;

    if let Some(quest) = quest {
        let id = resolve_task(&engine, &quest)?;
        engine.link_focus(Some(id));
    }
    let started = if flow {
        engine.focus_start_flow()
    } else {
        engine.focus_start()
    };
    emit(store, &engine, &started)?;

    let mut interval = tokio::time::interval(Duration::from_secs(1));
    // The first tick of a tokio interval completes immediately.
    interval.tick().await;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut completed_focus = 0u32;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let events = engine.tick();
                completed_focus += events
                    .iter()
                    .filter(|e| matches!(e, Event::FocusCompleted { .. }))
                    .count() as u32;
                emit(store, &engine, &events)?;
                if cycles.is_some_and(|n| completed_focus >= n) {
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(line) => {
                        if let Control::Quit = handle_command(store, &mut engine, line.trim())? {
                            break;
                        }
                    }
                    None => stdin_open = false,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted");
                break;
            }
        }

        if engine.focus_phase() == FocusPhase::Idle {
            break;
        }
    }

    if engine.focus_phase() != FocusPhase::Idle {
        let events = engine.focus_reset();
        emit(store, &engine, &events)?;
    }
    Ok(())
}

fn handle_command(store: &Store, engine: &mut Engine<SystemClock>, input: &str) -> CmdResult<Control> {
    let events = match input {
        "p" => engine.focus_pause(),
        "r" => engine.focus_start(),
        "s" => engine.focus_skip_break(),
        "c" => engine.focus_complete_early(),
        "q" => return Ok(Control::Quit),
        "" => Vec::new(),
        other => {
            eprintln!("unknown command: {other} (p, r, s, c, q)");
            Vec::new()
        }
    };
    emit(store, engine, &events)?;
    Ok(Control::Continue)
}

/// Save and print `events`. With nothing to save, only the lease heartbeat
/// is refreshed.
fn emit(store: &Store, engine: &Engine<SystemClock>, events: &[Event]) -> CmdResult {
    if events.is_empty() {
        store.db.hold_focus_lease(store.lease, engine.now())?;
        return Ok(());
    }
    commit_engine(&store.db, engine, events, Some(store.lease))?;
    print_events(events)
}
