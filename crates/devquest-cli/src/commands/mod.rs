pub mod arcade;
pub mod config;
pub mod focus;
pub mod profile;
pub mod quest;
pub mod stats;

use devquest_core::{
    Clock, Config, CoreError, Database, Engine, Event, ProgressionAccount, SystemClock,
};
use uuid::Uuid;

pub type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Open the database and rebuild the engine from the saved profile.
pub fn load_engine() -> CmdResult<(Database, Engine<SystemClock>)> {
    let db = Database::open()?;
    let engine = restore_engine(&db)?;
    Ok((db, engine))
}

/// Rebuild the engine from what `db` holds. A missing profile starts a
/// fresh account.
pub fn restore_engine(db: &Database) -> CmdResult<Engine<SystemClock>> {
    let config = Config::load()?;
    let clock = SystemClock;
    let account = match db.load_account()? {
        Some(account) => account,
        None => ProgressionAccount::new(&config.progression, clock.now()),
    };
    let board = db.load_board()?;
    Ok(Engine::with_state(config, clock, account, board))
}

/// Persist the profile and log any work sessions the events describe.
///
/// Fails while a focus session owns the profile.
pub fn save_engine(db: &Database, engine: &Engine<SystemClock>, events: &[Event]) -> CmdResult {
    commit_engine(db, engine, events, None)
}

/// Like [`save_engine`], on behalf of the focus lease `lease`.
pub fn commit_engine(
    db: &Database,
    engine: &Engine<SystemClock>,
    events: &[Event],
    lease: Option<Uuid>,
) -> CmdResult {
    let logged = db.commit_state(engine.account(), engine.board(), events, lease, engine.now())?;
    if logged > 0 {
        tracing::debug!(logged, "work sessions recorded");
    }
    Ok(())
}

pub fn print_events(events: &[Event]) -> CmdResult {
    for event in events {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}

/// Accept a full id or any unique prefix of one.
pub fn resolve_task(engine: &Engine<SystemClock>, id: &str) -> CmdResult<Uuid> {
    if let Ok(uuid) = Uuid::parse_str(id) {
        if engine.board().get(uuid).is_some() {
            return Ok(uuid);
        }
    }
    engine.board().find_by_prefix(id).ok_or_else(|| {
        CoreError::NotFound {
            kind: "quest",
            id: id.to_string(),
        }
        .into()
    })
}

pub fn resolve_subtask(engine: &Engine<SystemClock>, task_id: Uuid, id: &str) -> CmdResult<Uuid> {
    let not_found = || -> Box<dyn std::error::Error> {
        CoreError::NotFound {
            kind: "sub-quest",
            id: id.to_string(),
        }
        .into()
    };
    let prefix = id.trim().to_ascii_lowercase();
    if prefix.is_empty() {
        return Err(not_found());
    }
    let task = engine.board().get(task_id).ok_or_else(not_found)?;
    let matches: Vec<Uuid> = task
        .subtasks
        .iter()
        .filter(|s| s.id.to_string().starts_with(&prefix))
        .map(|s| s.id)
        .collect();
    match matches.as_slice() {
        [only] => Ok(*only),
        _ => Err(not_found()),
    }
}
