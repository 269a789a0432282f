//! Progression profile commands.

use clap::Subcommand;
use devquest_core::{Clock, Config, Database, ProgressionAccount, QuestBoard, SystemClock};

use super::{load_engine, save_engine, CmdResult};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show level, XP, currency and burnout
    Status,
    /// Start over with a fresh profile
    Reset {
        /// Also delete every quest
        #[arg(long)]
        quests: bool,
    },
}

pub fn run(action: ProfileAction) -> CmdResult {
    match action {
        ProfileAction::Status => {
            let (db, mut engine) = load_engine()?;
            let events = engine.decay_burnout();
            // Decay is recomputed on the next load; a running focus session
            // owns the profile.
            if !events.is_empty() && !db.focus_lease_active(engine.now())? {
                save_engine(&db, &engine, &events)?;
            }
            println!("{}", serde_json::to_string_pretty(&engine.status())?);
        }
        ProfileAction::Reset { quests } => {
            let config = Config::load()?;
            let db = Database::open()?;
            let now = SystemClock.now();
            let account = ProgressionAccount::new(&config.progression, now);
            let board = if quests {
                QuestBoard::new()
            } else {
                db.load_board()?
            };
            db.commit_state(&account, &board, &[], None, now)?;
            tracing::info!(quests, "profile reset");
            println!("profile reset");
        }
    }
    Ok(())
}
