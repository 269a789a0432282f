use clap::Subcommand;
use devquest_core::DifficultyTier;

use super::{load_engine, print_events, resolve_subtask, resolve_task, save_engine, CmdResult};

#[derive(Subcommand)]
pub enum QuestAction {
    /// Add a new quest
    Add {
        /// Quest title
        title: String,
        /// Free-form notes
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// List quests as JSON
    List {
        /// Include completed quests
        #[arg(long)]
        all: bool,
    },
    /// Show one quest with its sub-quests
    Show {
        /// Quest ID or unique prefix
        id: String,
    },
    /// Start the quest's own work timer
    Start { id: String },
    /// Stop the quest's own work timer
    Stop { id: String },
    /// Complete the quest and claim its XP
    Complete { id: String },
    /// Reopen a completed quest, reverting its XP
    Reopen { id: String },
    /// Delete a quest and its sub-quests
    Delete { id: String },
    /// Sub-quest management
    Sub {
        #[command(subcommand)]
        action: SubAction,
    },
}

#[derive(Subcommand)]
pub enum SubAction {
    /// Add a sub-quest
    Add {
        /// Parent quest ID or prefix
        quest: String,
        /// Sub-quest title
        title: String,
        /// routine, complex or legacy
        #[arg(long, default_value = "routine")]
        tier: DifficultyTier,
    },
    /// Check or un-check a sub-quest
    Toggle { quest: String, sub: String },
    /// Start a sub-quest timer
    Start { quest: String, sub: String },
    /// Stop a sub-quest timer
    Stop { quest: String, sub: String },
}

pub fn run(action: QuestAction) -> CmdResult {
    let (db, mut engine) = load_engine()?;

    let events = match action {
        QuestAction::Add { title, notes } => {
            let id = engine.add_task(&title, &notes)?;
            save_engine(&db, &engine, &[])?;
            println!("{id}");
            return Ok(());
        }
        QuestAction::List { all } => {
            let views: Vec<_> = engine
                .task_views()
                .into_iter()
                .filter(|v| all || !v.completed)
                .collect();
            println!("{}", serde_json::to_string_pretty(&views)?);
            return Ok(());
        }
        QuestAction::Show { id } => {
            let id = resolve_task(&engine, &id)?;
            println!("{}", serde_json::to_string_pretty(&engine.task_view(id))?);
            return Ok(());
        }
        QuestAction::Start { id } => {
            let id = resolve_task(&engine, &id)?;
            engine.start_task_timer(id)
        }
        QuestAction::Stop { id } => {
            let id = resolve_task(&engine, &id)?;
            engine.stop_task_timer(id)
        }
        QuestAction::Complete { id } => {
            let id = resolve_task(&engine, &id)?;
            engine.complete_task(id)
        }
        QuestAction::Reopen { id } => {
            let id = resolve_task(&engine, &id)?;
            engine.reopen_task(id)
        }
        QuestAction::Delete { id } => {
            let id = resolve_task(&engine, &id)?;
            if let Some(task) = engine.remove_task(id) {
                save_engine(&db, &engine, &[])?;
                tracing::info!(quest = %task.id, title = %task.title, "quest deleted");
                println!("deleted {}", task.id);
            }
            return Ok(());
        }
        QuestAction::Sub { action } => match action {
            SubAction::Add { quest, title, tier } => {
                let quest = resolve_task(&engine, &quest)?;
                if let Some(id) = engine.add_subtask(quest, &title, tier)? {
                    save_engine(&db, &engine, &[])?;
                    println!("{id}");
                }
                return Ok(());
            }
            SubAction::Toggle { quest, sub } => {
                let quest = resolve_task(&engine, &quest)?;
                let sub = resolve_subtask(&engine, quest, &sub)?;
                engine.toggle_subtask(quest, sub)
            }
            SubAction::Start { quest, sub } => {
                let quest = resolve_task(&engine, &quest)?;
                let sub = resolve_subtask(&engine, quest, &sub)?;
                engine.start_subtask_timer(quest, sub)
            }
            SubAction::Stop { quest, sub } => {
                let quest = resolve_task(&engine, &quest)?;
                let sub = resolve_subtask(&engine, quest, &sub)?;
                engine.stop_subtask_timer(quest, sub)
            }
        },
    };

    save_engine(&db, &engine, &events)?;
    print_events(&events)
}
