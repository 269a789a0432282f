use clap::Subcommand;

use super::{load_engine, print_events, save_engine, CmdResult};

#[derive(Subcommand)]
pub enum ArcadeAction {
    /// Report a finished mini-game
    Report {
        /// XP earned in the game
        #[arg(long, default_value = "0")]
        xp: u64,
        /// Burnout reduction earned, 0.0 to 1.0
        #[arg(long, default_value = "0")]
        burnout: f64,
    },
}

pub fn run(action: ArcadeAction) -> CmdResult {
    match action {
        ArcadeAction::Report { xp, burnout } => {
            if !burnout.is_finite() || !(0.0..=1.0).contains(&burnout) {
                return Err(devquest_core::ValidationError::InvalidValue {
                    field: "burnout".into(),
                    message: format!("{burnout} is outside 0.0..=1.0"),
                }
                .into());
            }
            let (db, mut engine) = load_engine()?;
            let events = engine.report_arcade(xp, burnout);
            save_engine(&db, &engine, &events)?;
            print_events(&events)?;
        }
    }
    Ok(())
}
