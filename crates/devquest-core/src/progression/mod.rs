//! Experience, leveling and the burnout health metric.

mod account;
mod policy;

pub use account::{BurnoutStatus, ProgressionAccount, XpAward};
pub use policy::ProgressionPolicy;
