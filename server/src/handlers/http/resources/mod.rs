pub mod quicklinks;
pub mod schedules;
