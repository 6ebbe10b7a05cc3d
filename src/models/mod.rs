pub mod delivery;
pub mod history;
pub mod rider;
