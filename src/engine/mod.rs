pub mod fee;
pub mod lifecycle;
pub mod tracking;
pub mod transitions;
