pub mod document;
pub mod fields;
pub mod setup;
pub mod show;
pub mod ui;
pub mod watch;
pub mod widgets;
