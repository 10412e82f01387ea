pub mod debugger;
pub mod playground;
pub mod ui;
