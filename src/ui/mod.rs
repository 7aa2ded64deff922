//! Terminal front ends: signed-in pages and the numbered admin menu

mod console;
mod menu;
mod pages;

pub use console::Console;
pub use menu::main_menu;
pub use pages::run_app;
