//! Built-in processing nodes

mod off_screen_pass;
mod screen_pass;
mod present_pass;

pub use off_screen_pass::OffScreenPass;
pub use screen_pass::ScreenPass;
pub use present_pass::PresentPass;

#[cfg(test)]
#[path = "nodes_tests.rs"]
mod tests;
