//! Paging through instruction screens before a block of trials.
//!
//! Rendering and keyboard input belong to whatever presentation toolkit the
//! experiment runs on; this module only owns the paging rules and talks to the
//! toolkit through [`InstructionDisplay`].

use log::debug;
use serde::{Deserialize, Serialize};

/// The presentation surface instructions are shown on
pub trait InstructionDisplay {
    type Page;

    /// Render `page` into the back buffer.
    fn draw(&mut self, page: &Self::Page);

    /// Make the last drawn page visible.
    fn flip(&mut self);

    /// Block until one of `keys` is pressed and return it.
    fn wait_for_key(&mut self, keys: &[&str]) -> String;

    /// Shut the experiment down after an abort.
    fn quit(&mut self);
}

/// Keys understood by the pager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub previous: String,
    pub next: String,
    pub abort: String,
    pub begin: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            previous: "left".to_string(),
            next: "right".to_string(),
            abort: "escape".to_string(),
            begin: "space".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The begin key was pressed on the last page
    Completed,
    /// The abort key was pressed; `quit()` has been called
    Aborted,
}

/// Show `pages` until the participant begins the block or aborts.
///
/// Previous and next stop at the first and last page. Begin only counts on the
/// last page; anywhere else, as with any unbound key, the page is redrawn.
pub fn navigate_instructions<D: InstructionDisplay>(
    display: &mut D,
    pages: &[D::Page],
    keys: &KeyBindings,
) -> NavigationOutcome {
    if pages.is_empty() {
        return NavigationOutcome::Completed;
    }
    let last = pages.len() - 1;
    let accepted = [
        keys.previous.as_str(),
        keys.next.as_str(),
        keys.abort.as_str(),
        keys.begin.as_str(),
    ];

    let mut page = 0;
    loop {
        display.draw(&pages[page]);
        display.flip();
        let key = display.wait_for_key(&accepted);

        if key == keys.previous {
            page = page.saturating_sub(1);
        } else if key == keys.next {
            page = (page + 1).min(last);
        } else if key == keys.abort {
            debug!("instructions aborted on page {}", page);
            display.quit();
            return NavigationOutcome::Aborted;
        } else if key == keys.begin && page == last {
            return NavigationOutcome::Completed;
        }
    }
}
