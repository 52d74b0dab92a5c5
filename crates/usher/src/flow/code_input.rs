//! Segmented one-time code entry.
//!
//! A fixed row of six single-digit cells with auto-advance, backspace
//! navigation, and bulk paste. Mirrors the on-screen widget cell for cell
//! so the server and the client never disagree about what was typed.

use vouch_common::constants::CODE_LENGTH;

/// Ordered fixed-width sequence of single-digit cells plus a focus index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeInput {
    cells: [Option<char>; CODE_LENGTH],
    focus: usize,
}

impl CodeInput {
    pub fn new() -> Self {
        Self {
            cells: [None; CODE_LENGTH],
            focus: 0,
        }
    }

    /// Write a digit into the focused cell and advance focus.
    ///
    /// Focus never moves past the last cell. Non-digit characters are
    /// rejected and leave the input untouched.
    pub fn enter(&mut self, ch: char) -> bool {
        if !ch.is_ascii_digit() {
            return false;
        }
        self.cells[self.focus] = Some(ch);
        if self.focus + 1 < CODE_LENGTH {
            self.focus += 1;
        }
        true
    }

    /// Backspace: clear the focused cell if it holds a digit, otherwise
    /// move focus back one cell (no-op at cell 0).
    pub fn backspace(&mut self) {
        if self.cells[self.focus].is_some() {
            self.cells[self.focus] = None;
        } else if self.focus > 0 {
            self.focus -= 1;
        }
    }

    /// Bulk paste: strip non-digits, truncate to the cell count, and fill
    /// from cell 0 regardless of which cell holds focus. Cells beyond the
    /// pasted digits are cleared. Focus lands on the first cell after the
    /// last filled one, or the last cell when fully filled.
    ///
    /// Filling from cell 0 instead of the caret is the behavior under
    /// contract; do not change it to caret-relative insertion.
    pub fn paste(&mut self, text: &str) {
        let digits: Vec<char> = text
            .chars()
            .filter(|c| c.is_ascii_digit())
            .take(CODE_LENGTH)
            .collect();

        self.cells = [None; CODE_LENGTH];
        for (i, ch) in digits.iter().enumerate() {
            self.cells[i] = Some(*ch);
        }
        self.focus = digits.len().min(CODE_LENGTH - 1);
    }

    /// Reset all cells and return focus to cell 0
    pub fn clear(&mut self) {
        self.cells = [None; CODE_LENGTH];
        self.focus = 0;
    }

    /// True only when every cell holds a digit. This predicate alone
    /// gates the verify submit.
    pub fn is_submittable(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// The joined code string, available only when fully populated
    pub fn value(&self) -> Option<String> {
        if !self.is_submittable() {
            return None;
        }
        Some(self.cells.iter().map(|c| c.unwrap_or('0')).collect())
    }

    /// Number of populated cells
    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Index of the focused cell
    pub fn focus(&self) -> usize {
        self.focus
    }
}

impl Default for CodeInput {
    fn default() -> Self {
        Self::new()
    }
}
