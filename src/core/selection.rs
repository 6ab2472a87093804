//! Selection and pagination
//!
//! The selection is a flat index into the visible list. The display window
//! is derived from it with direct paging: the page is always
//! `selected / PAGE_SIZE`, so a given index lands on the same page no matter
//! how the user navigated to it.

/// Rows shown per page
pub const PAGE_SIZE: usize = 4;

/// Filled page indicator dot
pub const DOT_CURRENT: char = '\u{25cf}'; // ●
/// Empty page indicator dot
pub const DOT_OTHER: char = '\u{25cb}'; // ○

/// Clamp an index into `[0, len - 1]` (0 when empty)
pub fn clamp_index(index: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        index.min(len - 1)
    }
}

/// Move the selection up one row (no wrap)
pub fn move_up(index: usize) -> usize {
    index.saturating_sub(1)
}

/// Move the selection down one row (no wrap)
pub fn move_down(index: usize, len: usize) -> usize {
    clamp_index(index + 1, len)
}

/// The slice of the list currently on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Zero-based page number
    pub page: usize,
    /// Total number of pages (0 when the list is empty)
    pub page_count: usize,
    /// Index of the first row of the page in the full list
    pub start: usize,
    /// One past the last row of the page in the full list
    pub end: usize,
    /// Highlighted row within the page
    pub display_index: usize,
}

impl PageWindow {
    /// Number of rows in this page
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Compute the display window for `len` items with `selected` highlighted
pub fn page_window(len: usize, selected: usize, page_size: usize) -> PageWindow {
    let page_size = page_size.max(1);
    let selected = clamp_index(selected, len);
    let page = selected / page_size;
    let start = (page * page_size).min(len);
    let end = (start + page_size).min(len);

    PageWindow {
        page,
        page_count: len.div_ceil(page_size),
        start,
        end,
        display_index: selected % page_size,
    }
}

/// Render the page indicator, one dot per page.
///
/// Returns `None` when everything fits on a single page.
pub fn page_indicator(window: &PageWindow) -> Option<String> {
    if window.page_count <= 1 {
        return None;
    }
    let dots: Vec<String> = (0..window.page_count)
        .map(|i| {
            if i == window.page {
                DOT_CURRENT.to_string()
            } else {
                DOT_OTHER.to_string()
            }
        })
        .collect();
    Some(dots.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_page_window_middle_page() {
        let w = page_window(10, 5, PAGE_SIZE);
        assert_eq!(w.page, 1);
        assert_eq!(w.display_index, 1);
        assert_eq!((w.start, w.end), (4, 8));
        assert_eq!(w.page_count, 3);
    }

    #[test]
    fn test_page_window_short_tail() {
        let w = page_window(10, 9, PAGE_SIZE);
        assert_eq!(w.page, 2);
        assert_eq!((w.start, w.end), (8, 10));
        assert_eq!(w.len(), 2);
        assert_eq!(w.display_index, 1);
    }

    #[test]
    fn test_page_window_empty() {
        let w = page_window(0, 0, PAGE_SIZE);
        assert!(w.is_empty());
        assert_eq!(w.page_count, 0);
        assert_eq!(w.display_index, 0);
        assert!(page_indicator(&w).is_none());
    }

    #[test]
    fn test_page_window_clamps_stale_selection() {
        let w = page_window(3, 7, PAGE_SIZE);
        assert_eq!((w.start, w.end), (0, 3));
        assert_eq!(w.display_index, 2);
    }

    #[test]
    fn test_move_clamps_at_edges() {
        assert_eq!(move_up(0), 0);
        assert_eq!(move_up(3), 2);
        assert_eq!(move_down(9, 10), 9);
        assert_eq!(move_down(3, 10), 4);
        assert_eq!(move_down(0, 0), 0);
    }

    #[test]
    fn test_crossing_page_boundary() {
        let before = page_window(10, 3, PAGE_SIZE);
        let after = page_window(10, move_down(3, 10), PAGE_SIZE);
        assert_eq!(before.page, 0);
        assert_eq!(after.page, 1);
        assert_eq!(after.display_index, 0);
    }

    #[test]
    fn test_clamp_after_shrink() {
        assert_eq!(clamp_index(8, 5), 4);
        assert_eq!(clamp_index(2, 5), 2);
        assert_eq!(clamp_index(2, 0), 0);
    }

    #[test]
    fn test_page_indicator() {
        assert!(page_indicator(&page_window(4, 0, PAGE_SIZE)).is_none());
        assert_eq!(
            page_indicator(&page_window(10, 5, PAGE_SIZE)).as_deref(),
            Some("○ ● ○")
        );
        // Six pages, selection on the last one
        assert_eq!(
            page_indicator(&page_window(24, 23, PAGE_SIZE)).as_deref(),
            Some("○ ○ ○ ○ ○ ●")
        );
    }

    proptest! {
        #[test]
        fn prop_window_contains_selection(len in 1usize..200, selected in 0usize..400) {
            let w = page_window(len, selected, PAGE_SIZE);
            let clamped = clamp_index(selected, len);
            prop_assert!(w.start <= clamped && clamped < w.end);
            prop_assert_eq!(w.start + w.display_index, clamped);
            prop_assert!(w.len() <= PAGE_SIZE);
        }
    }
}
