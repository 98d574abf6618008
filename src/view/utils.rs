//! Utility functions for rendering UI components

use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, List, ListItem, ListState},
    Frame,
};

pub fn render_scrollable_list(
    frame: &mut Frame,
    area: Rect,
    items: Vec<ListItem>,
    selected_index: usize,
    block: Block,
) {
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default()); // Highlight handled by item styles

    let mut list_state = ListState::default();
    list_state.select(Some(selected_index));

    frame.render_stateful_widget(list, area, &mut list_state);
}

/// Width of the index column: digits of the count plus one
pub fn calculate_num_width(item_count: usize) -> usize {
    item_count.max(1).to_string().len() + 1
}

pub fn truncate_string(s: &str, max_width: usize) -> String {
    if s.chars().count() > max_width {
        let truncated: String = s.chars().take(max_width.saturating_sub(3)).collect();
        format!("{:<width$}", format!("{}...", truncated), width = max_width)
    } else {
        format!("{:<width$}", s, width = max_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_pads_short_strings() {
        assert_eq!(truncate_string("abc", 5), "abc  ");
    }

    #[test]
    fn test_truncate_adds_ellipsis() {
        assert_eq!(truncate_string("abcdefgh", 6), "abc...");
    }

    #[test]
    fn test_num_width() {
        assert_eq!(calculate_num_width(0), 2);
        assert_eq!(calculate_num_width(9), 2);
        assert_eq!(calculate_num_width(10), 3);
        assert_eq!(calculate_num_width(250), 4);
    }
}
