//! Track pane rendering (queue, search results)

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, ListItem, Padding, Paragraph},
    Frame,
};

use crate::model::{format_duration, ActiveSection, ContentState, ContentView, SearchItem, Track, UiState};
use super::utils::{calculate_num_width, render_scrollable_list, truncate_string};

const DURATION_WIDTH: usize = 8;

pub fn render_track_pane(frame: &mut Frame, area: Rect, ui_state: &UiState, content_state: &ContentState) {
    let is_focused = ui_state.active_section == ActiveSection::Tracks;
    let border_style = if is_focused {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    };

    if content_state.is_loading {
        let loading = Paragraph::new("Loading...")
            .style(Style::default().fg(Color::Yellow))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Tracks ")
                    .padding(Padding::horizontal(1))
                    .border_style(border_style),
            );
        frame.render_widget(loading, area);
        return;
    }

    let selected = ui_state.track_selected;
    match &content_state.view {
        ContentView::Empty => {
            let hint = Paragraph::new(
                "Pick My Wave, Liked tracks or a playlist, or press / to search\n\n\
                 Press a to authorize the provider, s to switch providers\n\
                 Press h for help",
            )
            .style(Style::default().fg(Color::DarkGray))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Tracks ")
                    .padding(Padding::horizontal(1))
                    .border_style(border_style),
            );
            frame.render_widget(hint, area);
        }
        ContentView::Queue {
            title,
            tracks,
            current_index,
        } => {
            let content_width = area.width.saturating_sub(4) as usize;
            let items = queue_items(tracks, selected, is_focused, *current_index, content_width);
            let block = Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ({}) ", title, tracks.len()))
                .padding(Padding::horizontal(1))
                .border_style(border_style);
            // +1 for header
            render_scrollable_list(frame, area, items, selected + 1, block);
        }
        ContentView::SearchResults { query, kind, items } => {
            let rows = if items.is_empty() {
                vec![ListItem::new(format!("No {} found", kind.label())).style(Style::default().fg(Color::DarkGray))]
            } else {
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| ListItem::new(search_item_label(item)).style(row_style(i == selected, is_focused, false)))
                    .collect()
            };
            let block = Block::default()
                .borders(Borders::ALL)
                .title(format!(" Search \"{}\" [{}] ", query, kind.label()))
                .padding(Padding::horizontal(1))
                .border_style(border_style);
            render_scrollable_list(frame, area, rows, selected, block);
        }
    }
}

fn row_style(selected: bool, focused: bool, playing: bool) -> Style {
    if selected && focused {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else if playing {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else if selected {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn search_item_label(item: &SearchItem) -> String {
    match item {
        SearchItem::Track(track) => format!("♪ {} - {}", track.title, track.artists_display()),
        SearchItem::Artist(artist) => format!("👤 {}", artist.name),
        SearchItem::Playlist(playlist) => match &playlist.owner {
            Some(owner) => format!("☰ {} by {} ({})", playlist.title, owner, playlist.track_count),
            None => format!("☰ {} ({})", playlist.title, playlist.track_count),
        },
    }
}

fn queue_items(
    tracks: &[Track],
    selected_index: usize,
    is_focused: bool,
    current_index: Option<usize>,
    content_width: usize,
) -> Vec<ListItem<'static>> {
    let num_width = calculate_num_width(tracks.len());
    // " {num}   {title}   {artist}   {duration}"
    let fixed_width = 1 + num_width + 3 + 3 + 3 + DURATION_WIDTH;
    let remaining_width = content_width.saturating_sub(fixed_width);
    let title_width = (remaining_width * 55) / 100;
    let artist_width = remaining_width.saturating_sub(title_width);

    let mut items = vec![ListItem::new(format!(
        " {:<num_width$}   {:<title_width$}   {:<artist_width$}   {}",
        "#", "Title", "Artist", "Duration",
    ))
    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))];

    items.extend(tracks.iter().enumerate().map(|(i, track)| {
        let is_current = current_index == Some(i);
        let marker = if is_current { "▶" } else { " " };
        let number = format!("{}{:<num_width$}", marker, i + 1);
        let title = truncate_string(&track.title, title_width);
        let artists = truncate_string(&track.artists_display(), artist_width);
        let duration = if track.duration_ms > 0 {
            format_duration(track.duration_ms)
        } else {
            "--:--".to_string()
        };
        ListItem::new(format!("{}   {}   {}   {}", number, title, artists, duration))
            .style(row_style(i == selected_index, is_focused, is_current))
    }));

    items
}
