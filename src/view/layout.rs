//! Layout rendering (top bar, sidebar)

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use ratatui::widgets::Padding;

use crate::model::{ActiveSection, AuthStatus, LibraryItem, PlaybackInfo, UiState};

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    }
}

fn item_style(selected: bool, focused: bool) -> Style {
    if selected && focused {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else if selected {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}

pub fn render_top_bar(frame: &mut Frame, area: Rect, ui_state: &UiState, playback: &PlaybackInfo) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Search input
            Constraint::Length(36), // Provider
        ])
        .split(area);

    let focused = ui_state.active_section == ActiveSection::Search;
    let search_style = if focused {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::White)
    };

    let search_text = if ui_state.search_query.is_empty() {
        "Press / to search..."
    } else {
        &ui_state.search_query
    };

    let search = Paragraph::new(search_text).style(search_style).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Search [{}] ", ui_state.search_kind.label()))
            .padding(Padding::horizontal(1))
            .border_style(border_style(focused)),
    );
    frame.render_widget(search, chunks[0]);

    let auth_color = match playback.auth {
        AuthStatus::Authenticated => Color::Green,
        AuthStatus::Authenticating => Color::Yellow,
        AuthStatus::Unauthenticated => Color::Red,
    };
    let provider = Paragraph::new(format!("{} ({})", playback.provider, playback.auth.label()))
        .style(Style::default().fg(auth_color))
        .block(Block::default().borders(Borders::ALL).title(" Provider "));
    frame.render_widget(provider, chunks[1]);
}

pub fn render_sidebar(frame: &mut Frame, area: Rect, ui_state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(LibraryItem::ALL.len() as u16 + 2),
            Constraint::Min(0),
        ])
        .split(area);

    let library_focused = ui_state.active_section == ActiveSection::Library;
    let library_items: Vec<ListItem> = LibraryItem::ALL
        .iter()
        .enumerate()
        .map(|(i, item)| {
            ListItem::new(item.name()).style(item_style(i == ui_state.library_selected, library_focused))
        })
        .collect();

    let library = List::new(library_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Library ")
            .padding(Padding::horizontal(1))
            .border_style(border_style(library_focused)),
    );
    frame.render_widget(library, chunks[0]);

    let playlists_focused = ui_state.active_section == ActiveSection::Playlists;
    let playlist_items: Vec<ListItem> = ui_state
        .playlists
        .iter()
        .enumerate()
        .map(|(i, playlist)| {
            ListItem::new(format!("{} ({})", playlist.title, playlist.track_count))
                .style(item_style(i == ui_state.playlist_selected, playlists_focused))
        })
        .collect();

    let playlists = List::new(playlist_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Playlists ")
                .padding(Padding::horizontal(1))
                .border_style(border_style(playlists_focused)),
        )
        .highlight_style(Style::default()); // Highlight handled by item styles

    let mut list_state = ListState::default();
    list_state.select(Some(ui_state.playlist_selected));

    frame.render_stateful_widget(playlists, chunks[1], &mut list_state);
}
