//! Overlay rendering (error notification, status line, help, credential prompt)

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::model::UiState;

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.width.saturating_sub(width) / 2,
        y: area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

pub fn render_error_notification(frame: &mut Frame, ui_state: &UiState) {
    if let Some(ref error_msg) = ui_state.error_message {
        let area = frame.area();

        let popup_width = 52.min(area.width.saturating_sub(4));
        let inner_width = popup_width.saturating_sub(4).max(1) as usize;

        let error_line_count = error_msg.chars().count().div_ceil(inner_width) as u16;

        // Height: top border (1) + error lines + bottom border (1)
        let popup_height = (2 + error_line_count.max(1)).min(area.height.saturating_sub(4));
        let popup_area = centered(area, popup_width, popup_height);

        frame.render_widget(Clear, popup_area);

        let error_widget = Paragraph::new(error_msg.to_string())
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .title(" Error (Esc to dismiss) ")
                    .title_style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
                    .style(Style::default().bg(Color::Black)),
            );

        frame.render_widget(error_widget, popup_area);
    }
}

/// One-line status message along the bottom edge of `area`
pub fn render_status_line(frame: &mut Frame, area: Rect, message: &str) {
    if area.height < 3 || area.width < 4 {
        return;
    }
    let line_area = Rect {
        x: area.x + 2,
        y: area.y + area.height - 2,
        width: area.width - 4,
        height: 1,
    };
    frame.render_widget(Clear, line_area);
    let status = Paragraph::new(message.to_string())
        .style(Style::default().fg(Color::Black).bg(Color::Yellow));
    frame.render_widget(status, line_area);
}

/// Authorization prompt. The typed credential is masked.
pub fn render_credential_prompt(frame: &mut Frame, provider: &str, credential: &str) {
    let area = frame.area();
    let popup_area = centered(area, 56.min(area.width.saturating_sub(4)), 5);

    frame.render_widget(Clear, popup_area);

    let masked: String = "•".repeat(credential.chars().count());
    let prompt = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("Token for {}:", provider),
            Style::default().fg(Color::White),
        )),
        Line::from(Span::styled(masked, Style::default().fg(Color::Green))),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Authorize (Enter to submit, Esc to cancel) ")
            .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .style(Style::default().bg(Color::Black)),
    );

    frame.render_widget(prompt, popup_area);
}

pub fn render_help_popup(frame: &mut Frame) {
    let area = frame.area();

    let keybindings = [
        ("", "── Navigation ──"),
        ("Tab / Shift+Tab", "Cycle sections"),
        ("↑ / ↓", "Move selection"),
        ("Enter", "Open / Play"),
        ("/", "Focus search"),
        ("Ctrl+K / K", "Cycle search kind"),
        ("Esc", "Clear search"),
        ("", ""),
        ("", "── Playback ──"),
        ("Space", "Play / Pause"),
        ("N", "Next track"),
        ("P", "Previous track"),
        ("← / →", "Seek 10s"),
        ("+ / -", "Volume up / down"),
        ("", ""),
        ("", "── Providers ──"),
        ("S", "Switch provider"),
        ("A", "Authorize"),
        ("R", "Reload playlists"),
        ("", ""),
        ("", "── General ──"),
        ("H", "Toggle this help"),
        ("Q", "Quit"),
    ];

    let popup_height = (keybindings.len() as u16 + 2).min(area.height.saturating_sub(4));
    let popup_area = centered(area, 62, popup_height);

    frame.render_widget(Clear, popup_area);

    let lines: Vec<Line> = keybindings
        .iter()
        .map(|(key, desc)| {
            if key.is_empty() {
                Line::from(Span::styled(
                    format!("{:^38}", desc),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(vec![
                    Span::styled(
                        format!("{:>18}", key),
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  "),
                    Span::styled(desc.to_string(), Style::default().fg(Color::White)),
                ])
            }
        })
        .collect();

    let help_text = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Help (H or Esc to close) ")
                .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .style(Style::default().bg(Color::Black)),
        )
        .style(Style::default().bg(Color::Black));

    frame.render_widget(help_text, popup_area);
}
