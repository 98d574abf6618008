//! Progress bar rendering

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Gauge},
    Frame,
};

use crate::model::{format_duration, PlaybackInfo, TransportState};

fn status_text(playback: &PlaybackInfo) -> String {
    let Some(track) = &playback.track else {
        return " Nothing playing".to_string();
    };
    let glyph = match playback.state {
        TransportState::Playing => "▶",
        TransportState::Paused => "⏸",
        TransportState::Stopped | TransportState::Empty => "■",
    };
    let artists = track.artists_display();
    if artists.is_empty() {
        format!(" {} {}", glyph, track.title)
    } else {
        format!(" {} {} | {}", glyph, track.title, artists)
    }
}

pub fn render_progress_bar(frame: &mut Frame, area: Rect, playback: &PlaybackInfo) {
    let progress_seconds = playback.progress_seconds();
    let duration_seconds = playback.duration_seconds();
    let time_str = format!(
        "{} / {}",
        format_duration(progress_seconds * 1000),
        format_duration(duration_seconds * 1000)
    );

    // Ratio over the same floored seconds the label shows
    let progress_ratio = if duration_seconds > 0 {
        (progress_seconds as f64 / duration_seconds as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let controls_info = format!(
        " {} ({}) | Vol: {}% ",
        playback.provider,
        playback.auth.label(),
        playback.volume
    );

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} ", status_text(playback)))
                .title_bottom(Line::from(controls_info).right_aligned()),
        )
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(progress_ratio)
        .label(time_str);

    frame.render_widget(gauge, area);
}
