//! UI module: View components for the TUI.

pub mod patient;
pub mod result;

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::tui::styles::ClinicalTheme;

pub fn render_disclaimer(f: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(vec![Span::styled(
            "DISCLAIMER: Decision support only. Predictions do not replace measured IFX trough levels or clinical judgement.",
            ClinicalTheme::text_muted(),
        )]),
        Line::from(vec![Span::styled(
            "Confirm any dose change with therapeutic drug monitoring.",
            ClinicalTheme::text_muted(),
        )]),
    ];

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(ClinicalTheme::border());

    let p = Paragraph::new(text).block(block).wrap(Wrap { trim: true });

    f.render_widget(p, area);
}
