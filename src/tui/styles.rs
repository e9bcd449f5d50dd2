//! Clinical color palette and styles.

use ratatui::style::{Color, Modifier, Style};

use crate::domain::ConcentrationClass;

/// Clinical theme color palette.
pub struct ClinicalTheme;

impl ClinicalTheme {
    /// Deep teal
    pub const PRIMARY: Color = Color::Rgb(13, 148, 136); // #0D9488

    pub const PRIMARY_LIGHT: Color = Color::Rgb(45, 212, 191); // #2DD4BF

    /// Light slate for borders
    pub const BORDER: Color = Color::Rgb(148, 163, 184); // #94A3B8

    pub const WARNING: Color = Color::Rgb(251, 191, 36); // #FBBF24

    pub const DANGER: Color = Color::Rgb(244, 63, 94); // #F43F5E

    pub const INFO: Color = Color::Rgb(59, 130, 246); // #3B82F6

    // === Text Colors ===

    pub const TEXT_PRIMARY: Color = Color::Rgb(248, 250, 252); // #F8FAFC

    pub const TEXT_SECONDARY: Color = Color::Rgb(148, 163, 184); // #94A3B8

    pub const TEXT_MUTED: Color = Color::Rgb(100, 116, 139); // #64748B

    #[must_use]
    pub fn title() -> Style {
        Style::default()
            .fg(Self::TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn subtitle() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn text() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY)
    }

    #[must_use]
    pub fn text_secondary() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    #[must_use]
    pub fn text_muted() -> Style {
        Style::default().fg(Self::TEXT_MUTED)
    }

    #[must_use]
    pub fn warning() -> Style {
        Style::default().fg(Self::WARNING)
    }

    #[must_use]
    pub fn danger() -> Style {
        Style::default().fg(Self::DANGER)
    }

    #[must_use]
    pub fn info() -> Style {
        Style::default().fg(Self::INFO)
    }

    /// Style for the focused form field title
    #[must_use]
    pub fn focused() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn cursor() -> Style {
        Style::default().fg(Self::PRIMARY_LIGHT)
    }

    #[must_use]
    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }

    #[must_use]
    pub fn border_focused() -> Style {
        Style::default().fg(Self::PRIMARY)
    }

    #[must_use]
    pub fn key_hint() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn key_desc() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    /// Color of a concentration class (green at or above threshold, red below).
    #[must_use]
    pub fn concentration_color(class: ConcentrationClass) -> Color {
        let (r, g, b) = class.color();
        Color::Rgb(r, g, b)
    }

    #[must_use]
    pub fn concentration(class: ConcentrationClass) -> Style {
        Style::default()
            .fg(Self::concentration_color(class))
            .add_modifier(Modifier::BOLD)
    }

    /// Gauge style for a confidence value; low confidence reads as a warning.
    #[must_use]
    pub fn confidence_gauge(class: ConcentrationClass, confidence: f64) -> Style {
        if confidence < 0.6 {
            Self::warning()
        } else {
            Style::default().fg(Self::concentration_color(class))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concentration_colors_follow_class() {
        assert_eq!(
            ClinicalTheme::concentration_color(ConcentrationClass::Therapeutic),
            Color::Rgb(40, 167, 69)
        );
        assert_eq!(
            ClinicalTheme::concentration_color(ConcentrationClass::Subtherapeutic),
            Color::Rgb(220, 53, 69)
        );
        assert_eq!(
            ClinicalTheme::confidence_gauge(ConcentrationClass::Therapeutic, 0.55),
            ClinicalTheme::warning()
        );
    }
}
