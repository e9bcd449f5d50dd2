//! Biomarker input form.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use zeroize::Zeroize;

use crate::domain::features::format_value;
use crate::domain::{ErrorReport, Feature, FeatureMap, FeatureVector, RawValue, FEATURE_ORDER};
use crate::tui::styles::ClinicalTheme;

/// Sampling standards and best practice shown beside the form.
const GUIDE: &[(&str, &[&str])] = &[
    (
        "Sampling standards",
        &[
            "CDAI: score from the week before assessment",
            "Biochemistry: fasting blood drawn before the infusion",
            "Lesion sites: confirmed by imaging",
        ],
    ),
    (
        "Best practice",
        &[
            "First check on day 14 after the first dose",
            "Reassess after any dose change",
            "Postpone assessment during acute infection",
        ],
    ),
];

#[derive(Debug, Clone)]
pub struct FormField {
    pub feature: Feature,
    pub value: String,
}

impl FormField {
    fn with_default(feature: Feature) -> Self {
        Self {
            feature,
            value: format_value(feature.constraint().default_value()),
        }
    }

    #[must_use]
    pub fn hint(&self) -> String {
        self.feature.constraint().hint()
    }
}

/// Patient form state
pub struct PatientFormState {
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    pub error_message: Option<String>,
}

impl Default for PatientFormState {
    fn default() -> Self {
        Self {
            fields: FEATURE_ORDER.iter().map(|&f| FormField::with_default(f)).collect(),
            selected_field: 0,
            error_message: None,
        }
    }
}

impl PatientFormState {
    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % self.fields.len();
    }

    pub fn prev_field(&mut self) {
        if self.selected_field == 0 {
            self.selected_field = self.fields.len() - 1;
        } else {
            self.selected_field -= 1;
        }
    }

    /// Add a character to the current field
    pub fn input_char(&mut self, c: char) {
        if c.is_ascii_digit() || c == '.' || c == '-' {
            self.fields[self.selected_field].value.push(c);
            self.error_message = None;
        }
    }

    pub fn delete_char(&mut self) {
        self.fields[self.selected_field].value.pop();
    }

    pub fn clear_field(&mut self) {
        self.fields[self.selected_field].value.clear();
    }

    /// Restore every field to its default value.
    pub fn reset_defaults(&mut self) {
        for field in &mut self.fields {
            field.value.zeroize();
            field.value = format_value(field.feature.constraint().default_value());
        }
        self.error_message = None;
    }

    /// Wipe the entered values from memory, then restore defaults.
    pub fn clear_sensitive(&mut self) {
        self.reset_defaults();
        self.selected_field = 0;
    }

    /// Entered values as an inbound feature map (text, coerced downstream).
    #[must_use]
    pub fn to_feature_map(&self) -> FeatureMap {
        self.fields
            .iter()
            .map(|field| {
                (
                    field.feature.key().to_string(),
                    RawValue::Text(field.value.clone()),
                )
            })
            .collect()
    }

    /// Validate the form, recording the error kind and message for the footer.
    pub fn validate(&mut self) -> Option<FeatureMap> {
        let map = self.to_feature_map();
        match FeatureVector::from_map(&map) {
            Ok(_) => {
                self.error_message = None;
                Some(map)
            }
            Err(e) => {
                self.error_message = Some(ErrorReport::from(&e).to_string());
                None
            }
        }
    }
}

/// Render the biomarker input form
pub fn render_patient_form(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Form + side panel
            Constraint::Length(3), // Footer/error
        ])
        .split(area);

    render_form_header(f, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(64), Constraint::Percentage(36)])
        .split(chunks[1]);
    render_form_fields(f, body[0], state);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(16), Constraint::Min(0)])
        .split(body[1]);
    render_overview(f, side[0], state);
    render_guide(f, side[1]);

    render_form_footer(f, chunks[2], state);
}

fn render_form_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", ClinicalTheme::text()),
        Span::styled("IFX Concentration Predictor", ClinicalTheme::title()),
        Span::styled(
            " │ Infliximab therapeutic drug monitoring",
            ClinicalTheme::text_secondary(),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_form_fields(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(area);

    let mid = (state.fields.len() + 1) / 2;
    render_field_column(f, columns[0], &state.fields[..mid], 0, state.selected_field);
    render_field_column(
        f,
        columns[1],
        &state.fields[mid..],
        mid,
        state.selected_field,
    );
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    fields: &[FormField],
    offset: usize,
    selected: usize,
) {
    let constraints: Vec<Constraint> = fields
        .iter()
        .map(|_| Constraint::Length(3))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, field) in fields.iter().enumerate() {
        let is_selected = offset + i == selected;
        let (border_style, title_style) = if is_selected {
            (ClinicalTheme::border_focused(), ClinicalTheme::focused())
        } else {
            (ClinicalTheme::border(), ClinicalTheme::text_secondary())
        };

        let block = Block::default()
            .title(Span::styled(format!(" {} ", field.feature.label()), title_style))
            .borders(Borders::ALL)
            .border_style(border_style);

        let mut spans = vec![Span::raw(" ")];
        if field.value.is_empty() {
            spans.push(Span::styled(field.hint(), ClinicalTheme::text_muted()));
        } else {
            spans.push(Span::styled(field.value.as_str(), ClinicalTheme::text()));
            spans.push(Span::styled(
                format!("  ({})", field.hint()),
                ClinicalTheme::text_muted(),
            ));
        }
        if is_selected {
            spans.insert(2, Span::styled("▌", ClinicalTheme::cursor()));
        }

        f.render_widget(Paragraph::new(Line::from(spans)).block(block), chunks[i]);
    }
}

fn render_overview(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let lines: Vec<Line> = state
        .fields
        .iter()
        .map(|field| {
            let value_style = match field.value.trim().parse::<f64>() {
                Ok(v) if field.feature.constraint().check(v).is_ok() => ClinicalTheme::text(),
                _ => ClinicalTheme::danger(),
            };
            Line::from(vec![
                Span::styled(
                    format!(" {:<12}", field.feature.key()),
                    ClinicalTheme::text_secondary(),
                ),
                Span::styled(
                    if field.value.is_empty() { "-" } else { field.value.as_str() },
                    value_style,
                ),
            ])
        })
        .collect();

    let block = Block::default()
        .title(Span::styled(" Input Overview ", ClinicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicalTheme::border());
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_guide(f: &mut Frame, area: Rect) {
    let mut lines = Vec::new();
    for (heading, items) in GUIDE {
        lines.push(Line::from(Span::styled(*heading, ClinicalTheme::info())));
        for item in *items {
            lines.push(Line::from(vec![
                Span::styled(" • ", ClinicalTheme::text_muted()),
                Span::styled(*item, ClinicalTheme::text_secondary()),
            ]));
        }
        lines.push(Line::from(""));
    }

    let block = Block::default()
        .title(Span::styled(" Guide ", ClinicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicalTheme::border());
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

fn render_form_footer(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let content = if let Some(err) = &state.error_message {
        Line::from(vec![
            Span::styled("! ", ClinicalTheme::danger()),
            Span::styled(err.as_str(), ClinicalTheme::danger()),
        ])
    } else {
        Line::from(vec![
            Span::styled("[↑↓/Tab] ", ClinicalTheme::key_hint()),
            Span::styled("Navigate ", ClinicalTheme::key_desc()),
            Span::styled("[Enter] ", ClinicalTheme::key_hint()),
            Span::styled("Predict ", ClinicalTheme::key_desc()),
            Span::styled("[R] ", ClinicalTheme::key_hint()),
            Span::styled("Reset Defaults ", ClinicalTheme::key_desc()),
            Span::styled("[Ctrl+Q] ", ClinicalTheme::key_hint()),
            Span::styled("Quit", ClinicalTheme::key_desc()),
        ])
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(footer, area);
}
