//! Ratatui-based terminal dashboard.
//!
//! Left: the applicant form (six inputs + "Predict & Save") and the verdict of
//! the last prediction. Right: loan-status and risk-label distributions, the
//! feature-importance chart, and the most recent dataset rows.
//!
//! Scoring is synchronous: "Predict & Save" blocks until the row is persisted.
//! Per-action failures (bad input, storage errors) land in the status line and
//! the session continues; failing to load the model or dataset aborts startup.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table},
};
use tracing::{info, warn};

use crate::app::pipeline::{self, ScoreOutcome};
use crate::cli::TuiArgs;
use crate::domain::{ApplicantInput, HomeOwnership, LoanGrade, RiskLabel};
use crate::error::AppError;
use crate::io::{DatasetStore, ModelBundle, load_model};
use crate::plot::{Bar, render_bar_chart};
use crate::report::{DashboardSummary, recent_records, summarize};

mod plotters_chart;

use plotters_chart::ImportancePlottersChart;

const FIELD_AGE: usize = 0;
const FIELD_INCOME: usize = 1;
const FIELD_LOAN: usize = 2;
const FIELD_RATE: usize = 3;
const FIELD_GRADE: usize = 4;
const FIELD_HOME: usize = 5;
const FIELD_SUBMIT: usize = 6;
const FIELD_COUNT: usize = 7;

const MAX_INPUT_LEN: usize = 14;

/// Start the dashboard.
pub fn run(args: TuiArgs) -> Result<(), AppError> {
    // Load before touching the terminal so startup errors print normally.
    let bundle = load_model(&args.store.model)?;
    let store = DatasetStore::open(&args.store.dataset)?;
    let mut app = App::new(store, bundle, args.recent);

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    info!(dataset = %args.store.dataset.display(), "dashboard started");
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Raw form contents. Numeric fields are edited as text and parsed on submit.
#[derive(Debug, Clone, PartialEq)]
struct FormState {
    age: String,
    income: String,
    loan: String,
    rate: String,
    grade: LoanGrade,
    home: HomeOwnership,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            age: "18".to_string(),
            income: "0".to_string(),
            loan: "0".to_string(),
            rate: "0.0".to_string(),
            grade: LoanGrade::A,
            home: HomeOwnership::Rent,
        }
    }
}

impl FormState {
    fn text_mut(&mut self, field: usize) -> Option<&mut String> {
        match field {
            FIELD_AGE => Some(&mut self.age),
            FIELD_INCOME => Some(&mut self.income),
            FIELD_LOAN => Some(&mut self.loan),
            FIELD_RATE => Some(&mut self.rate),
            _ => None,
        }
    }

    fn to_input(&self) -> Result<ApplicantInput, AppError> {
        let age = self
            .age
            .trim()
            .parse::<u32>()
            .map_err(|_| AppError::invalid(format!("Age must be a whole number, got '{}'.", self.age.trim())))?;
        Ok(ApplicantInput {
            age,
            annual_income: parse_amount("Annual income", &self.income)?,
            loan_amount: parse_amount("Loan amount", &self.loan)?,
            interest_rate: parse_amount("Interest rate", &self.rate)?,
            loan_grade: self.grade,
            home_ownership: self.home,
        })
    }
}

fn parse_amount(name: &str, s: &str) -> Result<f64, AppError> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| AppError::invalid(format!("{name} must be a number, got '{}'.", s.trim())))
}

struct App {
    store: DatasetStore,
    bundle: ModelBundle,
    form: FormState,
    selected_field: usize,
    last: Option<ScoreOutcome>,
    summary: DashboardSummary,
    recent: usize,
    status: String,
    status_is_error: bool,
}

impl App {
    fn new(store: DatasetStore, bundle: ModelBundle, recent: usize) -> Self {
        let summary = summarize(&store, Some(&bundle));
        let status = format!(
            "Loaded {} rows ({} unparseable).",
            store.total_rows(),
            store.row_errors().len()
        );
        Self {
            store,
            bundle,
            form: FormState::default(),
            selected_field: 0,
            last: None,
            summary,
            recent,
            status,
            status_is_error: false,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Apply one key press. Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Esc | KeyCode::Char('q') => return true,
            KeyCode::Up | KeyCode::BackTab => {
                self.selected_field = (self.selected_field + FIELD_COUNT - 1) % FIELD_COUNT;
            }
            KeyCode::Down | KeyCode::Tab => {
                self.selected_field = (self.selected_field + 1) % FIELD_COUNT;
            }
            KeyCode::Left => self.cycle_choice(false),
            KeyCode::Right => self.cycle_choice(true),
            KeyCode::Enter => self.predict_and_save(),
            KeyCode::Char('r') => self.reload(),
            KeyCode::Backspace => {
                if let Some(text) = self.form.text_mut(self.selected_field) {
                    text.pop();
                }
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
                if let Some(text) = self.form.text_mut(self.selected_field) {
                    if text.len() < MAX_INPUT_LEN {
                        text.push(c);
                    }
                }
            }
            _ => {}
        }
        false
    }

    fn cycle_choice(&mut self, forward: bool) {
        match self.selected_field {
            FIELD_GRADE => {
                self.form.grade = if forward { self.form.grade.next() } else { self.form.grade.prev() };
            }
            FIELD_HOME => {
                self.form.home = if forward { self.form.home.next() } else { self.form.home.prev() };
            }
            _ => {}
        }
    }

    fn predict_and_save(&mut self) {
        let result = self
            .form
            .to_input()
            .and_then(|input| pipeline::score_and_save(&self.bundle, &mut self.store, &input));

        match result {
            Ok(outcome) => {
                self.status = format!(
                    "{} (p={:.4}) saved as row {}.",
                    outcome.prediction.label,
                    outcome.prediction.probability,
                    self.store.total_rows()
                );
                self.status_is_error = false;
                self.last = Some(outcome);
                self.summary = summarize(&self.store, Some(&self.bundle));
            }
            Err(err) => {
                warn!(error = %err, "predict & save failed");
                self.status = err.to_string();
                self.status_is_error = true;
            }
        }
    }

    fn reload(&mut self) {
        match self.store.reload() {
            Ok(()) => {
                self.summary = summarize(&self.store, Some(&self.bundle));
                self.status = format!("Reloaded {} rows.", self.store.total_rows());
                self.status_is_error = false;
            }
            Err(err) => {
                self.status = format!("Reload failed: {err}");
                self.status_is_error = true;
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let meta = &self.bundle.metadata;
        let lines = vec![
            Line::from(vec![
                Span::styled("risk", Style::default().fg(Color::Cyan)),
                Span::raw(" - credit risk dashboard"),
            ]),
            Line::from(Span::styled(
                format!(
                    "dataset: {} | rows={} | model: {} trees, trained {} | accuracy {}",
                    self.summary.dataset,
                    self.summary.total_rows,
                    self.bundle.forest.n_trees(),
                    meta.trained_at.format("%Y-%m-%d"),
                    meta.accuracy.map(|a| format!("{a:.4}")).unwrap_or_else(|| "n/a".to_string()),
                ),
                Style::default().fg(Color::Gray),
            )),
        ];

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(46), Constraint::Min(0)])
            .split(area);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(9), Constraint::Min(0)])
            .split(columns[0]);
        self.draw_form(frame, left[0]);
        self.draw_verdict(frame, left[1]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Min(0)])
            .split(columns[1]);
        let charts = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(right[0]);
        self.draw_distributions(frame, charts[0]);
        self.draw_importance(frame, charts[1]);
        self.draw_recent(frame, right[1]);
    }

    fn draw_form(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let f = &self.form;
        let items = vec![
            ListItem::new(format!("Age (years)        : {}", f.age)),
            ListItem::new(format!("Annual income (USD): {}", f.income)),
            ListItem::new(format!("Loan amount (USD)  : {}", f.loan)),
            ListItem::new(format!("Interest rate (%)  : {}", f.rate)),
            ListItem::new(format!("Loan grade         : ‹ {} ›", f.grade)),
            ListItem::new(format!("Home ownership     : ‹ {} ›", f.home.description())),
            ListItem::new(Span::styled(
                "[ Predict & Save ]",
                Style::default().add_modifier(Modifier::BOLD),
            )),
        ];

        let list = List::new(items)
            .block(Block::default().title("Applicant").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_verdict(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Verdict").borders(Borders::ALL);

        let Some(outcome) = &self.last else {
            let msg = Paragraph::new("No prediction yet.\nFill in the form and press Enter.")
                .style(Style::default().fg(Color::Gray))
                .block(block);
            frame.render_widget(msg, area);
            return;
        };

        let p = &outcome.prediction;
        let color = match p.label {
            RiskLabel::High => Color::Red,
            RiskLabel::Low => Color::Green,
        };
        let v = &outcome.vector;
        let lines = vec![
            Line::from(Span::styled(
                p.label.as_str(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("p(default) = {:.4} ({:.2}%)", p.probability, p.probability * 100.0)),
            Line::from(format!("loan_status = {}", p.loan_status)),
            Line::from(""),
            Line::from(Span::styled(
                format!(
                    "vector: [{}, {}, {}, {}, {}, {}]",
                    v[0], v[1], v[2], v[3], v[4], v[5]
                ),
                Style::default().fg(Color::Gray),
            )),
        ];
        frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
    }

    fn draw_distributions(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Distributions").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let width = (inner.width as usize).saturating_sub(26).max(5);
        let c = &self.summary.classes;
        let mut class_bars = vec![
            Bar::new("0 current", c.current as f64, c.current.to_string()),
            Bar::new("1 default", c.default as f64, c.default.to_string()),
        ];
        if c.unscored > 0 {
            class_bars.push(Bar::new("unscored", c.unscored as f64, c.unscored.to_string()));
        }

        let l = &self.summary.labels;
        let label_bars = vec![
            Bar::new(
                RiskLabel::Low.as_str(),
                l.low as f64,
                format!("{} ({:.1}%)", l.low, l.percent(RiskLabel::Low)),
            ),
            Bar::new(
                RiskLabel::High.as_str(),
                l.high as f64,
                format!("{} ({:.1}%)", l.high, l.percent(RiskLabel::High)),
            ),
        ];

        let mut text = render_bar_chart("Loan status", &class_bars, width);
        text.push('\n');
        text.push_str(&render_bar_chart("Risk label", &label_bars, width));
        frame.render_widget(Paragraph::new(text), inner);
    }

    fn draw_importance(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Feature importance").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let bars: Vec<(&str, f64)> = self
            .summary
            .importances
            .iter()
            .map(|fi| (fi.feature, fi.importance))
            .collect();
        let widget = ImportancePlottersChart {
            bars: &bars,
            highlight: bars.len().checked_sub(1),
        };
        frame.render_widget(widget, inner);
    }

    fn draw_recent(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let header = Row::new(["age", "income", "loan", "rate", "grade", "home", "status", "label", "p", "source"])
            .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));

        let records = recent_records(&self.store, self.recent);
        let rows: Vec<Row> = records
            .iter()
            .rev()
            .map(|r| {
                let label_style = match r.risk_label {
                    Some(RiskLabel::High) => Style::default().fg(Color::Red),
                    Some(RiskLabel::Low) => Style::default().fg(Color::Green),
                    None => Style::default(),
                };
                Row::new(vec![
                    Cell::from(r.age.to_string()),
                    Cell::from(format!("{:.0}", r.annual_income)),
                    Cell::from(format!("{:.0}", r.loan_amount)),
                    Cell::from(format!("{:.2}", r.interest_rate)),
                    Cell::from(r.loan_grade.letter()),
                    Cell::from(r.home_ownership.label()),
                    Cell::from(r.loan_status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string())),
                    Cell::from(r.risk_label.map(|l| l.as_str()).unwrap_or("-")).style(label_style),
                    Cell::from(r.risk_probability.map(|p| format!("{p:.4}")).unwrap_or_else(|| "-".to_string())),
                    Cell::from(r.source.as_str()),
                ])
            })
            .collect();

        let widths = [
            Constraint::Length(4),
            Constraint::Length(9),
            Constraint::Length(7),
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Length(9),
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Length(7),
            Constraint::Length(9),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().title("Recent rows (newest first)").borders(Borders::ALL));
        frame.render_widget(table, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ field  0-9 . type  ←/→ choose  Enter predict & save  r reload  q quit";
        let status_color = if self.status_is_error { Color::Red } else { Color::Yellow };
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(status_color)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}
