use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use flashword::{GridPattern, Phase, SessionSummary};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const MARKER: &str = "+";

pub fn draw(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);

        if self.view.no_levels {
            Paragraph::new(vec![
                Line::from(Span::styled(
                    format!("No playable levels in pack '{}'", self.pack_name),
                    Style::default().patch(bold_style).fg(Color::Red),
                )),
                Line::default(),
                Line::from(Span::styled("(esc)ape", dim_style)),
            ])
            .alignment(Alignment::Center)
            .render(centered(area, 3), buf);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(4),
                Constraint::Length(1),
            ])
            .split(area);

        self.render_status(chunks[0], buf);

        match self.machine.phase() {
            Phase::Final => self.render_results(chunks[2], buf),
            Phase::Question => self.render_question(chunks[2], buf),
            _ => self.render_grid(chunks[2], buf),
        }

        let legend = match self.machine.phase() {
            Phase::Question => "(1-9) answer / (r)estart / (esc)ape",
            _ => "(r)estart / (esc)ape",
        };
        Paragraph::new(Span::styled(
            legend,
            Style::default()
                .patch(bold_style)
                .add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
    }
}

impl App {
    fn render_status(&self, area: Rect, buf: &mut Buffer) {
        let magenta = Style::default().fg(Color::Magenta);
        let budget = self.machine.budget();
        let mut spans = vec![Span::styled(self.pack_name.clone(), magenta)];

        if let Some(level) = self.machine.current_level() {
            spans.push(Span::raw(format!(
                "  level {}  {} wpm  {}",
                level.level_index, level.words_per_minute, level.grid_pattern
            )));
        }
        spans.push(Span::raw(format!(
            "  attempt {}/{}",
            budget.attempts_used(),
            budget.max_attempts()
        )));

        match (self.machine.phase(), self.view.last_answer) {
            (Phase::Prepare, Some(true)) => spans.push(Span::styled(
                "  correct",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )),
            (Phase::Prepare, Some(false)) => spans.push(Span::styled(
                "  wrong",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            _ => {}
        }

        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .render(area, buf);
    }

    fn render_grid(&self, area: Rect, buf: &mut Buffer) {
        let Some(grid) = self.view.grid.filter(GridPattern::is_valid) else {
            return;
        };

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Ratio(1, grid.rows); grid.rows as usize])
            .split(area);

        for (row, row_area) in rows.iter().enumerate() {
            let cells = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, grid.cols); grid.cols as usize])
                .split(*row_area);

            for (col, cell_area) in cells.iter().enumerate() {
                let position = row * grid.cols as usize + col;
                self.render_cell(position, *cell_area, buf);
            }
        }
    }

    fn render_cell(&self, position: usize, area: Rect, buf: &mut Buffer) {
        let highlighted = self.view.locator == Some(position);
        let border_style = if highlighted {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style);
        let inner = block.inner(area);
        block.render(area, buf);

        let text = match &self.view.word {
            Some((shown, word)) if *shown == position => Span::styled(
                word.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            _ if self.view.markers => Span::styled(MARKER, Style::default().fg(Color::Cyan)),
            _ => return,
        };

        if inner.height == 0 {
            return;
        }
        let width = (text.content.width() as u16).min(inner.width);
        let line_area = Rect {
            x: inner.x + (inner.width - width) / 2,
            y: inner.y + inner.height / 2,
            width,
            height: 1,
        };
        text.render(line_area, buf);
    }

    fn render_question(&self, area: Rect, buf: &mut Buffer) {
        let Some((prompt, options)) = &self.view.question else {
            return;
        };

        let mut lines = vec![
            Line::from(Span::styled(
                *prompt,
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::default(),
        ];
        lines.extend(options.iter().enumerate().map(|(idx, option)| {
            Line::from(vec![
                Span::styled(format!("{}) ", idx + 1), Style::default().fg(Color::Magenta)),
                Span::raw(option.clone()),
            ])
        }));

        let height = lines.len() as u16;
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(centered(area, height), buf);
    }

    fn render_results(&self, area: Rect, buf: &mut Buffer) {
        let Some(summary) = &self.view.summary else {
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(6)])
            .split(area);

        Paragraph::new(summary_lines(summary, self.best_speed))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        self.render_history(chunks[1], buf);
    }

    fn render_history(&self, area: Rect, buf: &mut Buffer) {
        if self.history.len() < 2 {
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let history_lines: Vec<Line> = self
            .history
            .iter()
            .map(|result| {
                Line::from(format!(
                    "{}  {:>4} wpm  {:>3}%",
                    result.finished_at.format("%m-%d %H:%M"),
                    result.summary.max_speed_achieved,
                    result.summary.accuracy_percent
                ))
            })
            .collect();
        Paragraph::new(history_lines)
            .block(Block::default().title("recent").borders(Borders::ALL))
            .render(chunks[0], buf);

        // oldest on the left
        let points: Vec<(f64, f64)> = self
            .history
            .iter()
            .rev()
            .enumerate()
            .map(|(idx, result)| (idx as f64, result.summary.max_speed_achieved as f64))
            .collect();
        let top = points.iter().map(|&(_, y)| y).fold(0.0, f64::max);

        let datasets = vec![Dataset::default()
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(Color::Magenta))
            .graph_type(GraphType::Line)
            .data(&points)];

        Chart::new(datasets)
            .block(Block::default().title("top speed").borders(Borders::ALL))
            .x_axis(Axis::default().bounds([0.0, (points.len() - 1) as f64]))
            .y_axis(
                Axis::default()
                    .bounds([0.0, top.max(1.0)])
                    .labels(vec![Span::raw("0"), Span::raw(format!("{}", top as u32))]),
            )
            .render(chunks[1], buf);
    }
}

fn summary_lines(summary: &SessionSummary, best_speed: Option<u32>) -> Vec<Line<'static>> {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(Span::styled(
            format!(
                "{} wpm top speed  {}% accuracy",
                summary.max_speed_achieved, summary.accuracy_percent
            ),
            bold_style,
        )),
        Line::from(format!(
            "{} correct / {} wrong over {} attempts on {}",
            summary.correct_count,
            summary.incorrect_count,
            summary.attempts_used,
            summary.grid_pattern
        )),
    ];
    if let Some(best) = best_speed {
        let style = if summary.max_speed_achieved >= best {
            Style::default().fg(Color::Green)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        lines.push(Line::from(Span::styled(format!("best on this grid: {best} wpm"), style)));
    }
    lines
}

fn centered(area: Rect, height: u16) -> Rect {
    let height = height.min(area.height);
    Rect {
        y: area.y + (area.height - height) / 2,
        height,
        ..area
    }
}
