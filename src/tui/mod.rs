//! TUI module - read-only terminal view of the workout log

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Table, Row, Cell},
};
use std::io::{stdout, Stdout};

use crate::db::WorkoutLogRow;
use crate::exercises::DayType;
use crate::mapper::SetNotes;

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// App state for TUI
pub struct App {
    rows: Vec<WorkoutLogRow>,
    filter: Option<DayType>,
    offset: usize,
    should_quit: bool,
}

impl App {
    pub fn new(mut rows: Vec<WorkoutLogRow>) -> Self {
        // Newest first
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Self {
            rows,
            filter: None,
            offset: 0,
            should_quit: false,
        }
    }

    /// Run the TUI application
    pub fn run(&mut self) -> Result<()> {
        let mut terminal = init_terminal()?;

        while !self.should_quit {
            terminal.draw(|frame| self.render(frame))?;
            self.handle_events()?;
        }

        restore_terminal()?;
        Ok(())
    }

    fn visible(&self) -> Vec<&WorkoutLogRow> {
        self.rows
            .iter()
            .filter(|r| match self.filter {
                Some(day) => r.workout_type.eq_ignore_ascii_case(day.as_str()),
                None => true,
            })
            .collect()
    }

    fn next_filter(&mut self) {
        self.filter = match self.filter {
            None => Some(DayType::Push),
            Some(DayType::Push) => Some(DayType::Pull),
            Some(DayType::Pull) => Some(DayType::Legs),
            Some(DayType::Legs) => None,
        };
        self.offset = 0;
    }

    fn title(&self) -> String {
        match self.filter {
            Some(day) => format!("{} {} workouts", day.emoji(), day),
            None => "All workouts".to_string(),
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ])
            .split(area);

        // Header
        let header = Paragraph::new("RAGNARÖK LAB - Lifting Log")
            .style(Style::default().fg(Color::Cyan).bold())
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, chunks[0]);

        // Log table
        let rows: Vec<Row> = self.visible().into_iter().skip(self.offset).map(|r| {
            let notes = SetNotes::parse(&r.notes);
            let superset = if r.is_superset() {
                r.superset_group_id.to_string()
            } else {
                "-".to_string()
            };
            Row::new(vec![
                Cell::from(r.date.clone()),
                Cell::from(r.workout_type.clone()),
                Cell::from(r.exercise.clone()),
                Cell::from(r.primary_muscle.clone()),
                Cell::from(format!("{}x{}", r.sets, r.reps)),
                Cell::from(r.weight.clone()),
                Cell::from(superset),
                Cell::from(notes.rpe.unwrap_or_default()),
                Cell::from(r.notes.clone()),
            ])
        }).collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(12),
                Constraint::Length(6),
                Constraint::Length(24),
                Constraint::Length(12),
                Constraint::Length(10),
                Constraint::Length(8),
                Constraint::Length(4),
                Constraint::Length(4),
                Constraint::Min(20),
            ],
        )
        .header(
            Row::new(vec![
                "Date", "Type", "Exercise", "Muscle", "Sets x Reps", "Weight", "SS", "RPE", "Notes",
            ])
            .style(Style::default().bold()),
        )
        .block(Block::default().borders(Borders::ALL).title(self.title()));

        frame.render_widget(table, chunks[1]);

        // Footer
        let footer = Paragraph::new("q: quit | tab: day type | ↑/↓: scroll")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[2]);
    }

    fn handle_events(&mut self) -> Result<()> {
        if event::poll(std::time::Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                        KeyCode::Tab => self.next_filter(),
                        KeyCode::Down => {
                            if self.offset + 1 < self.visible().len() {
                                self.offset += 1;
                            }
                        }
                        KeyCode::Up => self.offset = self.offset.saturating_sub(1),
                        _ => {}
                    }
                }
        Ok(())
    }
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}
