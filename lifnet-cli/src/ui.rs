// TUI rendering: 2D spike raster (time on X, hidden then output neurons on Y) + status panel.

use std::io::Stdout;

use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::Text,
    widgets::{Block, Borders, Paragraph},
    Terminal,
};

use crate::app::App;
use crate::backend::RasterBackend;

/// Raster lines, one per row: `"h03 |  •  • "`.
pub fn raster_lines<B: RasterBackend>(app: &App<B>) -> Vec<String> {
    app.raster
        .iter()
        .enumerate()
        .map(|(row, cells)| {
            let mut line = format!("{} |", app.backend.row_label(row));
            line.extend(cells.iter());
            line
        })
        .collect()
}

/// Draws the UI each frame:
/// - Top: spike raster, rows are neurons, columns are time steps (circular).
/// - Bottom: sample/step status, run state and controls.
pub fn draw<B: RasterBackend>(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &App<B>) -> anyhow::Result<()> {
    terminal.draw(|f| {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Percentage(80), Constraint::Percentage(20)].as_ref())
            .split(f.size());

        let raster_widget = Paragraph::new(Text::from(raster_lines(app).join("\n")))
            .block(Block::default().title("Spike Raster  (time →)").borders(Borders::ALL))
            .style(Style::default().fg(Color::White));
        f.render_widget(raster_widget, chunks[0]);

        let status = format!(
            "{} | Running: {}\nControls: [s] Step  [r] Run/Pause  [n] Next sample  [q] Quit",
            app.backend.status(),
            if app.running { "yes" } else { "no" }
        );
        let status_widget = Paragraph::new(status)
            .style(Style::default().fg(Color::Cyan))
            .block(Block::default().title("Status").borders(Borders::ALL));
        f.render_widget(status_widget, chunks[1]);
    })?;
    Ok(())
}
