// Application state for the TUI, including a circular 2D spike raster.

use anyhow::Result;

use crate::backend::RasterBackend;

pub struct App<B: RasterBackend> {
    pub backend: B,
    pub tick: u64,
    pub width: usize,           // number of columns (time window)
    pub raster: Vec<Vec<char>>, // [row][col]
    pub running: bool,
}

impl<B: RasterBackend> App<B> {
    pub fn new(backend: B, width: usize) -> Self {
        let rows = backend.rows();
        let width = width.max(1);
        Self {
            backend,
            tick: 0,
            width,
            raster: vec![vec![' '; width]; rows],
            running: false,
        }
    }

    pub fn toggle_running(&mut self) {
        self.running = !self.running;
    }

    fn column(&self) -> usize {
        (self.tick as usize) % self.width
    }

    /// Advance the simulation by one step and redraw the current column.
    pub fn step(&mut self) -> Result<()> {
        let fired = self.backend.step()?;
        self.tick = self.tick.saturating_add(1);
        let col = self.column();
        for row in self.raster.iter_mut() {
            row[col] = ' ';
        }
        for r in fired {
            if let Some(row) = self.raster.get_mut(r) {
                row[col] = '•';
            }
        }
        Ok(())
    }

    /// Jump to the next sample, leaving a separator column in the raster.
    pub fn next_sample(&mut self) -> Result<()> {
        self.backend.next_sample()?;
        self.tick = self.tick.saturating_add(1);
        let col = self.column();
        for row in self.raster.iter_mut() {
            row[col] = '|';
        }
        Ok(())
    }
}
