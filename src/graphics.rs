use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use glam::{Quat, Vec3};

use crate::assets::Sprite;
use crate::math::{apply_lighting, calculate_light_intensity, sphere_normal};
use crate::vertex::Vertex;

/// One character cell
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub color: Color,
}

impl Cell {
    pub const BLANK: Cell = Cell {
        ch: ' ',
        color: Color::Reset,
    };
}

/// Character framebuffer with a depth buffer
#[derive(Clone, Debug)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    depth: Vec<f32>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Framebuffer {
            width,
            height,
            cells: vec![Cell::BLANK; width * height],
            depth: vec![f32::INFINITY; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Framebuffer::new(width, height);
    }

    pub fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
        self.depth.fill(f32::INFINITY);
    }

    fn offset(&self, x: isize, y: isize) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        self.offset(x as isize, y as isize).map(|i| self.cells[i])
    }

    /// Writes `cell` if it is closer than what is already there
    pub fn plot(&mut self, x: isize, y: isize, depth: f32, cell: Cell) -> bool {
        let Some(offset) = self.offset(x, y) else {
            return false;
        };
        if depth >= self.depth[offset] {
            return false;
        }
        self.depth[offset] = depth;
        self.cells[offset] = cell;
        true
    }

    /// Writes `cell` over anything, for overlays
    pub fn put(&mut self, x: isize, y: isize, cell: Cell) {
        if let Some(offset) = self.offset(x, y) {
            self.depth[offset] = f32::NEG_INFINITY;
            self.cells[offset] = cell;
        }
    }

    /// Row `y` as plain text
    pub fn row_text(&self, y: usize) -> String {
        if y >= self.height {
            return String::new();
        }
        self.cells[y * self.width..(y + 1) * self.width]
            .iter()
            .map(|cell| cell.ch)
            .collect()
    }

    /// Queues the whole frame to `out` and flushes
    pub fn present<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let mut color = None;
        for y in 0..self.height {
            queue!(out, MoveTo(0, y as u16))?;
            for cell in &self.cells[y * self.width..(y + 1) * self.width] {
                if color != Some(cell.color) {
                    queue!(out, SetForegroundColor(cell.color))?;
                    color = Some(cell.color);
                }
                queue!(out, Print(cell.ch))?;
            }
        }
        queue!(out, ResetColor)?;
        out.flush()
    }
}

/// Draws a shaded sphere centred on `center`.
///
/// `radius` is the world radius, `radius_cells` its on-screen size in
/// (columns, rows). `orientation` is the body's world rotation; a dark spot
/// on its local +X side shows the spin.
pub fn draw_sphere(
    fb: &mut Framebuffer,
    center: &Vertex,
    radius: f32,
    radius_cells: [f32; 2],
    view_basis: (Vec3, Vec3, Vec3),
    orientation: Quat,
    sprite: &Sprite,
    light_pos: Vec3,
) {
    let [cx, cy] = center.screen_position;
    let [rx, ry] = [radius_cells[0].max(0.5), radius_cells[1].max(0.5)];
    let (right, up, back) = view_basis;
    let inverse = orientation.inverse();

    // Compute bounding box of the disc
    let min_x = (cx - rx).floor() as isize;
    let max_x = (cx + rx).ceil() as isize;
    let min_y = (cy - ry).floor() as isize;
    let max_y = (cy + ry).ceil() as isize;

    let mut drawn = false;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dx = (x as f32 + 0.5 - cx) / rx;
            let dy = -(y as f32 + 0.5 - cy) / ry;
            let Some(view_normal) = sphere_normal(dx, dy) else {
                continue;
            };
            let normal = right * view_normal.x + up * view_normal.y + back * view_normal.z;
            let surface = center.position + normal * radius;

            let mut intensity = if sprite.emissive {
                0.4 + 0.6 * view_normal.z
            } else {
                calculate_light_intensity(normal, surface, light_pos)
            };
            if (inverse * normal).x > 0.9 {
                intensity *= 0.45;
            }

            let depth = center.depth - view_normal.z * radius;
            let cell = Cell {
                ch: apply_lighting(sprite.ramp, intensity),
                color: sprite.color,
            };
            drawn |= fb.plot(x, y, depth, cell);
        }
    }

    // Bodies smaller than a cell still get one
    if !drawn {
        let cell = Cell {
            ch: apply_lighting(sprite.ramp, 1.0),
            color: sprite.color,
        };
        fb.plot(cx.floor() as isize, cy.floor() as isize, center.depth, cell);
    }
}

/// Draws a line between two vertices using Bresenham's algorithm, depth tested
pub fn draw_line(fb: &mut Framebuffer, v0: &Vertex, v1: &Vertex, cell: Cell) {
    let (mut x0, mut y0, x1, y1) = (
        v0.screen_position[0].floor() as isize,
        v0.screen_position[1].floor() as isize,
        v1.screen_position[0].floor() as isize,
        v1.screen_position[1].floor() as isize,
    );
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy; // error value e_xy
    let steps = dx.max(-dy).max(1) as f32;
    let mut step = 0.0;

    loop {
        let depth = v0.depth + (v1.depth - v0.depth) * (step / steps);
        fb.plot(x0, y0, depth, cell);

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
        step += 1.0;
    }
}

/// Writes `text` starting at (`x`, `y`) over everything else
pub fn draw_text(fb: &mut Framebuffer, x: isize, y: isize, text: &str, color: Color) {
    for (i, ch) in text.chars().enumerate() {
        fb.put(x + i as isize, y, Cell { ch, color });
    }
}

/// Writes `text` centred on column `cx`
pub fn draw_text_centered(fb: &mut Framebuffer, cx: isize, y: isize, text: &str, color: Color) {
    let half = text.chars().count() as isize / 2;
    draw_text(fb, cx - half, y, text, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::builtin_sprite;

    fn vertex(x: f32, y: f32, depth: f32) -> Vertex {
        Vertex {
            position: Vec3::ZERO,
            screen_position: [x, y],
            depth,
        }
    }

    #[test]
    fn depth_test_keeps_nearest() {
        let mut fb = Framebuffer::new(4, 2);
        let far = Cell { ch: 'f', color: Color::Red };
        let near = Cell { ch: 'n', color: Color::Blue };
        assert!(fb.plot(1, 1, 5.0, far));
        assert!(fb.plot(1, 1, 2.0, near));
        assert!(!fb.plot(1, 1, 3.0, far));
        assert_eq!(fb.get(1, 1), Some(near));
        assert!(!fb.plot(9, 9, 0.0, near));
    }

    #[test]
    fn line_covers_endpoints() {
        let mut fb = Framebuffer::new(10, 5);
        let cell = Cell { ch: '#', color: Color::White };
        draw_line(&mut fb, &vertex(0.2, 0.5, 1.0), &vertex(9.5, 4.5, 1.0), cell);
        assert_eq!(fb.get(0, 0).unwrap().ch, '#');
        assert_eq!(fb.get(9, 4).unwrap().ch, '#');
    }

    #[test]
    fn text_overlays_and_clips() {
        let mut fb = Framebuffer::new(6, 1);
        draw_text(&mut fb, 2, 0, "hello", Color::White);
        assert_eq!(fb.row_text(0), "  hell");
        fb.clear();
        draw_text_centered(&mut fb, 3, 0, "ab", Color::White);
        assert_eq!(fb.row_text(0), "  ab  ");
    }

    #[test]
    fn sphere_fills_its_disc() {
        let mut fb = Framebuffer::new(20, 10);
        let sprite = builtin_sprite("Sol").unwrap();
        let basis = (Vec3::X, Vec3::Y, Vec3::Z);
        draw_sphere(
            &mut fb,
            &vertex(10.0, 5.0, 4.0),
            0.5,
            [6.0, 3.0],
            basis,
            Quat::IDENTITY,
            &sprite,
            Vec3::ZERO,
        );
        assert_ne!(fb.get(10, 5).unwrap().ch, ' ');
        assert_eq!(fb.get(0, 0).unwrap().ch, ' ');
        assert_eq!(fb.get(10, 5).unwrap().color, Color::Yellow);
    }

    #[test]
    fn tiny_sphere_still_shows() {
        let mut fb = Framebuffer::new(5, 5);
        let sprite = builtin_sprite("Mercury").unwrap();
        draw_sphere(
            &mut fb,
            &vertex(2.0, 2.0, 4.0),
            0.01,
            [0.01, 0.01],
            (Vec3::X, Vec3::Y, Vec3::Z),
            Quat::IDENTITY,
            &sprite,
            Vec3::new(0.0, 0.0, 10.0),
        );
        let lit: usize = (0..5)
            .map(|y| fb.row_text(y).chars().filter(|c| *c != ' ').count())
            .sum();
        assert!(lit >= 1);
    }

    #[test]
    fn present_writes_every_cell() {
        let mut fb = Framebuffer::new(3, 2);
        draw_text(&mut fb, 0, 0, "abc", Color::Green);
        let mut out = Vec::new();
        fb.present(&mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("abc"));
    }
}
