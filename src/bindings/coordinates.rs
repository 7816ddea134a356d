// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Window coordinates.

Backends take rectangles with the origin at the bottom-left:

```text
      ▲ ┌───────┐
      │ │       │
    y │ │       │
      │ │       │
      0 └───────┘
        ────────▶
            x
 ```

Clients that think top-left (most windowing systems) flip on the way in.
*/

/**
An integer rectangle in window pixels.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WindowRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        WindowRect {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// The overlap of two rectangles.  Disjoint rectangles produce an empty rectangle.
    pub fn intersect(&self, other: &WindowRect) -> WindowRect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x + self.width).min(other.x + other.width);
        let y1 = (self.y + self.height).min(other.y + other.height);
        WindowRect::new(x0, y0, (x1 - x0).max(0), (y1 - y0).max(0))
    }

    /// Converts between top-left and bottom-left origins inside a surface `height` pixels tall.
    pub const fn flipped(&self, height: i32) -> WindowRect {
        WindowRect::new(self.x, height - self.y - self.height, self.width, self.height)
    }
}
