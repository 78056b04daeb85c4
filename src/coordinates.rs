//SPDX-License-Identifier: MPL-2.0
/*!
Integer pixel geometry for windows and screens.
*/

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    x: i32,
    y: i32,
}
impl Position {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Position {
        Position { x, y }
    }

    #[inline] pub const fn x(&self) -> i32 { self.x }
    #[inline] pub const fn y(&self) -> i32 { self.y }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    width: u32,
    height: u32,
}

impl Size {
    #[inline] pub const fn new(width: u32, height: u32) -> Size {
        Size { width, height }
    }

    #[inline] pub const fn width(&self) -> u32 { self.width }
    #[inline] pub const fn height(&self) -> u32 { self.height }

    #[inline] pub const fn is_empty(&self) -> bool { self.width == 0 || self.height == 0 }
}

/**
A window frame: top-left position plus size.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    origin: Position,
    size: Size,
}

impl Rect {
    #[inline] pub const fn new(origin: Position, size: Size) -> Rect {
        Rect { origin, size }
    }
    #[inline] pub const fn origin(&self) -> Position { self.origin }
    #[inline] pub const fn size(&self) -> Size { self.size }

    pub const fn with_size(self, size: Size) -> Rect {
        Rect { origin: self.origin, size }
    }
    pub const fn with_origin(self, origin: Position) -> Rect {
        Rect { origin, size: self.size }
    }
}

/**
Shrinks `content` so that `content + padding` fits inside `screen`, keeping the aspect ratio
of `content`.

`padding` is the non-client decoration (borders, title bar) that surrounds the content area.
Sizes that already fit are returned unchanged; content is never grown, and a non-empty result is
never narrower or shorter than one pixel.
*/
pub fn fit_within(content: Size, padding: Size, screen: Size) -> Size {
    if content.is_empty() {
        return content;
    }
    let outer_width = content.width as u64 + padding.width as u64;
    let outer_height = content.height as u64 + padding.height as u64;
    if outer_width <= screen.width as u64 && outer_height <= screen.height as u64 {
        return content;
    }
    let avail_width = screen.width.saturating_sub(padding.width);
    let avail_height = screen.height.saturating_sub(padding.height);

    let width_factor = avail_width as f64 / content.width as f64;
    let height_factor = avail_height as f64 / content.height as f64;

    let fitted = if width_factor < height_factor && width_factor < 1.0 {
        Size::new(avail_width, (content.height as f64 * width_factor) as u32)
    } else if height_factor < 1.0 {
        Size::new((content.width as f64 * height_factor) as u32, avail_height)
    } else {
        content
    };
    Size::new(fitted.width.max(1), fitted.height.max(1))
}

/**
Moves `frame` so it lies on a screen of the given size, clamping the origin to the top-left corner
when the frame is larger than the screen.
*/
pub fn clamp_onto(frame: Rect, screen: Size) -> Rect {
    let max_x = screen.width as i64 - frame.size.width as i64;
    let max_y = screen.height as i64 - frame.size.height as i64;
    let x = (frame.origin.x as i64).min(max_x).max(0) as i32;
    let y = (frame.origin.y as i64).min(max_y).max(0) as i32;
    frame.with_origin(Position::new(x, y))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fitting_content_is_unchanged() {
        let s = fit_within(Size::new(800, 600), Size::new(16, 39), Size::new(1920, 1080));
        assert_eq!(s, Size::new(800, 600));
    }

    #[test]
    fn wide_content_is_limited_by_width() {
        let s = fit_within(Size::new(4000, 1000), Size::new(0, 0), Size::new(2000, 2000));
        assert_eq!(s, Size::new(2000, 500));
    }

    #[test]
    fn tall_content_is_limited_by_height() {
        let s = fit_within(Size::new(1000, 4000), Size::new(0, 0), Size::new(2000, 2000));
        assert_eq!(s, Size::new(500, 2000));
    }

    #[test]
    fn padding_counts_against_screen() {
        let s = fit_within(Size::new(1000, 1000), Size::new(100, 100), Size::new(1000, 1000));
        assert_eq!(s, Size::new(900, 900));
    }

    #[test]
    fn padding_larger_than_screen_keeps_a_pixel() {
        let s = fit_within(Size::new(800, 600), Size::new(100, 100), Size::new(100, 50));
        assert_eq!(s, Size::new(1, 1));
        let s = fit_within(Size::new(4000, 2), Size::new(0, 0), Size::new(1000, 1000));
        assert_eq!(s, Size::new(1000, 1));
    }

    #[test]
    fn clamp_moves_frame_back_on_screen() {
        let frame = Rect::new(Position::new(1800, -20), Size::new(400, 300));
        let clamped = clamp_onto(frame, Size::new(1920, 1080));
        assert_eq!(clamped.origin(), Position::new(1520, 0));
        assert_eq!(clamped.size(), Size::new(400, 300));
    }

    #[test]
    fn oversized_frame_pins_to_origin() {
        let frame = Rect::new(Position::new(50, 50), Size::new(3000, 3000));
        assert_eq!(clamp_onto(frame, Size::new(1920, 1080)).origin(), Position::new(0, 0));
    }
}
