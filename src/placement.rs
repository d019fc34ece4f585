use serde::{Deserialize, Serialize};

/// Canvas corner a watermark is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopLeft,
    TopRight,
    #[default]
    BottomLeft,
    BottomRight,
}

/// Top-left drawing origin of a watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
}

/// Font size the configured paddings are expressed against.
pub const BASE_FONT_SIZE: i32 = 40;

/// Compute where a `content_w` x `content_h` box goes on the canvas.
///
/// `h_pad` is the distance from the left/right edge, `v_pad` from the
/// top/bottom edge. Results are not clamped, so oversized content or
/// padding can produce negative coordinates.
pub fn compute(
    canvas_w: u32,
    canvas_h: u32,
    content_w: u32,
    content_h: u32,
    anchor: Corner,
    h_pad: i32,
    v_pad: i32,
) -> Placement {
    let (canvas_w, canvas_h) = (canvas_w as i32, canvas_h as i32);
    let (content_w, content_h) = (content_w as i32, content_h as i32);

    let left = h_pad;
    let right = canvas_w - content_w - h_pad;
    let top = v_pad;
    let bottom = canvas_h - content_h - v_pad;

    match anchor {
        Corner::BottomLeft => Placement { x: left, y: bottom },
        Corner::BottomRight => Placement { x: right, y: bottom },
        Corner::TopLeft => Placement { x: left, y: top },
        Corner::TopRight => Placement { x: right, y: top },
    }
}

/// Paddings for rendered text, in pixels.
///
/// Configured paddings are relative to [`BASE_FONT_SIZE`] and scale with the
/// measured text height. Stacked (multi-line) text halves both.
pub fn scaled_text_padding(
    text_height: u32,
    h_padding: i32,
    v_padding: i32,
    multiline: bool,
) -> (i32, i32) {
    let text_height = text_height as i32;
    let h_pad = text_height * h_padding / BASE_FONT_SIZE;
    let v_pad = text_height * v_padding / BASE_FONT_SIZE;

    if multiline {
        (text_height * h_padding / (BASE_FONT_SIZE * 2), v_pad / 2)
    } else {
        (h_pad, v_pad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_corners() {
        let at = |corner| compute(1000, 1000, 100, 50, corner, 20, 40);
        assert_eq!(at(Corner::BottomLeft), Placement { x: 20, y: 910 });
        assert_eq!(at(Corner::BottomRight), Placement { x: 880, y: 910 });
        assert_eq!(at(Corner::TopLeft), Placement { x: 20, y: 40 });
        assert_eq!(at(Corner::TopRight), Placement { x: 880, y: 40 });
    }

    #[test]
    fn test_zero_padding_touches_edges() {
        let p = compute(640, 480, 40, 20, Corner::BottomRight, 0, 0);
        assert_eq!(p, Placement { x: 600, y: 460 });
    }

    #[test]
    fn test_oversized_content_is_not_clamped() {
        let p = compute(100, 100, 150, 120, Corner::BottomRight, 10, 10);
        assert_eq!(p, Placement { x: -60, y: -30 });
    }

    #[test]
    fn test_text_padding_scales_with_height() {
        assert_eq!(scaled_text_padding(40, 20, 40, false), (20, 40));
        assert_eq!(scaled_text_padding(80, 20, 40, false), (40, 80));
        assert_eq!(scaled_text_padding(30, 20, 40, false), (15, 30));
    }

    #[test]
    fn test_text_padding_halves_for_multiline() {
        assert_eq!(scaled_text_padding(80, 20, 40, true), (20, 40));
        // 33 * 40 / 40 = 33, halved with truncation
        assert_eq!(scaled_text_padding(33, 20, 40, true), (8, 16));
    }
}
