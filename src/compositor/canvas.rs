//! The drawing side of the render worker.
//!
//! [`Compositor`] holds the overlay state and turns one input frame into
//! one composited output bitmap: centered crop to the 9:16 target aspect,
//! horizontal mirror (selfie view), resize to the canvas, then the text
//! layers. Text rendering needs a TTF font; without one the compositor
//! still produces correctly cropped/mirrored output and logs a single
//! warning.

use ab_glyph::{FontArc, PxScale};
use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};

use super::layout;

/// Output aspect ratio (portrait 9:16).
const TARGET_ASPECT: f32 = 9.0 / 16.0;

/// Side margin for sequence-text wrapping, in canvas pixels.
const WRAP_MARGIN: u32 = 40;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([38, 38, 38]);
const FAIL_RED: Rgb<u8> = Rgb([220, 38, 38]);
const EMPHASIS_YELLOW: Rgb<u8> = Rgb([250, 204, 21]);

/// Centered crop rectangle `(x, y, w, h)` bringing `video_w`×`video_h`
/// to `target_aspect`.
pub fn crop_rect(video_w: u32, video_h: u32, target_aspect: f32) -> (u32, u32, u32, u32) {
    let video_aspect = video_w as f32 / video_h as f32;
    if video_aspect > target_aspect {
        // Wider than target: crop the sides.
        let source_w = (video_h as f32 * target_aspect).round() as u32;
        ((video_w - source_w.min(video_w)) / 2, 0, source_w.min(video_w), video_h)
    } else {
        // Taller than target: crop top and bottom.
        let source_h = (video_w as f32 / target_aspect).round() as u32;
        (0, (video_h - source_h.min(video_h)) / 2, video_w, source_h.min(video_h))
    }
}

// ---------------------------------------------------------------------------
// Compositor
// ---------------------------------------------------------------------------

/// Overlay state plus the draw pipeline.
pub struct Compositor {
    width: u32,
    height: u32,
    mobile: bool,
    font: Option<FontArc>,
    overlay_lines: Vec<String>,
    fail_show: bool,
    fail_round: u32,
    warned_no_font: bool,
}

impl Compositor {
    pub fn new(width: u32, height: u32, mobile: bool, font: Option<FontArc>) -> Self {
        Self {
            width,
            height,
            mobile,
            font,
            overlay_lines: Vec::new(),
            fail_show: false,
            fail_round: 1,
            warned_no_font: false,
        }
    }

    /// Replace the overlay lines (fire-and-forget update).
    pub fn set_overlay(&mut self, lines: Vec<String>) {
        self.overlay_lines = lines;
    }

    /// Update the fail banner.
    pub fn set_fail(&mut self, show: bool, round: u32) {
        self.fail_show = show;
        self.fail_round = round;
    }

    /// Compose one output bitmap from one input frame.
    ///
    /// Consumes the input (ownership was transferred into the worker) and
    /// produces exactly one output image.
    pub fn draw_frame(&mut self, bitmap: RgbImage) -> RgbImage {
        let (video_w, video_h) = bitmap.dimensions();

        // 1. Centered crop to the target aspect.
        let (x, y, w, h) = crop_rect(video_w, video_h, TARGET_ASPECT);
        let cropped = imageops::crop_imm(&bitmap, x, y, w, h).to_image();

        // 2. Mirror for the selfie view, then fit the canvas.
        let mirrored = imageops::flip_horizontal(&cropped);
        let mut canvas = imageops::resize(
            &mirrored,
            self.width,
            self.height,
            imageops::FilterType::Triangle,
        );

        // 3. Text layers.
        match self.font.clone() {
            Some(font) => self.draw_text_layers(&mut canvas, &font),
            None => {
                if !self.warned_no_font {
                    log::warn!("compositor: no font configured; skipping text overlays");
                    self.warned_no_font = true;
                }
            }
        }

        canvas
    }

    fn measure(&self, font: &FontArc, size: f32, text: &str) -> u32 {
        let (w, _) = text_size(PxScale::from(size), font, text);
        w
    }

    fn draw_centered(
        &self,
        canvas: &mut RgbImage,
        font: &FontArc,
        color: Rgb<u8>,
        size: f32,
        center_x: i32,
        y: i32,
        text: &str,
    ) {
        let w = self.measure(font, size, text) as i32;
        draw_text_mut(
            canvas,
            color,
            center_x - w / 2,
            y,
            PxScale::from(size),
            font,
            text,
        );
    }

    fn draw_text_layers(&self, canvas: &mut RgbImage, font: &FontArc) {
        let center_x = self.width as i32 / 2;

        // Hook line, top center.
        let hook_size = if self.mobile { 18.0 } else { 24.0 };
        self.draw_centered(
            canvas,
            font,
            WHITE,
            hook_size,
            center_x,
            40,
            "Most people fail at Round 3",
        );

        // Watermark, bottom right: FINGER (white) RHYTHM (ink) .COM (white).
        let wm_size = if self.mobile { 14.0 } else { 18.0 };
        let finger_w = self.measure(font, wm_size, "FINGER");
        let rhythm_w = self.measure(font, wm_size, "RHYTHM");
        let com_w = self.measure(font, wm_size, ".COM");
        let total = finger_w + rhythm_w + com_w;
        let start_x = self.width.saturating_sub(20 + total) as i32;
        let wm_y = self.height.saturating_sub(20 + wm_size as u32) as i32;
        let scale = PxScale::from(wm_size);
        draw_text_mut(canvas, WHITE, start_x, wm_y, scale, font, "FINGER");
        draw_text_mut(
            canvas,
            INK,
            start_x + finger_w as i32,
            wm_y,
            scale,
            font,
            "RHYTHM",
        );
        draw_text_mut(
            canvas,
            WHITE,
            start_x + (finger_w + rhythm_w) as i32,
            wm_y,
            scale,
            font,
            ".COM",
        );

        // Fail banner.
        if self.fail_show {
            let fail_y = (self.height as f32 * 0.35) as i32;
            self.draw_centered(canvas, font, FAIL_RED, 150.0, center_x, fail_y, "FAIL");

            // Sub-headline scaled so its width matches the FAIL banner.
            let sub = format!("MADE IT TO ROUND {}", self.fail_round);
            let fail_w = self.measure(font, 150.0, "FAIL");
            let sub_w = self.measure(font, 30.0, &sub).max(1);
            let sub_size = (30.0 * fail_w as f32 / sub_w as f32).floor();
            self.draw_centered(
                canvas,
                font,
                WHITE,
                sub_size,
                center_x,
                fail_y + 160,
                &sub,
            );
        }

        // Countdown, dead center.
        if let Some(count) = layout::find_countdown(&self.overlay_lines) {
            self.draw_centered(
                canvas,
                font,
                WHITE,
                180.0,
                center_x,
                self.height as i32 / 2 - 90,
                count,
            );
        }

        // Beat-sequence text (suppressed while the fail banner shows).
        if self.fail_show {
            return;
        }
        let Some(sequence) = layout::find_sequence_line(&self.overlay_lines) else {
            return;
        };

        let seq_size = if self.mobile { 24.0 } else { 32.0 };
        let max_width = self.width.saturating_sub(WRAP_MARGIN);
        let wrapped = layout::wrap_sequence(sequence, max_width, |text| {
            self.measure(font, seq_size, text)
        });

        let line_height = (seq_size * 1.5) as i32;
        let total_height = wrapped.len() as i32 * line_height;
        let mut y = (self.height as i32 - total_height) / 2;

        for line in &wrapped {
            if line.contains("[[") {
                // Per-token color emphasis: lay the cleaned line out centered,
                // then draw each run with its own color.
                let clean_w = self.measure(font, seq_size, &layout::strip_emphasis(line)) as i32;
                let mut x = center_x - clean_w / 2;
                for segment in layout::split_emphasis(line) {
                    let color = if segment.emphasized {
                        EMPHASIS_YELLOW
                    } else {
                        WHITE
                    };
                    draw_text_mut(
                        canvas,
                        color,
                        x,
                        y,
                        PxScale::from(seq_size),
                        font,
                        &segment.text,
                    );
                    x += self.measure(font, seq_size, &segment.text) as i32;
                }
            } else {
                self.draw_centered(canvas, font, WHITE, seq_size, center_x, y, line);
            }
            y += line_height;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
