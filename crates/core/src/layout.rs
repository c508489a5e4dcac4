//! Text measurement for annotation sizing
//!
//! Placement and inline editing only need a bounding size for a run of text
//! in a given font. `MetricTextMeasurer` estimates it from font size with a
//! fixed per-character advance, which is enough to size boxes without a
//! shaping engine.

use crate::annotation::FontSpec;

/// Measured extent of laid-out text, in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub width: f32,
    pub height: f32,
    pub line_count: usize,
}

/// Measures text in a font.
///
/// `max_width` of `None` breaks only on explicit newlines; `Some(width)`
/// additionally wraps words to fit.
pub trait TextMeasurer {
    /// Break `text` into display lines.
    fn layout_lines(&self, text: &str, font: &FontSpec, max_width: Option<f32>) -> Vec<String>;

    /// Advance width of a single line.
    fn line_width(&self, line: &str, font: &FontSpec) -> f32;

    /// Distance between consecutive baselines.
    fn line_height(&self, font: &FontSpec) -> f32;

    fn measure(&self, text: &str, font: &FontSpec, max_width: Option<f32>) -> TextMetrics {
        let lines = self.layout_lines(text, font, max_width);
        let width = lines.iter().map(|line| self.line_width(line, font)).fold(0.0, f32::max);
        let line_count = lines.len().max(1);

        TextMetrics { width, height: self.line_height(font) * line_count as f32, line_count }
    }
}

/// Estimate-based measurer using fixed font metrics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricTextMeasurer {
    /// Line height multiplier (typically 1.2 for normal spacing)
    pub line_height_multiplier: f32,

    /// Average character width ratio (relative to font size)
    pub char_width_ratio: f32,
}

impl Default for MetricTextMeasurer {
    fn default() -> Self {
        Self { line_height_multiplier: 1.2, char_width_ratio: 0.6 }
    }
}

impl MetricTextMeasurer {
    fn char_width(&self, font: &FontSpec) -> f32 {
        font.size * self.char_width_ratio
    }
}

impl TextMeasurer for MetricTextMeasurer {
    fn layout_lines(&self, text: &str, font: &FontSpec, max_width: Option<f32>) -> Vec<String> {
        let paragraphs = text.split('\n').map(|line| line.trim_end_matches('\r'));

        match max_width {
            None => paragraphs.map(str::to_owned).collect(),
            Some(max_width) => {
                let char_width = self.char_width(font);
                let chars_per_line = if char_width > 0.0 {
                    ((max_width / char_width).floor() as usize).max(1)
                } else {
                    usize::MAX
                };
                paragraphs.flat_map(|paragraph| wrap_words(paragraph, chars_per_line)).collect()
            }
        }
    }

    fn line_width(&self, line: &str, font: &FontSpec) -> f32 {
        line.chars().count() as f32 * self.char_width(font)
    }

    fn line_height(&self, font: &FontSpec) -> f32 {
        font.size * self.line_height_multiplier
    }
}

/// Greedy word wrap; words longer than a line are split across lines.
fn wrap_words(text: &str, chars_per_line: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current_len > 0 && current_len + 1 + word_len > chars_per_line {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if word_len > chars_per_line {
            let chars: Vec<char> = word.chars().collect();
            let mut chunks = chars.chunks(chars_per_line).peekable();
            while let Some(chunk) = chunks.next() {
                if chunks.peek().is_some() {
                    lines.push(chunk.iter().collect());
                } else {
                    current = chunk.iter().collect();
                    current_len = chunk.len();
                }
            }
            continue;
        }

        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font(size: f32) -> FontSpec {
        FontSpec::new("Helvetica", size)
    }

    #[test]
    fn test_measure_single_line() {
        let metrics = MetricTextMeasurer::default().measure("Note", &font(18.0), None);

        assert!((metrics.width - 43.2).abs() < 0.001);
        assert!((metrics.height - 21.6).abs() < 0.001);
        assert_eq!(metrics.line_count, 1);
    }

    #[test]
    fn test_explicit_newlines_add_lines() {
        let metrics = MetricTextMeasurer::default().measure("ab\nabcd\n", &font(10.0), None);

        assert_eq!(metrics.line_count, 3);
        assert!((metrics.width - 24.0).abs() < 0.001);
        assert!((metrics.height - 36.0).abs() < 0.001);
    }

    #[test]
    fn test_empty_text_has_one_line() {
        let metrics = MetricTextMeasurer::default().measure("", &font(10.0), Some(100.0));

        assert_eq!(metrics.line_count, 1);
        assert_eq!(metrics.width, 0.0);
        assert!((metrics.height - 12.0).abs() < 0.001);
    }

    #[test]
    fn test_wrapping_respects_max_width() {
        let measurer = MetricTextMeasurer::default();
        let text = "This is a very long line of text that should wrap";
        let metrics = measurer.measure(text, &font(10.0), Some(60.0));

        assert!(metrics.line_count > 1);
        assert!(metrics.width <= 60.0);
    }

    #[test]
    fn test_wrap_words_simple() {
        assert_eq!(wrap_words("Hello world", 6), vec!["Hello", "world"]);
        assert_eq!(wrap_words("Hello", 10), vec!["Hello"]);
        assert_eq!(wrap_words("   ", 10), vec![""]);
    }

    #[test]
    fn test_wrap_words_splits_long_word() {
        let lines = wrap_words("Supercalifragilistic ok", 10);

        assert_eq!(lines, vec!["Supercalif", "ragilistic", "ok"]);
    }

    #[test]
    fn test_wrap_counts_chars_not_bytes() {
        let lines = wrap_words("éééé éééé", 4);
        assert_eq!(lines, vec!["éééé", "éééé"]);
    }
}
