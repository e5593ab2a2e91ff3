//! Readability reformatting of extracted text.
//!
//! Reformatting never adds or removes words; it only repairs the line
//! structure that page layout and OCR leave behind. The transforms run in a
//! fixed order and each one can be toggled through [`ReformatConfig`].

mod transforms;

pub use transforms::{
    collapse_blank_lines, join_hyphenated_words, join_wrapped_lines, normalize_latin_spacing,
    remove_soft_hyphens, trim_line_edges,
};

/// Which transforms to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReformatConfig {
    /// Remove soft hyphens (U+00AD)
    pub remove_soft_hyphen: bool,

    /// Join words split by a hyphen at a line break ("exam-\nple" → "example")
    pub join_hyphenated_words: bool,

    /// Join lines broken mid-sentence
    pub join_wrapped_lines: bool,

    /// Collapse three or more line breaks into a single blank line
    pub collapse_blank_lines: bool,

    /// Collapse runs of ASCII spaces (full-width spaces are kept)
    pub normalize_latin_spacing: bool,

    /// Trim whitespace at both ends of every line
    pub trim_line_edges: bool,
}

impl ReformatConfig {
    /// Every transform disabled; reformatting returns the input unchanged.
    pub fn none() -> Self {
        Self {
            remove_soft_hyphen: false,
            join_hyphenated_words: false,
            join_wrapped_lines: false,
            collapse_blank_lines: false,
            normalize_latin_spacing: false,
            trim_line_edges: false,
        }
    }

    /// Every transform enabled.
    pub fn all() -> Self {
        Self {
            remove_soft_hyphen: true,
            join_hyphenated_words: true,
            join_wrapped_lines: true,
            collapse_blank_lines: true,
            normalize_latin_spacing: true,
            trim_line_edges: true,
        }
    }

    pub fn with_remove_soft_hyphen(mut self, enabled: bool) -> Self {
        self.remove_soft_hyphen = enabled;
        self
    }

    pub fn with_join_hyphenated_words(mut self, enabled: bool) -> Self {
        self.join_hyphenated_words = enabled;
        self
    }

    pub fn with_join_wrapped_lines(mut self, enabled: bool) -> Self {
        self.join_wrapped_lines = enabled;
        self
    }

    pub fn with_collapse_blank_lines(mut self, enabled: bool) -> Self {
        self.collapse_blank_lines = enabled;
        self
    }

    pub fn with_normalize_latin_spacing(mut self, enabled: bool) -> Self {
        self.normalize_latin_spacing = enabled;
        self
    }

    pub fn with_trim_line_edges(mut self, enabled: bool) -> Self {
        self.trim_line_edges = enabled;
        self
    }

    /// Whether any transform is enabled.
    pub fn is_enabled(&self) -> bool {
        *self != Self::none()
    }
}

impl Default for ReformatConfig {
    fn default() -> Self {
        Self::all().with_trim_line_edges(false)
    }
}

type Transform = fn(&str) -> String;

/// Apply the enabled transforms to `text`.
///
/// Deterministic and idempotent: reformatting the output again with the
/// same configuration returns it unchanged.
pub fn reformat(text: &str, config: &ReformatConfig) -> String {
    let pipeline: [(bool, Transform); 6] = [
        (config.remove_soft_hyphen, remove_soft_hyphens),
        (config.join_hyphenated_words, join_hyphenated_words),
        (config.join_wrapped_lines, join_wrapped_lines),
        (config.collapse_blank_lines, collapse_blank_lines),
        (config.normalize_latin_spacing, normalize_latin_spacing),
        (config.trim_line_edges, trim_line_edges),
    ];

    let mut out = text.to_string();
    for (_, transform) in pipeline.iter().filter(|(enabled, _)| *enabled) {
        out = transform(&out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReformatConfig::default();
        assert!(config.remove_soft_hyphen);
        assert!(config.join_hyphenated_words);
        assert!(config.join_wrapped_lines);
        assert!(config.collapse_blank_lines);
        assert!(config.normalize_latin_spacing);
        assert!(!config.trim_line_edges);
    }

    #[test]
    fn test_none_is_identity() {
        let text = "a-\nb\n\n\n\nc  d\u{AD}e\n  f  ";
        assert_eq!(reformat(text, &ReformatConfig::none()), text);
        assert!(!ReformatConfig::none().is_enabled());
    }

    #[test]
    fn test_wrapped_japanese_sentence() {
        let text = "本研究では、新しい手法を\n提案する。\n次に結果を示す。";
        assert_eq!(
            reformat(text, &ReformatConfig::default()),
            "本研究では、新しい手法を提案する。\n次に結果を示す。"
        );
    }

    #[test]
    fn test_hyphenated_word() {
        assert_eq!(
            reformat("infor-\nmation", &ReformatConfig::default()),
            "information"
        );
    }

    #[test]
    fn test_abbreviation_keeps_space() {
        assert_eq!(reformat("Fig.\n1", &ReformatConfig::default()), "Fig. 1");
    }

    #[test]
    fn test_list_items_stay_on_their_lines() {
        let text = "手順\n・準備する\n・実行する";
        assert_eq!(reformat(text, &ReformatConfig::default()), text);
    }

    #[test]
    fn test_paragraphs_preserved() {
        let text = "First paragraph\ncontinues here.\n\n\n\nSecond  paragraph";
        assert_eq!(
            reformat(text, &ReformatConfig::default()),
            "First paragraph continues here.\n\nSecond paragraph"
        );
    }

    #[test]
    fn test_full_width_space_untouched() {
        let text = "全角\u{3000}\u{3000}スペース。";
        assert_eq!(reformat(text, &ReformatConfig::all()), text);
    }

    #[test]
    fn test_idempotent_on_mixed_text() {
        let samples = [
            "第1章 はじめに\n\n本章では\n概要を述べる。\n・項目1\n・項目2\n\n\n\nEnd-\nof  line\r\nnext",
            "  lead\n\n  \n \ntrail  \n",
            "a-\nb-\nc\nd.\n(e)\n",
            "Fig.\n1 shows\n   indented wrap\n\u{AD}x",
        ];
        for config in [ReformatConfig::default(), ReformatConfig::all()] {
            for sample in samples {
                let once = reformat(sample, &config);
                let twice = reformat(&once, &config);
                assert_eq!(once, twice, "not idempotent for {:?}", sample);
            }
        }
    }

    #[test]
    fn test_builder_toggles() {
        let config = ReformatConfig::none().with_join_hyphenated_words(true);
        assert_eq!(reformat("co-\nop\nx", &config), "coop\nx");
    }
}
