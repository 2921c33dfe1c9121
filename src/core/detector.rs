// LogScout - core/detector.rs
//
// Format detection: scores every library entry against a sample of lines and
// picks the best entry that clears its own confidence threshold.
//
// Confidence is a flat match percentage over the non-blank sample lines,
// rounded half-up. Sample diversity is not weighed: fifty identical lines
// score the same as fifty varied ones.

use crate::core::library::{self, LogPatternEntry};
use crate::util::constants;
use serde::Serialize;

/// Score of one library entry against one sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryScore {
    pub name: String,
    pub matches: usize,
    pub tested: usize,
    pub confidence: u8,
    pub threshold: u8,
}

impl EntryScore {
    /// At least one line matched and the threshold is met. An entry that
    /// matched nothing never passes, whatever its threshold.
    pub fn passes(&self) -> bool {
        self.matches > 0 && self.confidence >= self.threshold
    }
}

/// Outcome of format detection over a sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedFormat {
    /// Winning entry name, or `custom` when nothing cleared its threshold.
    pub format: String,
    pub confidence: u8,
    pub sample_matches: usize,
    pub total_samples: usize,
    #[serde(skip)]
    pub entry: Option<LogPatternEntry>,
}

impl DetectedFormat {
    pub fn is_custom(&self) -> bool {
        self.entry.is_none()
    }
}

/// Result of the second, larger validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    pub validated: bool,
    pub confidence: u8,
    pub tested: usize,
}

/// `round(100 * matches / tested)`, half-up.
pub fn confidence_percent(matches: usize, tested: usize) -> u8 {
    if tested == 0 {
        return 0;
    }
    let pct = (matches * 100 + tested / 2) / tested;
    pct.min(100) as u8
}

fn non_blank<'a, S: AsRef<str>>(lines: &'a [S]) -> impl Iterator<Item = &'a str> {
    lines.iter().map(AsRef::as_ref).filter(|l| !l.trim().is_empty())
}

/// Score a single entry against the non-blank lines of `lines`.
pub fn score_entry<S: AsRef<str>>(entry: &LogPatternEntry, lines: &[S]) -> EntryScore {
    let mut tested = 0usize;
    let mut matches = 0usize;
    for line in non_blank(lines) {
        tested += 1;
        if entry.matches(line) {
            matches += 1;
        }
    }
    EntryScore {
        name: entry.name.clone(),
        matches,
        tested,
        confidence: confidence_percent(matches, tested),
        threshold: entry.confidence_threshold,
    }
}

/// Score every entry of `library`, in library order.
pub fn score_library<S: AsRef<str>>(library: &[LogPatternEntry], lines: &[S]) -> Vec<EntryScore> {
    library.iter().map(|e| score_entry(e, lines)).collect()
}

/// Detect the format of `lines` against the built-in library.
pub fn detect_format<S: AsRef<str>>(lines: &[S]) -> Option<DetectedFormat> {
    detect_format_with(library::builtin_library(), lines)
}

/// Detect the format of `lines` against `library`.
///
/// Returns `None` if the sample has no non-blank lines. Among entries that
/// clear their own threshold the highest confidence wins; ties go to the
/// entry listed first.
pub fn detect_format_with<S: AsRef<str>>(
    library: &[LogPatternEntry],
    lines: &[S],
) -> Option<DetectedFormat> {
    let total = non_blank(lines).count();
    if total == 0 {
        return None;
    }

    let mut best: Option<(&LogPatternEntry, EntryScore)> = None;
    for entry in library {
        let score = score_entry(entry, lines);
        tracing::trace!(
            pattern = %entry.name,
            matches = score.matches,
            tested = score.tested,
            confidence = score.confidence,
            "Scored pattern"
        );
        if !score.passes() {
            continue;
        }
        if best
            .as_ref()
            .map_or(true, |(_, b)| score.confidence > b.confidence)
        {
            best = Some((entry, score));
        }
    }

    let detected = match best {
        Some((entry, score)) => DetectedFormat {
            format: entry.name.clone(),
            confidence: score.confidence,
            sample_matches: score.matches,
            total_samples: score.tested,
            entry: Some(entry.clone()),
        },
        None => DetectedFormat {
            format: constants::CUSTOM_FORMAT_NAME.to_string(),
            confidence: 0,
            sample_matches: 0,
            total_samples: total,
            entry: None,
        },
    };

    tracing::debug!(
        format = %detected.format,
        confidence = detected.confidence,
        samples = detected.total_samples,
        "Format detection complete"
    );
    Some(detected)
}

/// Re-run `entry` against a larger, fresh sample. The format is validated
/// when the match rate reaches `threshold` percent.
pub fn validate_detected_format<S: AsRef<str>>(
    entry: &LogPatternEntry,
    lines: &[S],
    threshold: u8,
) -> Validation {
    let score = score_entry(entry, lines);
    let validated = score.matches > 0 && score.confidence >= threshold;
    tracing::debug!(
        pattern = %entry.name,
        confidence = score.confidence,
        tested = score.tested,
        validated,
        "Format validation complete"
    );
    Validation {
        validated,
        confidence: score.confidence,
        tested: score.tested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::library::{PatternCategory, PatternMatcher};

    fn grok_entry(name: &str, template: &str, threshold: u8) -> LogPatternEntry {
        LogPatternEntry {
            name: name.to_string(),
            description: String::new(),
            category: PatternCategory::Custom,
            log_type: name.to_string(),
            matcher: PatternMatcher::Grok(template.to_string()),
            confidence_threshold: threshold,
        }
    }

    fn sample(matching: usize, other: usize) -> Vec<String> {
        let mut lines: Vec<String> = (0..matching)
            .map(|i| format!("job{i} finished"))
            .collect();
        lines.extend((0..other).map(|i| format!("<<{i}>> ???")));
        lines
    }

    #[test]
    fn test_confidence_is_match_percentage() {
        let lib = vec![grok_entry("jobs", "%{WORD:job} finished", 70)];
        let detected = detect_format_with(&lib, &sample(40, 10)).unwrap();
        assert_eq!(detected.format, "jobs");
        assert_eq!(detected.confidence, 80);
        assert_eq!(detected.sample_matches, 40);
        assert_eq!(detected.total_samples, 50);
    }

    #[test]
    fn test_rounding_half_up() {
        assert_eq!(confidence_percent(2, 3), 67);
        assert_eq!(confidence_percent(1, 8), 13);
        assert_eq!(confidence_percent(0, 0), 0);
        assert_eq!(confidence_percent(5, 5), 100);
    }

    #[test]
    fn test_below_threshold_yields_custom() {
        let lib = vec![grok_entry("jobs", "%{WORD:job} finished", 90)];
        let detected = detect_format_with(&lib, &sample(40, 10)).unwrap();
        assert_eq!(detected.format, constants::CUSTOM_FORMAT_NAME);
        assert_eq!(detected.confidence, 0);
        assert!(detected.is_custom());
    }

    #[test]
    fn test_ties_go_to_library_order() {
        let lib = vec![
            grok_entry("first", "%{WORD:job} finished", 50),
            grok_entry("second", "%{NOTSPACE:job} finished", 50),
        ];
        let detected = detect_format_with(&lib, &sample(10, 0)).unwrap();
        assert_eq!(detected.format, "first");
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let lib = vec![grok_entry("jobs", "%{WORD:job} finished", 70)];
        let lines = vec!["a finished", "", "   ", "b finished"];
        let detected = detect_format_with(&lib, &lines).unwrap();
        assert_eq!(detected.confidence, 100);
        assert_eq!(detected.total_samples, 2);

        assert!(detect_format_with(&lib, &["", " "]).is_none());
    }

    #[test]
    fn test_broken_template_never_wins() {
        let lib = vec![grok_entry("broken", "%{NOPE:x}", 0)];
        let detected = detect_format_with(&lib, &sample(5, 0)).unwrap();
        assert!(detected.is_custom());
        assert_eq!(detected.format, "custom");
        assert_eq!(detected.confidence, 0);

        let lines = ["a line", "another"];
        let validation = validate_detected_format(&lib[0], &lines, 0);
        assert!(!validation.validated);
    }

    #[test]
    fn test_builtin_detects_auth_over_generic_syslog() {
        let lines: Vec<String> = (0..20)
            .map(|i| {
                format!("Jan 15 10:30:{:02} bastion sshd[{}]: Accepted password for u{i} from 10.0.0.{i}", i, 100 + i)
            })
            .collect();
        let detected = detect_format(&lines).unwrap();
        assert_eq!(detected.format, "auth");
        assert_eq!(detected.confidence, 100);
    }

    #[test]
    fn test_builtin_detects_generic_syslog() {
        let programs = ["cron", "nginx", "dbus-daemon", "snapd", "sshd"];
        let lines: Vec<String> = (0..50)
            .map(|i| {
                format!(
                    "Feb  3 04:05:{:02} host {}[{}]: routine message {i}",
                    i % 60,
                    programs[i % programs.len()],
                    i + 1
                )
            })
            .collect();
        let detected = detect_format(&lines).unwrap();
        assert_eq!(detected.format, "syslog-bsd");
    }

    #[test]
    fn test_validation_threshold() {
        let entry = grok_entry("jobs", "%{WORD:job} finished", 70);
        let v = validate_detected_format(&entry, &sample(70, 30), 70);
        assert!(v.validated);
        assert_eq!(v.confidence, 70);

        let v = validate_detected_format(&entry, &sample(69, 31), 70);
        assert!(!v.validated);

        let empty: Vec<String> = Vec::new();
        assert!(!validate_detected_format(&entry, &empty, 70).validated);
    }
}
