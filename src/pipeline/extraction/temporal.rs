//! Temporal context: new event vs back-reference, relative offsets, resolution.

use std::sync::LazyLock;

use chrono::{Days, NaiveDate};
use regex::Regex;

use crate::models::{OffsetUnit, RelativeOffset, TemporalClass, TemporalContext};
use crate::pipeline::types::ReferenceDates;

static NEW_EVENT_CUES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:underwent|undergoing|taken\s+to|performed|started|starting|initiated|began|begun|developed|developing|new(?:ly)?\s+onset|placed|today|admitted|emergently|presented\s+with)\b",
    )
    .unwrap()
});

static REFERENCE_CUES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\bs/p\b|\bstatus\s+post\b|\bhistory\s+of\b|\bh/o\b|\bprior\b|\bprevious(?:ly)?\b|\bcontinued\b|\bcontinues\b|\bcontinue\b|\bremains\s+on\b|\balready\b)",
    )
    .unwrap()
});

static OFFSETS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?P<unit>POD|HD)\s*#?\s*|(?P<long>post[-\s]?op(?:erative)?\s+day|hospital\s+day)\s*#?\s*)(?P<n>\d{1,3})\b",
    )
    .unwrap()
});

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap());

static US_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap());

const CUE_CONFIDENCE: f32 = 0.9;
const ANCHORED_CONFIDENCE: f32 = 0.75;
const NO_CUE_CONFIDENCE: f32 = 0.6;

/// A located item: byte position in the note plus its payload.
#[derive(Debug, Clone, Copy)]
struct Located<T> {
    start: usize,
    end: usize,
    item: T,
}

impl<T> Located<T> {
    fn distance_to(&self, start: usize, end: usize) -> usize {
        if self.end <= start {
            start - self.end
        } else if self.start >= end {
            self.start - end
        } else {
            0
        }
    }
}

fn nearest<T: Copy>(
    items: &[Located<T>],
    sentence: (usize, usize),
    span: (usize, usize),
) -> Option<Located<T>> {
    items
        .iter()
        .filter(|l| l.start >= sentence.0 && l.end <= sentence.1)
        .min_by_key(|l| l.distance_to(span.0, span.1))
        .copied()
}

/// Offsets and explicit dates found anywhere in one note.
#[derive(Debug, Clone, Default)]
pub struct NoteAnchors {
    offsets: Vec<Located<RelativeOffset>>,
    dates: Vec<Located<NaiveDate>>,
}

impl NoteAnchors {
    pub fn scan(text: &str) -> Self {
        let offsets = OFFSETS
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let unit = match caps.name("unit") {
                    Some(u) if u.as_str().eq_ignore_ascii_case("pod") => OffsetUnit::Pod,
                    Some(_) => OffsetUnit::Hd,
                    None if caps["long"].to_lowercase().starts_with("hospital") => OffsetUnit::Hd,
                    None => OffsetUnit::Pod,
                };
                let value = caps["n"].parse().ok()?;
                Some(Located {
                    start: whole.start(),
                    end: whole.end(),
                    item: RelativeOffset { unit, value },
                })
            })
            .collect();

        let mut dates: Vec<Located<NaiveDate>> = ISO_DATE
            .captures_iter(text)
            .filter_map(|c| {
                let date = ymd(&c[1], &c[2], &c[3])?;
                let whole = c.get(0)?;
                Some(Located { start: whole.start(), end: whole.end(), item: date })
            })
            .collect();
        dates.extend(US_DATE.captures_iter(text).filter_map(|c| {
            let date = ymd(&c[3], &c[1], &c[2])?;
            let whole = c.get(0)?;
            Some(Located { start: whole.start(), end: whole.end(), item: date })
        }));

        Self { offsets, dates }
    }

    /// Offset nearest the mention in its sentence, else the last one earlier in the note.
    fn offset_for(&self, sentence: (usize, usize), span: (usize, usize)) -> Option<RelativeOffset> {
        nearest(&self.offsets, sentence, span)
            .or_else(|| self.offsets.iter().rev().find(|o| o.end <= sentence.0).copied())
            .map(|o| o.item)
    }

    fn date_for(&self, sentence: (usize, usize), span: (usize, usize)) -> Option<NaiveDate> {
        nearest(&self.dates, sentence, span).map(|d| d.item)
    }
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

/// Add `value` calendar days to `anchor`; negative offsets count back.
pub fn resolve_offset(anchor: NaiveDate, value: i64) -> Option<NaiveDate> {
    if value >= 0 {
        anchor.checked_add_days(Days::new(value as u64))
    } else {
        anchor.checked_sub_days(Days::new(value.unsigned_abs()))
    }
}

pub struct TemporalResolver<'a> {
    dates: &'a ReferenceDates,
}

impl<'a> TemporalResolver<'a> {
    pub fn new(dates: &'a ReferenceDates) -> Self {
        Self { dates }
    }

    fn anchor(&self, unit: OffsetUnit) -> Option<NaiveDate> {
        match unit {
            OffsetUnit::Pod => self.dates.first_procedure(),
            OffsetUnit::Hd => self.dates.admission,
        }
    }

    /// Temporal context of the mention at `span` in `text`, whose sentence is `sentence`.
    ///
    /// Date precedence: explicit date in the sentence, then the relative offset,
    /// then the note date. An offset without its anchor leaves the date unresolved
    /// rather than falling back.
    pub fn resolve(
        &self,
        text: &str,
        anchors: &NoteAnchors,
        sentence: (usize, usize),
        span: (usize, usize),
        note_date: Option<NaiveDate>,
    ) -> TemporalContext {
        let (classification, cued) = classify(text, sentence, span);
        let relative_offset = anchors.offset_for(sentence, span);
        let explicit = anchors.date_for(sentence, span);

        let resolved_date = match (explicit, relative_offset) {
            (Some(date), _) => Some(date),
            (None, Some(offset)) => self
                .anchor(offset.unit)
                .and_then(|anchor| resolve_offset(anchor, offset.value)),
            (None, None) => note_date,
        };

        let confidence = if cued {
            CUE_CONFIDENCE
        } else if explicit.is_some() || relative_offset.is_some() {
            ANCHORED_CONFIDENCE
        } else {
            NO_CUE_CONFIDENCE
        };

        TemporalContext {
            classification,
            relative_offset,
            resolved_date,
            explicit_date: explicit.is_some(),
            confidence,
        }
    }
}

/// Nearest cue in the sentence decides; no cue means a new event.
fn classify(text: &str, sentence: (usize, usize), span: (usize, usize)) -> (TemporalClass, bool) {
    let body = &text[sentence.0..sentence.1];
    let cues = |re: &Regex, class: TemporalClass| -> Vec<Located<TemporalClass>> {
        re.find_iter(body)
            .map(|m| Located {
                start: sentence.0 + m.start(),
                end: sentence.0 + m.end(),
                item: class,
            })
            .collect()
    };
    let mut all = cues(&NEW_EVENT_CUES, TemporalClass::NewEvent);
    all.extend(cues(&REFERENCE_CUES, TemporalClass::Reference));

    match nearest(&all, sentence, span) {
        Some(cue) => (cue.item, true),
        None => (TemporalClass::NewEvent, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::text::sentence_bounds;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn resolve_in(text: &str, mention: &str, dates: &ReferenceDates) -> TemporalContext {
        let start = text.find(mention).unwrap();
        let span = (start, start + mention.len());
        let sentence = sentence_bounds(text, span.0, span.1);
        let anchors = NoteAnchors::scan(text);
        TemporalResolver::new(dates).resolve(text, &anchors, sentence, span, None)
    }

    fn with_procedure(date: NaiveDate) -> ReferenceDates {
        ReferenceDates {
            procedures: vec![date],
            ..Default::default()
        }
    }

    #[test]
    fn pod_resolves_against_first_procedure() {
        let dates = with_procedure(d(2025, 3, 1));
        let ctx = resolve_in("POD#6 vasospasm", "vasospasm", &dates);
        assert_eq!(ctx.relative_offset, Some(RelativeOffset { unit: OffsetUnit::Pod, value: 6 }));
        assert_eq!(ctx.resolved_date, Some(d(2025, 3, 7)));
        assert_eq!(ctx.classification, TemporalClass::NewEvent);
    }

    #[test]
    fn pod_without_anchor_stays_unresolved() {
        let ctx = resolve_in("POD#6 vasospasm", "vasospasm", &ReferenceDates::default());
        assert!(ctx.relative_offset.is_some());
        assert_eq!(ctx.resolved_date, None);
        assert!(ctx.is_unresolved_offset());
    }

    #[test]
    fn hd_resolves_against_admission() {
        let dates = ReferenceDates {
            admission: Some(d(2025, 1, 30)),
            ..Default::default()
        };
        let ctx = resolve_in("hospital day 3: seizure", "seizure", &dates);
        assert_eq!(ctx.relative_offset.unwrap().unit, OffsetUnit::Hd);
        assert_eq!(ctx.resolved_date, Some(d(2025, 2, 2)));
    }

    #[test]
    fn offset_carries_over_from_earlier_sentence() {
        let dates = with_procedure(d(2025, 3, 1));
        let ctx = resolve_in("POD#2. Started nimodipine.", "nimodipine", &dates);
        assert_eq!(ctx.resolved_date, Some(d(2025, 3, 3)));
        assert_eq!(ctx.classification, TemporalClass::NewEvent);
        assert!((ctx.confidence - CUE_CONFIDENCE).abs() < 1e-6);
    }

    #[test]
    fn status_post_is_reference() {
        let ctx = resolve_in("s/p coiling", "coiling", &ReferenceDates::default());
        assert_eq!(ctx.classification, TemporalClass::Reference);
        assert_eq!(ctx.resolved_date, None);
    }

    #[test]
    fn nearest_cue_wins() {
        let dates = ReferenceDates::default();
        let text = "s/p clipping, underwent EVD placement";
        assert_eq!(resolve_in(text, "EVD", &dates).classification, TemporalClass::NewEvent);
        assert_eq!(resolve_in(text, "clipping", &dates).classification, TemporalClass::Reference);
    }

    #[test]
    fn explicit_date_beats_offset() {
        let dates = with_procedure(d(2025, 3, 1));
        let ctx = resolve_in("POD#4 on 03/20/2025 hydrocephalus", "hydrocephalus", &dates);
        assert_eq!(ctx.resolved_date, Some(d(2025, 3, 20)));
        assert!(ctx.explicit_date);
    }

    #[test]
    fn no_cue_lowers_confidence() {
        let ctx = resolve_in("vasospasm", "vasospasm", &ReferenceDates::default());
        assert_eq!(ctx.classification, TemporalClass::NewEvent);
        assert!((ctx.confidence - NO_CUE_CONFIDENCE).abs() < 1e-6);
    }

    #[test]
    fn offset_arithmetic_is_calendar_days() {
        assert_eq!(resolve_offset(d(2024, 2, 27), 3), Some(d(2024, 3, 1)));
        assert_eq!(resolve_offset(d(2025, 1, 1), 0), Some(d(2025, 1, 1)));
        assert_eq!(resolve_offset(d(2025, 1, 1), -1), Some(d(2024, 12, 31)));
    }
}
