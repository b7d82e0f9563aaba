use std::sync::LazyLock;

use regex::Regex;

use crate::models::Pathology;

use super::types::NoteInput;

/// Proposes a pathology hint from raw notes. The pipeline runs without one.
pub trait PathologyClassifier: Send + Sync {
    fn classify(&self, notes: &[NoteInput]) -> Option<Pathology>;
}

/// Keyword cues per pathology, in tie-break order.
static CUES: LazyLock<Vec<(Pathology, Regex)>> = LazyLock::new(|| {
    [
        (
            Pathology::Sah,
            r"subarachnoid|\bsah\b|aneurysm|hunt[\s-]*(?:and|&)?[\s-]*hess|\bwfns\b|fisher grade|nimodipine|vasospasm|coil(?:ing|ed)|clipping",
        ),
        (
            Pathology::Tbi,
            r"traumatic brain|\btbi\b|head (?:injury|trauma)|subdural|epidural hematoma|contusion|diffuse axonal|\bmva\b|\bfall\b|assault",
        ),
        (
            Pathology::Stroke,
            r"\bstroke\b|ischemic|infarct|\bnihss\b|thrombectomy|\btpa\b|alteplase|\blvo\b|\bmca\b occlusion|occlusion",
        ),
        (
            Pathology::Tumor,
            r"tumou?r|glioma|glioblastoma|\bgbm\b|meningioma|metasta|\bmass\b|resection|\bkps\b|karnofsky|neoplasm",
        ),
        (
            Pathology::Spine,
            r"\bspine\b|spinal|lumbar|cervical|thoracic|laminectomy|discectomy|\bacdf\b|fusion|myelopathy|radiculopathy|stenosis",
        ),
        (
            Pathology::Hydrocephalus,
            r"hydrocephalus|\bnph\b|ventriculomegaly|shunt|ventriculostomy",
        ),
    ]
    .into_iter()
    .map(|(pathology, cue)| (pathology, Regex::new(&format!("(?i){cue}")).unwrap()))
    .collect()
});

/// Counts keyword cues across all notes; the pathology with the most hits wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordPathologyClassifier;

impl KeywordPathologyClassifier {
    /// Cue hits per pathology, in table order.
    pub fn scores(&self, notes: &[NoteInput]) -> Vec<(Pathology, usize)> {
        CUES.iter()
            .map(|(pathology, cue)| {
                let hits = notes.iter().map(|n| cue.find_iter(&n.text).count()).sum();
                (*pathology, hits)
            })
            .collect()
    }
}

impl PathologyClassifier for KeywordPathologyClassifier {
    fn classify(&self, notes: &[NoteInput]) -> Option<Pathology> {
        let scores = self.scores(notes);
        let best = scores
            .iter()
            .fold(None::<&(Pathology, usize)>, |best, s| match best {
                Some(b) if b.1 >= s.1 => Some(b),
                _ => Some(s),
            })
            .filter(|(_, hits)| *hits > 0)
            .map(|(pathology, _)| *pathology);
        tracing::debug!(?best, "Keyword pathology classification");
        best
    }
}
