//! Bundled reference tables.
//!
//! Used when no reference directory is configured, or for any table file
//! missing from it. Patterns are case-insensitive; every table is plain data.

use crate::models::{
    EntityCategory::{self, *},
    Importance,
    Pathology::{self, *},
    ScoreDirection,
};

use super::types::*;

fn p(category: EntityCategory, pattern: &str, confidence: f32) -> PatternSpec {
    PatternSpec::new(category, &format!("(?i){pattern}"), confidence)
}

fn score(label: &str, pattern: &str, confidence: f32, pathologies: &[Pathology]) -> PatternSpec {
    // Shared tail: optional "score"/"grade", optional "of"/"="/":", then the value.
    let full = format!(r"\b(?:{pattern})\s*(?:score|grade)?\s*(?:of|=|:)?\s*(?P<value>\d{{1,3}})\b");
    p(FunctionalScore, &full, confidence)
        .labeled(label)
        .for_pathologies(pathologies)
}

/// Category pattern library.
pub fn patterns() -> Vec<PatternSpec> {
    vec![
        // ── Procedures ──────────────────────────────────────────
        p(Procedure, r"\b(?:endovascular\s+)?coil(?:ing|ed)?(?:\s+embolization)?\b", 0.9)
            .for_pathologies(&[Sah]),
        p(Procedure, r"\b(?:microsurgical\s+|surgical\s+)?(?:aneurysm\s+)?clipp(?:ing|ed)\b", 0.9)
            .for_pathologies(&[Sah]),
        p(Procedure, r"\b(?:external\s+ventricular\s+drain(?:age)?|EVD|ventriculostomy)\b", 0.9)
            .for_pathologies(&[Sah, Tbi, Hydrocephalus]),
        p(Procedure, r"\b(?:VP|ventriculoperitoneal)\s+shunt\b", 0.9)
            .for_pathologies(&[Sah, Hydrocephalus]),
        p(Procedure, r"\blumbar\s+drain\b", 0.85).for_pathologies(&[Sah, Hydrocephalus, Spine]),
        p(Procedure, r"\bcraniotomy\b", 0.85),
        p(Procedure, r"\b(?:decompressive\s+)?(?:hemi)?craniectomy\b", 0.9)
            .for_pathologies(&[Tbi, Stroke]),
        p(Procedure, r"\b(?:mechanical\s+)?thrombectomy\b", 0.9).for_pathologies(&[Stroke]),
        p(Procedure, r"\b(?:gross\s+total\s+|subtotal\s+)?(?:tumou?r\s+)?resection\b", 0.85)
            .for_pathologies(&[Tumor]),
        p(Procedure, r"\b(?:laminectomy|discectomy|spinal\s+fusion|ACDF)\b", 0.85)
            .for_pathologies(&[Spine]),
        p(Procedure, r"\btracheostomy\b", 0.8),
        // ── Interventions ───────────────────────────────────────
        p(
            Intervention,
            r"\b(?:induced\s+hypertension|hypertensive\s+therapy|triple[-\s]?H(?:\s+therapy)?|HHH\s+therapy)\b",
            0.85,
        )
        .for_pathologies(&[Sah]),
        p(Intervention, r"\b(?:balloon\s+)?angioplasty\b", 0.85).for_pathologies(&[Sah, Stroke]),
        p(Intervention, r"\bintra-?arterial\s+(?:verapamil|nicardipine|milrinone)\b", 0.85)
            .for_pathologies(&[Sah]),
        p(Intervention, r"\b(?:IV\s+)?(?:tPA|alteplase|tenecteplase|thrombolysis)\b", 0.85)
            .for_pathologies(&[Stroke]),
        p(Intervention, r"\bintubat(?:ed|ion)\b", 0.8),
        p(Intervention, r"\b(?:blood\s+)?transfusion\b", 0.75),
        // ── Medications ─────────────────────────────────────────
        p(Medication, r"\bnimodipine\b", 0.9).for_pathologies(&[Sah]),
        p(Medication, r"\b(?:levetiracetam|keppra)\b", 0.9),
        p(Medication, r"\bphenytoin\b", 0.85),
        p(Medication, r"\b(?:dexamethasone|decadron)\b", 0.85).for_pathologies(&[Tumor, Spine]),
        p(Medication, r"\b(?:subcutaneous\s+|SQ\s+|SC\s+)?heparin\b", 0.8),
        p(Medication, r"\b(?:enoxaparin|lovenox)\b", 0.85),
        p(Medication, r"\b(?:aspirin|clopidogrel|plavix)\b", 0.85).for_pathologies(&[Stroke]),
        p(Medication, r"\b(?:mannitol|hypertonic\s+saline)\b", 0.85)
            .for_pathologies(&[Tbi, Stroke, Tumor]),
        p(Medication, r"\b(?:tranexamic\s+acid|TXA)\b", 0.85).for_pathologies(&[Sah, Tbi]),
        p(Medication, r"\b(?:vancomycin|cefazolin|ceftriaxone|meropenem)\b", 0.8),
        p(Medication, r"\bnicardipine\b", 0.8),
        // ── Complications ───────────────────────────────────────
        p(Complication, r"\b(?:cerebral\s+|angiographic\s+|symptomatic\s+)?vasospasm\b", 0.9)
            .for_pathologies(&[Sah]),
        p(Complication, r"\b(?:delayed\s+cerebral\s+ischemia|DCI)\b", 0.9).for_pathologies(&[Sah]),
        p(Complication, r"\b(?:re-?bleed(?:ing)?|re-?rupture)\b", 0.9).for_pathologies(&[Sah]),
        p(Complication, r"\bhydrocephalus\b", 0.85),
        p(Complication, r"\bseizures?\b", 0.85),
        p(Complication, r"\b(?:hyponatremia|SIADH|cerebral\s+salt\s+wasting)\b", 0.85),
        p(Complication, r"\bhypernatremia\b", 0.8),
        p(
            Complication,
            r"\b(?:ventriculitis|meningitis|wound\s+infection|pneumonia|urinary\s+tract\s+infection|UTI|sepsis)\b",
            0.85,
        ),
        p(Complication, r"\b(?:DVT|deep\s+vein\s+thrombosis|pulmonary\s+embol(?:ism|us))\b", 0.85),
        p(Complication, r"\b(?:new\s+)?(?:cerebral\s+)?infarct(?:ion)?\b", 0.8),
        p(Complication, r"\bhemorrhagic\s+transformation\b", 0.85).for_pathologies(&[Stroke]),
        p(Complication, r"\b(?:elevated|raised|increased)\s+(?:ICP|intracranial\s+pressure)\b", 0.85)
            .for_pathologies(&[Tbi]),
        p(Complication, r"\bcerebral\s+edema\b", 0.8),
        p(Complication, r"\bCSF\s+leak\b", 0.85).for_pathologies(&[Spine, Tumor]),
        p(Complication, r"\bpulmonary\s+edema\b", 0.85),
        p(Complication, r"\bhypotension\b", 0.75),
        p(Complication, r"\b(?:cardiac\s+)?arrhythmias?\b", 0.8),
        p(Complication, r"\bthrombocytopenia\b", 0.8),
        p(Complication, r"\b(?:epidural\s+|subdural\s+|postoperative\s+|wound\s+)?hematoma\b", 0.8),
        p(Complication, r"\b(?:acute\s+kidney\s+injury|AKI)\b", 0.8),
        p(Complication, r"\b(?:vessel\s+rupture|arterial\s+dissection)\b", 0.8)
            .for_pathologies(&[Sah, Stroke]),
        // ── Imaging ─────────────────────────────────────────────
        p(Imaging, r"\b(?:CT\s+angiogra(?:m|phy)|CTA|CT\s+perfusion)\b", 0.85),
        p(Imaging, r"\b(?:head\s+CT|non-?contrast\s+CT|CT\s+head|CT)\b", 0.8),
        p(Imaging, r"\b(?:MRI|MR\s+imaging)\b", 0.85),
        p(
            Imaging,
            r"\b(?:(?:digital\s+subtraction\s+|cerebral\s+)?angiogra(?:m|phy)|DSA)\b",
            0.8,
        ),
        p(Imaging, r"\b(?:transcranial\s+doppler|TCDs?)\b", 0.85).for_pathologies(&[Sah]),
        p(Imaging, r"\b(?:continuous\s+)?EEG\b", 0.8),
        // ── Functional scores ───────────────────────────────────
        score("gcs", r"GCS|Glasgow\s+Coma\s+Scale", 0.9, &[]),
        score("mrs", r"mRS|modified\s+Rankin(?:\s+Scale)?", 0.9, &[]),
        score("nihss", r"NIHSS", 0.9, &[Stroke]),
        score("kps", r"KPS|Karnofsky(?:\s+performance\s+(?:status|score))?", 0.9, &[Tumor]),
        score("gose", r"GOS-?E", 0.9, &[Tbi]),
        score("gos", r"GOS", 0.85, &[Tbi]),
        score("hunt_hess", r"Hunt\s+(?:and|&)\s+Hess|HH", 0.9, &[Sah]),
        score("wfns", r"WFNS", 0.9, &[Sah]),
        score("barthel", r"Barthel(?:\s+index)?", 0.85, &[]),
        // ── Key events ──────────────────────────────────────────
        p(KeyEvent, r"\b(?:admitted|admission)\b", 0.8).labeled("admission"),
        p(KeyEvent, r"\bdischarged?\b", 0.8).labeled("discharge"),
        p(
            KeyEvent,
            r"\b(?:ictus|aneurysm(?:al)?\s+rupture|thunderclap\s+headache|symptom\s+onset|last\s+known\s+well|time\s+of\s+injury|motor\s+vehicle\s+(?:collision|accident)|MVC)\b",
            0.8,
        )
        .labeled("ictus"),
        // ── Outcomes ────────────────────────────────────────────
        p(
            Outcome,
            r"\b(?:partial(?:ly)?\s+(?:improved|resolved|improvement|response)|(?:somewhat|slowly)\s+improv(?:ed|ing))\b",
            0.8,
        ),
        p(Outcome, r"\b(?:resolved|resolution|resolving|recovered|recovering)\b", 0.8),
        p(Outcome, r"\b(?:improved|improving|improvement|better)\b", 0.75),
        p(Outcome, r"\b(?:worse|worsened|worsening|deteriorat(?:ed|ing|ion)|declined|declining)\b", 0.8),
        p(Outcome, r"\b(?:unchanged|no\s+change|persist(?:s|ed|ent|ing)?)\b", 0.7),
        p(Outcome, r"\b(?:stable|stabilized)\b", 0.7),
    ]
}

fn group(preferred: &str, synonyms: &[&str]) -> SynonymGroup {
    SynonymGroup {
        preferred: preferred.to_string(),
        synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
    }
}

/// Canonicalization groups: preferred term first, then surface forms.
pub fn synonyms() -> SynonymTable {
    SynonymTable::from(vec![
        group(
            "aneurysm coiling",
            &["coiling", "coil", "coiled", "endovascular coiling", "coil embolization", "endovascular coil embolization"],
        ),
        group(
            "aneurysm clipping",
            &["clipping", "clipped", "surgical clipping", "microsurgical clipping", "aneurysm clipped"],
        ),
        group(
            "external ventricular drain",
            &["evd", "external ventricular drainage", "ventriculostomy"],
        ),
        group("vp shunt", &["ventriculoperitoneal shunt"]),
        group(
            "decompressive craniectomy",
            &["craniectomy", "hemicraniectomy", "decompressive hemicraniectomy"],
        ),
        group(
            "induced hypertension",
            &["hypertensive therapy", "triple h", "triple h therapy", "hhh therapy"],
        ),
        group("thrombolysis", &["tpa", "iv tpa", "alteplase", "tenecteplase"]),
        group("vasospasm", &["cerebral vasospasm", "angiographic vasospasm", "symptomatic vasospasm"]),
        group("delayed cerebral ischemia", &["dci"]),
        group("rebleed", &["re bleed", "rebleeding", "re bleeding", "rerupture", "re rupture"]),
        group("seizure", &["seizures"]),
        group("deep vein thrombosis", &["dvt"]),
        group("pulmonary embolism", &["pulmonary embolus"]),
        group("arrhythmia", &["arrhythmias", "cardiac arrhythmia", "cardiac arrhythmias"]),
        group("acute kidney injury", &["aki"]),
        group("levetiracetam", &["keppra"]),
        group("enoxaparin", &["lovenox"]),
        group("dexamethasone", &["decadron"]),
        group("clopidogrel", &["plavix"]),
        group("heparin", &["subcutaneous heparin", "sq heparin", "sc heparin"]),
        group("tranexamic acid", &["txa"]),
        group("ct angiography", &["cta", "ct angiogram"]),
        group(
            "cerebral angiography",
            &["angiogram", "angiography", "dsa", "cerebral angiogram", "digital subtraction angiography"],
        ),
        group("transcranial doppler", &["tcd", "tcds"]),
        group("head ct", &["ct", "ct head", "non contrast ct", "noncontrast ct"]),
        group("mri", &["mr imaging"]),
        group("eeg", &["continuous eeg"]),
    ])
}

fn scale(name: &str, display: &str, min: f64, max: f64, direction: ScoreDirection) -> ScaleDefinition {
    ScaleDefinition {
        name: name.to_string(),
        display: display.to_string(),
        min,
        max,
        direction,
    }
}

pub fn scales() -> ScaleTable {
    use ScoreDirection::{HigherIsBetter, LowerIsBetter};
    ScaleTable {
        scales: vec![
            scale("gcs", "Glasgow Coma Scale", 3.0, 15.0, HigherIsBetter),
            scale("mrs", "Modified Rankin Scale", 0.0, 6.0, LowerIsBetter),
            scale("nihss", "NIH Stroke Scale", 0.0, 42.0, LowerIsBetter),
            scale("kps", "Karnofsky Performance Status", 0.0, 100.0, HigherIsBetter),
            scale("gos", "Glasgow Outcome Scale", 1.0, 5.0, HigherIsBetter),
            scale("gose", "Glasgow Outcome Scale Extended", 1.0, 8.0, HigherIsBetter),
            scale("hunt_hess", "Hunt and Hess", 1.0, 5.0, LowerIsBetter),
            scale("wfns", "WFNS grade", 1.0, 5.0, LowerIsBetter),
            scale("barthel", "Barthel Index", 0.0, 100.0, HigherIsBetter),
        ],
    }
}

pub fn prophylaxis() -> Vec<ProphylaxisRule> {
    vec![
        ProphylaxisRule {
            agent: "nimodipine".into(),
            expected_complications: vec!["vasospasm".into(), "delayed cerebral ischemia".into()],
            window_days: Some(21),
        },
        ProphylaxisRule {
            agent: "levetiracetam".into(),
            expected_complications: vec!["seizure".into()],
            window_days: Some(7),
        },
        ProphylaxisRule {
            agent: "phenytoin".into(),
            expected_complications: vec!["seizure".into()],
            window_days: Some(7),
        },
        ProphylaxisRule {
            agent: "heparin".into(),
            expected_complications: vec!["deep vein thrombosis".into(), "pulmonary embolism".into()],
            window_days: None,
        },
        ProphylaxisRule {
            agent: "enoxaparin".into(),
            expected_complications: vec!["deep vein thrombosis".into(), "pulmonary embolism".into()],
            window_days: None,
        },
    ]
}

pub fn side_effects() -> Vec<SideEffectRule> {
    let rule = |intervention: &str, effects: &[&str]| SideEffectRule {
        intervention: intervention.to_string(),
        adverse_effects: effects.iter().map(|s| s.to_string()).collect(),
    };
    vec![
        rule("induced hypertension", &["pulmonary edema", "arrhythmia"]),
        rule("nimodipine", &["hypotension"]),
        rule("heparin", &["thrombocytopenia", "hematoma"]),
        rule("enoxaparin", &["thrombocytopenia", "hematoma"]),
        rule("mannitol", &["hypernatremia", "acute kidney injury"]),
        rule("hypertonic saline", &["hypernatremia"]),
        rule("angioplasty", &["vessel rupture", "arterial dissection"]),
        rule("thrombolysis", &["hemorrhagic transformation"]),
        rule("external ventricular drain", &["ventriculitis"]),
    ]
}

fn item(id: &str, description: &str, importance: Importance, requirement: ProtocolRequirement) -> ProtocolItem {
    ProtocolItem {
        id: id.to_string(),
        description: description.to_string(),
        importance,
        requirement,
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

pub fn protocols() -> Vec<ProtocolChecklist> {
    use Importance::{Mandatory, Recommended};
    use ProtocolRequirement::*;
    vec![
        ProtocolChecklist {
            pathology: Sah,
            items: vec![
                item(
                    "sah-nimodipine",
                    "Nimodipine given for its full 21-day course",
                    Mandatory,
                    MedicationCourse { agents: strings(&["nimodipine"]), min_days: 21 },
                ),
                item(
                    "sah-secure-aneurysm",
                    "Aneurysm secured within 72 hours of ictus",
                    Mandatory,
                    ProcedureWithin {
                        procedures: strings(&["aneurysm coiling", "aneurysm clipping"]),
                        hours: 72,
                    },
                ),
                item(
                    "sah-tcd",
                    "Transcranial doppler vasospasm surveillance",
                    Recommended,
                    ImagingPerformed { studies: strings(&["transcranial doppler"]) },
                ),
                item(
                    "sah-csf-diversion",
                    "CSF diversion when hydrocephalus develops",
                    Recommended,
                    ConditionalProcedure {
                        if_complications: strings(&["hydrocephalus"]),
                        procedures: strings(&["external ventricular drain", "vp shunt", "lumbar drain"]),
                    },
                ),
                item(
                    "sah-grade",
                    "Clinical grade documented",
                    Recommended,
                    ScoreDocumented { scales: strings(&["hunt_hess", "wfns"]) },
                ),
            ],
        },
        ProtocolChecklist {
            pathology: Tbi,
            items: vec![
                item(
                    "tbi-gcs",
                    "GCS documented",
                    Mandatory,
                    ScoreDocumented { scales: strings(&["gcs"]) },
                ),
                item(
                    "tbi-seizure-prophylaxis",
                    "Seizure prophylaxis for 7 days",
                    Recommended,
                    MedicationCourse { agents: strings(&["levetiracetam", "phenytoin"]), min_days: 7 },
                ),
                item(
                    "tbi-repeat-ct",
                    "Head CT performed",
                    Recommended,
                    ImagingPerformed { studies: strings(&["head ct"]) },
                ),
                item(
                    "tbi-vte",
                    "VTE prophylaxis started",
                    Recommended,
                    MedicationCourse { agents: strings(&["enoxaparin", "heparin"]), min_days: 1 },
                ),
            ],
        },
        ProtocolChecklist {
            pathology: Stroke,
            items: vec![
                item(
                    "stroke-nihss",
                    "NIHSS documented",
                    Mandatory,
                    ScoreDocumented { scales: strings(&["nihss"]) },
                ),
                item(
                    "stroke-imaging",
                    "Brain imaging performed",
                    Mandatory,
                    ImagingPerformed { studies: strings(&["head ct", "mri", "ct angiography"]) },
                ),
                item(
                    "stroke-antiplatelet",
                    "Antiplatelet therapy started",
                    Recommended,
                    MedicationCourse { agents: strings(&["aspirin", "clopidogrel"]), min_days: 1 },
                ),
            ],
        },
        ProtocolChecklist {
            pathology: Tumor,
            items: vec![
                item(
                    "tumor-mri",
                    "MRI performed",
                    Mandatory,
                    ImagingPerformed { studies: strings(&["mri"]) },
                ),
                item(
                    "tumor-steroids",
                    "Perioperative dexamethasone",
                    Recommended,
                    MedicationCourse { agents: strings(&["dexamethasone"]), min_days: 1 },
                ),
                item(
                    "tumor-kps",
                    "Karnofsky status documented",
                    Recommended,
                    ScoreDocumented { scales: strings(&["kps"]) },
                ),
            ],
        },
        ProtocolChecklist {
            pathology: Spine,
            items: vec![item(
                "spine-mri",
                "MRI performed",
                Mandatory,
                ImagingPerformed { studies: strings(&["mri"]) },
            )],
        },
        ProtocolChecklist {
            pathology: Hydrocephalus,
            items: vec![item(
                "hydro-diversion",
                "CSF diversion performed for hydrocephalus",
                Mandatory,
                ConditionalProcedure {
                    if_complications: strings(&["hydrocephalus"]),
                    procedures: strings(&["external ventricular drain", "vp shunt", "lumbar drain"]),
                },
            )],
        },
    ]
}
