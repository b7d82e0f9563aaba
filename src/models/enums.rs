use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a string does not name a variant of one of the enums below.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid value for {field}: {value}")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The serialized form is the same literal returned by `as_str`.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            pub fn all() -> &'static [$name] {
                &[$(Self::$variant),+]
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(
    /// Extraction category of a mention. Each category has its own pattern library.
    EntityCategory {
        Procedure => "procedure",
        Intervention => "intervention",
        Medication => "medication",
        Complication => "complication",
        Imaging => "imaging",
        FunctionalScore => "functional_score",
        KeyEvent => "key_event",
        Outcome => "outcome",
    }
);

impl EntityCategory {
    /// Therapeutic categories are candidates for treatment-response tracking.
    pub fn is_therapeutic(&self) -> bool {
        matches!(self, Self::Procedure | Self::Intervention | Self::Medication)
    }
}

str_enum!(
    /// Timeline-level event category.
    EventCategory {
        Diagnostic => "DIAGNOSTIC",
        Therapeutic => "THERAPEUTIC",
        Complication => "COMPLICATION",
        Outcome => "OUTCOME",
    }
);

str_enum!(TemporalClass {
    NewEvent => "NEW_EVENT",
    Reference => "REFERENCE",
});

str_enum!(
    /// Unit of a relative day offset: post-operative day or hospital day.
    OffsetUnit {
        Pod => "POD",
        Hd => "HD",
    }
);

str_enum!(Pathology {
    Sah => "sah",
    Tbi => "tbi",
    Stroke => "stroke",
    Tumor => "tumor",
    Spine => "spine",
    Hydrocephalus => "hydrocephalus",
});

str_enum!(RelationshipType {
    Causes => "CAUSES",
    Triggers => "TRIGGERS",
    RespondsTo => "RESPONDS_TO",
    LeadsTo => "LEADS_TO",
    Prevents => "PREVENTS",
});

str_enum!(MilestoneKind {
    Ictus => "ictus",
    Admission => "admission",
    FirstTherapeutic => "first_therapeutic",
    FirstComplication => "first_complication",
    Discharge => "discharge",
});

str_enum!(ResponseClass {
    Improved => "IMPROVED",
    Worsened => "WORSENED",
    Stable => "STABLE",
    NoChange => "NO_CHANGE",
    Partial => "PARTIAL",
});

str_enum!(
    /// Which evaluation branch produced a treatment-response pair.
    ResponseBranch {
        TreatmentResponse => "treatment_response",
        ProphylaxisSuccess => "prophylaxis_success",
    }
);

str_enum!(OutcomeKind {
    ClinicalImprovement => "clinical_improvement",
    ClinicalStatus => "clinical_status",
    ComplicationOnset => "complication_onset",
    AbsenceOfComplication => "absence_of_complication",
});

str_enum!(Importance {
    Mandatory => "MANDATORY",
    Recommended => "RECOMMENDED",
});

str_enum!(ScoreDirection {
    HigherIsBetter => "higher_is_better",
    LowerIsBetter => "lower_is_better",
});

str_enum!(Significance {
    Minimal => "minimal",
    Minor => "minor",
    Moderate => "moderate",
    Major => "major",
});

str_enum!(ChangeDirection {
    Improvement => "improvement",
    Deterioration => "deterioration",
    Unchanged => "unchanged",
});

str_enum!(TrajectoryPattern {
    Improving => "IMPROVING",
    Declining => "DECLINING",
    Stable => "STABLE",
    Fluctuating => "FLUCTUATING",
});

str_enum!(TrendShape {
    Linear => "LINEAR",
    Stepwise => "STEPWISE",
    Plateau => "PLATEAU",
    UShaped => "U_SHAPED",
    InvertedU => "INVERTED_U",
});

str_enum!(RateClass {
    Rapid => "RAPID",
    Gradual => "GRADUAL",
    Slow => "SLOW",
});
