pub mod aggregator;
pub mod store;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Label a classifier emits when its field is not shown on screen
pub const NONE_LABEL: &str = "None";

/// The seven per-field classifiers read from a launch-monitor screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    HlaDirection,
    SpinAxisDirection,
    BallSpeedUnits,
    CarryUnits,
    PathDirection,
    AoaDirection,
    ClubSpeedUnits,
}

impl FieldKey {
    pub const ALL: [FieldKey; 7] = [
        FieldKey::HlaDirection,
        FieldKey::SpinAxisDirection,
        FieldKey::BallSpeedUnits,
        FieldKey::CarryUnits,
        FieldKey::PathDirection,
        FieldKey::AoaDirection,
        FieldKey::ClubSpeedUnits,
    ];

    pub const BALL: [FieldKey; 4] = [
        FieldKey::HlaDirection,
        FieldKey::SpinAxisDirection,
        FieldKey::BallSpeedUnits,
        FieldKey::CarryUnits,
    ];

    pub const CLUB: [FieldKey; 3] = [
        FieldKey::PathDirection,
        FieldKey::AoaDirection,
        FieldKey::ClubSpeedUnits,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::HlaDirection => "hla-direction",
            FieldKey::SpinAxisDirection => "spin-axis-direction",
            FieldKey::BallSpeedUnits => "ball-speed-units",
            FieldKey::CarryUnits => "carry-units",
            FieldKey::PathDirection => "path-direction",
            FieldKey::AoaDirection => "aoa-direction",
            FieldKey::ClubSpeedUnits => "club-speed-units",
        }
    }

    pub fn is_ball_field(&self) -> bool {
        FieldKey::BALL.contains(self)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::InvalidAnnotation(format!("unknown field key '{}'", s)))
    }
}

/// Which logical display a photo shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenType {
    Ball,
    Club,
    Both,
    None,
}

impl ScreenType {
    /// Combine the two independent visibility flags
    pub fn from_flags(ball_screen: bool, club_screen: bool) -> Self {
        match (ball_screen, club_screen) {
            (true, true) => ScreenType::Both,
            (true, false) => ScreenType::Ball,
            (false, true) => ScreenType::Club,
            (false, false) => ScreenType::None,
        }
    }

    pub fn shows_ball(&self) -> bool {
        matches!(self, ScreenType::Ball | ScreenType::Both)
    }

    pub fn shows_club(&self) -> bool {
        matches!(self, ScreenType::Club | ScreenType::Both)
    }
}

/// Full field -> label map produced by running every classifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPredictions {
    labels: HashMap<FieldKey, String>,
}

impl FieldPredictions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: FieldKey, label: impl Into<String>) {
        self.labels.insert(key, label.into());
    }

    pub fn get(&self, key: FieldKey) -> Option<&str> {
        self.labels.get(&key).map(String::as_str)
    }

    /// A field counts as visible unless it was predicted as "None".
    /// A missing prediction is treated as not visible.
    fn is_visible(&self, key: FieldKey) -> bool {
        self.get(key).is_some_and(|label| label != NONE_LABEL)
    }

    pub fn screen_type(&self) -> ScreenType {
        let ball_screen = FieldKey::BALL.iter().any(|&k| self.is_visible(k));
        let club_screen = FieldKey::CLUB.iter().any(|&k| self.is_visible(k));
        ScreenType::from_flags(ball_screen, club_screen)
    }

    fn label(&self, key: FieldKey) -> String {
        self.get(key).unwrap_or(NONE_LABEL).to_string()
    }
}

impl FromIterator<(FieldKey, String)> for FieldPredictions {
    fn from_iter<I: IntoIterator<Item = (FieldKey, String)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BallFields {
    pub hla_direction: String,
    pub spin_axis_direction: String,
    pub ball_speed_units: String,
    pub carry_units: String,
}

impl BallFields {
    fn from_predictions(p: &FieldPredictions) -> Self {
        Self {
            hla_direction: p.label(FieldKey::HlaDirection),
            spin_axis_direction: p.label(FieldKey::SpinAxisDirection),
            ball_speed_units: p.label(FieldKey::BallSpeedUnits),
            carry_units: p.label(FieldKey::CarryUnits),
        }
    }

    pub fn get(&self, key: FieldKey) -> Option<&str> {
        match key {
            FieldKey::HlaDirection => Some(&self.hla_direction),
            FieldKey::SpinAxisDirection => Some(&self.spin_axis_direction),
            FieldKey::BallSpeedUnits => Some(&self.ball_speed_units),
            FieldKey::CarryUnits => Some(&self.carry_units),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClubFields {
    pub path_direction: String,
    pub aoa_direction: String,
    pub club_speed_units: String,
}

impl ClubFields {
    fn from_predictions(p: &FieldPredictions) -> Self {
        Self {
            path_direction: p.label(FieldKey::PathDirection),
            aoa_direction: p.label(FieldKey::AoaDirection),
            club_speed_units: p.label(FieldKey::ClubSpeedUnits),
        }
    }

    pub fn get(&self, key: FieldKey) -> Option<&str> {
        match key {
            FieldKey::PathDirection => Some(&self.path_direction),
            FieldKey::AoaDirection => Some(&self.aoa_direction),
            FieldKey::ClubSpeedUnits => Some(&self.club_speed_units),
            _ => None,
        }
    }
}

/// Field groups present on a record, one variant per screen type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenFields {
    Ball(BallFields),
    Club(ClubFields),
    Both(BallFields, ClubFields),
    None,
}

impl ScreenFields {
    pub fn screen_type(&self) -> ScreenType {
        match self {
            ScreenFields::Ball(_) => ScreenType::Ball,
            ScreenFields::Club(_) => ScreenType::Club,
            ScreenFields::Both(_, _) => ScreenType::Both,
            ScreenFields::None => ScreenType::None,
        }
    }

    pub fn ball(&self) -> Option<&BallFields> {
        match self {
            ScreenFields::Ball(b) | ScreenFields::Both(b, _) => Some(b),
            _ => None,
        }
    }

    pub fn club(&self) -> Option<&ClubFields> {
        match self {
            ScreenFields::Club(c) | ScreenFields::Both(_, c) => Some(c),
            _ => None,
        }
    }
}

/// Annotation of one image. Which field keys exist is decided by the
/// screen variant, so a record can never carry fields its screen hides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRecord", into = "RawRecord")]
pub struct AnnotationRecord {
    pub filename: String,
    pub fields: ScreenFields,
}

impl AnnotationRecord {
    pub fn new(filename: impl Into<String>, fields: ScreenFields) -> Self {
        Self {
            filename: filename.into(),
            fields,
        }
    }

    /// Derive the screen type from the predictions and keep only the field
    /// groups it shows. Ball and club visibility are checked independently
    /// so that "Both" carries all seven fields.
    pub fn from_predictions(filename: impl Into<String>, predictions: &FieldPredictions) -> Self {
        let screen = predictions.screen_type();
        let ball = screen.shows_ball().then(|| BallFields::from_predictions(predictions));
        let club = screen.shows_club().then(|| ClubFields::from_predictions(predictions));

        let fields = match (ball, club) {
            (Some(b), Some(c)) => ScreenFields::Both(b, c),
            (Some(b), None) => ScreenFields::Ball(b),
            (None, Some(c)) => ScreenFields::Club(c),
            (None, None) => ScreenFields::None,
        };
        Self::new(filename, fields)
    }

    pub fn screen(&self) -> ScreenType {
        self.fields.screen_type()
    }

    /// Label of `key` if the record's screen shows it
    pub fn field(&self, key: FieldKey) -> Option<&str> {
        if key.is_ball_field() {
            self.fields.ball().and_then(|b| b.get(key))
        } else {
            self.fields.club().and_then(|c| c.get(key))
        }
    }

    /// Every field key carried by this record
    pub fn field_keys(&self) -> Vec<FieldKey> {
        FieldKey::ALL
            .into_iter()
            .filter(|&k| self.field(k).is_some())
            .collect()
    }
}

/// Flat on-disk shape: `{"filename", "screen", <field keys>...}`
#[derive(Serialize, Deserialize)]
struct RawRecord {
    filename: String,
    screen: ScreenType,
    #[serde(flatten)]
    fields: BTreeMap<String, String>,
}

/// Whether a whole field group is present. A group with only some of its
/// keys cannot be rebuilt and is rejected.
fn group_present(filename: &str, group: &str, keys: &[FieldKey], labels: &FieldPredictions) -> Result<bool, Error> {
    let present = keys.iter().filter(|&&k| labels.get(k).is_some()).count();
    match present {
        0 => Ok(false),
        n if n == keys.len() => Ok(true),
        n => Err(Error::InvalidAnnotation(format!(
            "'{}' has {} of {} {} fields",
            filename,
            n,
            keys.len(),
            group
        ))),
    }
}

impl TryFrom<RawRecord> for AnnotationRecord {
    type Error = Error;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        let mut labels = FieldPredictions::new();
        for (name, label) in raw.fields {
            let key: FieldKey = name.parse().map_err(|_| {
                Error::InvalidAnnotation(format!("'{}' has unknown field '{}'", raw.filename, name))
            })?;
            labels.insert(key, label);
        }

        let ball = group_present(&raw.filename, "ball", &FieldKey::BALL, &labels)?;
        let club = group_present(&raw.filename, "club", &FieldKey::CLUB, &labels)?;

        let fields = match (raw.screen, ball, club) {
            (ScreenType::Ball, true, false) => ScreenFields::Ball(BallFields::from_predictions(&labels)),
            (ScreenType::Club, false, true) => ScreenFields::Club(ClubFields::from_predictions(&labels)),
            (ScreenType::Both, true, true) => ScreenFields::Both(
                BallFields::from_predictions(&labels),
                ClubFields::from_predictions(&labels),
            ),
            (ScreenType::None, false, false) => ScreenFields::None,
            (ScreenType::Both, true, false) => {
                // Older annotators checked ball before club with an else-branch,
                // so "Both" screens were written without their club fields
                return Err(Error::InvalidAnnotation(format!(
                    "'{}' is marked Both but has no club fields, as written by the older \
                     ball-first annotator; re-run `annotate` on this dataset or change its screen to \"Ball\"",
                    raw.filename
                )));
            }
            (screen, ball, club) => {
                return Err(Error::InvalidAnnotation(format!(
                    "'{}' has screen {:?} but ball fields {} and club fields {}",
                    raw.filename,
                    screen,
                    if ball { "present" } else { "absent" },
                    if club { "present" } else { "absent" },
                )));
            }
        };
        Ok(AnnotationRecord::new(raw.filename, fields))
    }
}

impl From<AnnotationRecord> for RawRecord {
    fn from(record: AnnotationRecord) -> Self {
        let fields = record
            .field_keys()
            .into_iter()
            .filter_map(|k| record.field(k).map(|label| (k.as_str().to_string(), label.to_string())))
            .collect();
        RawRecord {
            screen: record.screen(),
            filename: record.filename,
            fields,
        }
    }
}
