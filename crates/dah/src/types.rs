//! Data model exchanged between a Host and a Hosted Application
//!
//! All records are plain values: the codec copies them across the process
//! boundary and nothing here carries pixel data, only descriptors and locators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::uuid_record;
use crate::DahError;

/// Metadata identifying one unit of exchangeable data, without its bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    #[serde(rename = "DescriptorUuid", with = "uuid_record")]
    pub descriptor_id: Uuid,

    #[serde(rename = "MimeType")]
    pub mime_type: String,

    #[serde(rename = "ClassUID")]
    pub class_uid: String,

    #[serde(rename = "TransferSyntaxUID")]
    pub transfer_syntax_uid: String,

    #[serde(rename = "Modality")]
    pub modality: String,
}

/// Resolves a descriptor to retrievable bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLocator {
    #[serde(rename = "Locator", with = "uuid_record")]
    pub locator_id: Uuid,

    #[serde(rename = "Source", with = "uuid_record")]
    pub source_id: Uuid,

    #[serde(rename = "TransferSyntax")]
    pub transfer_syntax: String,

    #[serde(rename = "Offset")]
    pub offset: i64,

    #[serde(rename = "Length")]
    pub length: i64,

    #[serde(rename = "URI")]
    pub uri: String,
}

impl ObjectLocator {
    /// Locator covering a whole resource at `uri`
    pub fn whole(locator_id: Uuid, source_id: Uuid, transfer_syntax: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            locator_id,
            source_id,
            transfer_syntax: transfer_syntax.into(),
            offset: 0,
            length: 0,
            uri: uri.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    #[serde(rename = "SeriesUID")]
    pub series_uid: String,

    #[serde(rename = "ObjectDescriptors", default)]
    pub descriptors: Vec<ObjectDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Study {
    #[serde(rename = "StudyUID")]
    pub study_uid: String,

    #[serde(rename = "ObjectDescriptors", default)]
    pub descriptors: Vec<ObjectDescriptor>,

    #[serde(rename = "Series", default)]
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "AssigningAuthority")]
    pub assigning_authority: String,

    #[serde(rename = "Sex")]
    pub sex: String,

    #[serde(rename = "BirthDate")]
    pub birth_date: String,

    #[serde(rename = "ObjectDescriptors", default)]
    pub descriptors: Vec<ObjectDescriptor>,

    #[serde(rename = "Studies", default)]
    pub studies: Vec<Study>,
}

/// Root of one data availability announcement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableData {
    #[serde(rename = "ObjectDescriptors", default)]
    pub descriptors: Vec<ObjectDescriptor>,

    #[serde(rename = "Patients", default)]
    pub patients: Vec<Patient>,
}

impl Series {
    fn append(&mut self, other: Series) {
        self.descriptors.extend(other.descriptors);
    }
}

impl Study {
    fn append(&mut self, other: Study) {
        self.descriptors.extend(other.descriptors);
        for series in other.series {
            match self
                .series
                .iter_mut()
                .find(|s| s.series_uid == series.series_uid)
            {
                Some(existing) => existing.append(series),
                None => self.series.push(series),
            }
        }
    }

    /// Descriptors attached to the study and to every series under it
    pub fn all_descriptors(&self) -> impl Iterator<Item = &ObjectDescriptor> + '_ {
        self.descriptors
            .iter()
            .chain(self.series.iter().flat_map(|s| s.descriptors.iter()))
    }
}

impl Patient {
    fn append(&mut self, other: Patient) {
        self.descriptors.extend(other.descriptors);
        for study in other.studies {
            match self
                .studies
                .iter_mut()
                .find(|s| s.study_uid == study.study_uid)
            {
                Some(existing) => existing.append(study),
                None => self.studies.push(study),
            }
        }
    }

    /// Descriptors attached anywhere below this patient, including the patient itself
    pub fn all_descriptors(&self) -> impl Iterator<Item = &ObjectDescriptor> + '_ {
        self.descriptors
            .iter()
            .chain(self.studies.iter().flat_map(|s| s.all_descriptors()))
    }
}

impl AvailableData {
    /// Merge another announcement into this one.
    ///
    /// Descriptor lists are concatenated at every level. Patients are matched by
    /// `id`, studies by `study_uid` and series by `series_uid`; a node with no
    /// match is appended as a whole.
    pub fn append(&mut self, other: AvailableData) {
        self.descriptors.extend(other.descriptors);
        for patient in other.patients {
            match self.patients.iter_mut().find(|p| p.id == patient.id) {
                Some(existing) => existing.append(patient),
                None => self.patients.push(patient),
            }
        }
    }

    /// Every descriptor reachable in the tree, top level first
    pub fn all_descriptors(&self) -> impl Iterator<Item = &ObjectDescriptor> + '_ {
        self.descriptors
            .iter()
            .chain(self.patients.iter().flat_map(|p| p.all_descriptors()))
    }

    /// Identifiers of every descriptor reachable in the tree
    pub fn descriptor_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.all_descriptors().map(|d| d.descriptor_id)
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty() && self.patients.is_empty()
    }
}

/// Lifecycle state of one hosted application session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    Idle,
    InProgress,
    Completed,
    Suspended,
    Canceled,
    Exit,
}

impl State {
    pub const ALL: [State; 6] = [
        State::Idle,
        State::InProgress,
        State::Completed,
        State::Suspended,
        State::Canceled,
        State::Exit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Idle => "IDLE",
            State::InProgress => "INPROGRESS",
            State::Completed => "COMPLETED",
            State::Suspended => "SUSPENDED",
            State::Canceled => "CANCELED",
            State::Exit => "EXIT",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = DahError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        State::ALL
            .iter()
            .copied()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DahError::codec(format!("unknown state '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Information,
    Warning,
    Error,
    FatalError,
}

/// One-way notification from a hosted application; never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    #[serde(rename = "StatusType")]
    pub severity: Severity,

    #[serde(rename = "CodingSchemeDesignator")]
    pub coding_scheme_designator: String,

    #[serde(rename = "CodeValue")]
    pub code_value: String,

    #[serde(rename = "CodeMeaning")]
    pub code_meaning: String,
}

/// Screen area used for window placement negotiation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rectangle {
    #[serde(rename = "RefPointX")]
    pub x: i32,

    #[serde(rename = "RefPointY")]
    pub y: i32,

    #[serde(rename = "Width")]
    pub width: i32,

    #[serde(rename = "Height")]
    pub height: i32,
}

impl Rectangle {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Overlapping area of two rectangles, if any
    pub fn intersection(&self, other: &Rectangle) -> Option<Rectangle> {
        // Far edges can lie past i32::MAX.
        let right = (i64::from(self.x) + i64::from(self.width))
            .min(i64::from(other.x) + i64::from(other.width));
        let bottom = (i64::from(self.y) + i64::from(self.height))
            .min(i64::from(other.y) + i64::from(other.height));
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);

        let width = i32::try_from(right - i64::from(left)).ok()?;
        let height = i32::try_from(bottom - i64::from(top)).ok()?;
        let rect = Rectangle::new(left, top, width, height);
        (!rect.is_empty()).then_some(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ObjectDescriptor {
        ObjectDescriptor {
            descriptor_id: Uuid::new_v4(),
            mime_type: "application/dicom".to_string(),
            class_uid: "1.2.840.10008.5.1.4.1.1.2".to_string(),
            transfer_syntax_uid: "1.2.840.10008.1.2.1".to_string(),
            modality: "CT".to_string(),
        }
    }

    fn patient(id: &str, study_uid: &str, series_uid: &str) -> Patient {
        Patient {
            name: "DOE^JANE".to_string(),
            id: id.to_string(),
            studies: vec![Study {
                study_uid: study_uid.to_string(),
                series: vec![Series {
                    series_uid: series_uid.to_string(),
                    descriptors: vec![descriptor()],
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn append_merges_patient_by_id() {
        let mut data = AvailableData {
            patients: vec![patient("P1", "1.1", "1.1.1")],
            ..Default::default()
        };
        data.append(AvailableData {
            patients: vec![patient("P1", "1.2", "1.2.1")],
            ..Default::default()
        });

        assert_eq!(data.patients.len(), 1);
        let studies: Vec<_> = data.patients[0]
            .studies
            .iter()
            .map(|s| s.study_uid.as_str())
            .collect();
        assert_eq!(studies, vec!["1.1", "1.2"]);
    }

    #[test]
    fn append_merges_down_to_series() {
        let mut data = AvailableData {
            patients: vec![patient("P1", "1.1", "1.1.1")],
            ..Default::default()
        };
        data.append(AvailableData {
            patients: vec![patient("P1", "1.1", "1.1.1")],
            ..Default::default()
        });

        let study = &data.patients[0].studies;
        assert_eq!(study.len(), 1);
        assert_eq!(study[0].series.len(), 1);
        assert_eq!(study[0].series[0].descriptors.len(), 2);
    }

    #[test]
    fn append_keeps_distinct_patients() {
        let mut data = AvailableData::default();
        data.append(AvailableData {
            descriptors: vec![descriptor()],
            patients: vec![patient("P1", "1.1", "1.1.1")],
        });
        data.append(AvailableData {
            descriptors: vec![descriptor()],
            patients: vec![patient("P2", "2.1", "2.1.1")],
        });

        assert_eq!(data.descriptors.len(), 2);
        assert_eq!(data.patients.len(), 2);
        assert_eq!(data.descriptor_ids().count(), 4);
    }

    #[test]
    fn descriptor_ids_walk_every_level() {
        let mut p = patient("P1", "1.1", "1.1.1");
        p.descriptors.push(descriptor());
        p.studies[0].descriptors.push(descriptor());
        let data = AvailableData {
            descriptors: vec![descriptor()],
            patients: vec![p],
        };
        assert_eq!(data.descriptor_ids().count(), 4);
    }

    #[test]
    fn state_parses_case_insensitively() {
        assert_eq!("inprogress".parse::<State>().unwrap(), State::InProgress);
        assert_eq!("EXIT".parse::<State>().unwrap(), State::Exit);
        assert!("RUNNING".parse::<State>().is_err());
    }

    #[test]
    fn rectangle_intersection() {
        let screen = Rectangle::new(0, 0, 1920, 1080);
        let window = Rectangle::new(1800, 1000, 400, 400);
        assert_eq!(
            screen.intersection(&window),
            Some(Rectangle::new(1800, 1000, 120, 80))
        );
        assert_eq!(screen.intersection(&Rectangle::new(2000, 0, 10, 10)), None);
    }

    #[test]
    fn rectangle_intersection_near_i32_limits() {
        let screen = Rectangle::new(0, 0, 1920, 1080);
        let far = Rectangle::new(i32::MAX - 10, 0, 100, 100);
        assert_eq!(screen.intersection(&far), None);
        assert_eq!(far.intersection(&screen), None);

        let huge = Rectangle::new(-10, -10, i32::MAX, i32::MAX);
        assert_eq!(screen.intersection(&huge), Some(screen));

        let below = Rectangle::new(i32::MIN, i32::MIN, 10, 10);
        assert_eq!(screen.intersection(&below), None);
    }
}
