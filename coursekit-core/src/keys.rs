// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opaque identifiers for courses, block usages and course assets.
//!
//! Keys are immutable value types with a canonical string form. Two textual
//! forms of a course key round-trip through the parser: the canonical
//! `course-v1:ORG+COURSE+RUN` and the legacy `ORG/COURSE/RUN` notation still
//! found in older course exports. Both map to equal values; serialisation
//! always emits the canonical form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::BlockType;

/// Prefix of canonical course key strings.
pub const COURSE_KEY_PREFIX: &str = "course-v1:";

/// Prefix of canonical usage key strings.
pub const USAGE_KEY_PREFIX: &str = "block-v1:";

/// Prefix of canonical asset key strings.
pub const ASSET_KEY_PREFIX: &str = "asset-v1:";

/// Prefix of legacy block locators.
const LEGACY_USAGE_PREFIX: &str = "i4x://";

/// Names a key segment in parse errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment {
    Org,
    Course,
    Run,
    BlockType,
    BlockId,
    AssetPath,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Segment::Org => "org",
            Segment::Course => "course",
            Segment::Run => "run",
            Segment::BlockType => "block type",
            Segment::BlockId => "block id",
            Segment::AssetPath => "asset path",
        };
        write!(f, "{}", name)
    }
}

/// Error types for key parsing.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum KeyError {
    /// The string carries neither a recognised prefix nor a legacy shape.
    #[error("unrecognised key format: {0:?}")]
    UnrecognisedFormat(String),

    /// A required segment is missing from the serialised key.
    #[error("missing {0} segment")]
    MissingSegment(Segment),

    /// A segment is present but empty.
    #[error("empty {0} segment")]
    EmptySegment(Segment),

    /// A segment contains a character outside the allowed set.
    #[error("invalid character {1:?} in {0} segment")]
    InvalidCharacter(Segment, char),

    /// More segments than the key type declares.
    #[error("unexpected trailing input {0:?}")]
    TrailingInput(String),
}

fn validate_segment(value: &str, segment: Segment, legacy: bool) -> Result<(), KeyError> {
    if value.is_empty() {
        return Err(KeyError::EmptySegment(segment));
    }
    for c in value.chars() {
        let allowed = c.is_alphanumeric()
            || matches!(c, '_' | '-' | '~' | '.' | ':')
            || (legacy && c == '%');
        if !allowed {
            return Err(KeyError::InvalidCharacter(segment, c));
        }
    }
    Ok(())
}

/// Identifier of a course: the `(org, course, run)` triple.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CourseKey {
    org: String,
    course: String,
    run: String,
}

impl CourseKey {
    /// Construct a course key from its segments, validating each one.
    pub fn new(org: &str, course: &str, run: &str) -> Result<Self, KeyError> {
        validate_segment(org, Segment::Org, false)?;
        validate_segment(course, Segment::Course, false)?;
        validate_segment(run, Segment::Run, false)?;

        Ok(Self {
            org: org.to_owned(),
            course: course.to_owned(),
            run: run.to_owned(),
        })
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn course(&self) -> &str {
        &self.course
    }

    pub fn run(&self) -> &str {
        &self.run
    }

    /// Derive the usage key of a block placed in this course.
    pub fn make_usage_key(&self, block_type: BlockType, block_id: &str) -> Result<UsageKey, KeyError> {
        UsageKey::new(self.clone(), block_type, block_id)
    }

    /// Derive the usage key of this course's root block.
    pub fn root_usage_key(&self) -> UsageKey {
        // The root block id is fixed by convention and always within the
        // allowed charset.
        UsageKey::new(self.clone(), BlockType::Course, "course")
            .expect("root block id is always valid")
    }

    /// Derive the asset key of a static asset belonging to this course.
    pub fn make_asset_key(&self, path: &str) -> Result<AssetKey, KeyError> {
        AssetKey::new(self.clone(), path)
    }
}

impl FromStr for CourseKey {
    type Err = KeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = value.strip_prefix(COURSE_KEY_PREFIX) {
            let mut parts = rest.split('+');
            let org = parts.next().ok_or(KeyError::MissingSegment(Segment::Org))?;
            let course = parts
                .next()
                .ok_or(KeyError::MissingSegment(Segment::Course))?;
            let run = parts.next().ok_or(KeyError::MissingSegment(Segment::Run))?;
            if let Some(extra) = parts.next() {
                return Err(KeyError::TrailingInput(extra.to_owned()));
            }
            return Self::new(org, course, run);
        }

        // Legacy `ORG/COURSE/RUN` form. Exactly three slash-separated
        // segments, mapped onto the same value as the canonical form.
        let segments: Vec<&str> = value.split('/').collect();
        if segments.len() == 3 && !value.contains(':') {
            return Self::new(segments[0], segments[1], segments[2]);
        }

        Err(KeyError::UnrecognisedFormat(value.to_owned()))
    }
}

impl fmt::Display for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}+{}+{}",
            COURSE_KEY_PREFIX, self.org, self.course, self.run
        )
    }
}

impl fmt::Debug for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CourseKey").field(&self.to_string()).finish()
    }
}

impl Serialize for CourseKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CourseKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier of a specific placement of content in a course tree.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UsageKey {
    course_key: CourseKey,
    block_type: BlockType,
    block_id: String,
}

impl UsageKey {
    /// Construct a usage key, validating the block id segment.
    pub fn new(course_key: CourseKey, block_type: BlockType, block_id: &str) -> Result<Self, KeyError> {
        validate_segment(block_id, Segment::BlockId, true)?;

        Ok(Self {
            course_key,
            block_type,
            block_id: block_id.to_owned(),
        })
    }

    pub fn course_key(&self) -> &CourseKey {
        &self.course_key
    }

    pub fn block_type(&self) -> &BlockType {
        &self.block_type
    }

    pub fn block_id(&self) -> &str {
        &self.block_id
    }

    /// Derive a sibling key within the same course.
    pub fn child(&self, block_type: BlockType, block_id: &str) -> Result<Self, KeyError> {
        Self::new(self.course_key.clone(), block_type, block_id)
    }

    /// Parse a legacy `i4x://ORG/COURSE/TYPE/ID` block locator against a
    /// known course.
    ///
    /// The legacy notation predates course runs, so the course the locator
    /// belongs to has to be supplied by the caller. The org and course
    /// segments of the locator must agree with the given course key.
    pub fn from_legacy(value: &str, course_key: &CourseKey) -> Result<Self, KeyError> {
        let rest = value
            .strip_prefix(LEGACY_USAGE_PREFIX)
            .ok_or_else(|| KeyError::UnrecognisedFormat(value.to_owned()))?;

        let segments: Vec<&str> = rest.split('/').collect();
        let [org, course, block_type, block_id] = segments.as_slice() else {
            return Err(KeyError::UnrecognisedFormat(value.to_owned()));
        };

        validate_segment(org, Segment::Org, true)?;
        validate_segment(course, Segment::Course, true)?;
        validate_segment(block_type, Segment::BlockType, true)?;

        if *org != course_key.org() || *course != course_key.course() {
            return Err(KeyError::UnrecognisedFormat(value.to_owned()));
        }

        Self::new(course_key.clone(), BlockType::from(*block_type), block_id)
    }
}

impl FromStr for UsageKey {
    type Err = KeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let rest = value
            .strip_prefix(USAGE_KEY_PREFIX)
            .ok_or_else(|| KeyError::UnrecognisedFormat(value.to_owned()))?;

        let mut parts = rest.split('+');
        let org = parts.next().ok_or(KeyError::MissingSegment(Segment::Org))?;
        let course = parts
            .next()
            .ok_or(KeyError::MissingSegment(Segment::Course))?;
        let run = parts.next().ok_or(KeyError::MissingSegment(Segment::Run))?;

        let block_type = parts
            .next()
            .and_then(|part| part.strip_prefix("type@"))
            .ok_or(KeyError::MissingSegment(Segment::BlockType))?;
        validate_segment(block_type, Segment::BlockType, false)?;

        let block_id = parts
            .next()
            .and_then(|part| part.strip_prefix("block@"))
            .ok_or(KeyError::MissingSegment(Segment::BlockId))?;

        if let Some(extra) = parts.next() {
            return Err(KeyError::TrailingInput(extra.to_owned()));
        }

        let course_key = CourseKey::new(org, course, run)?;
        Self::new(course_key, BlockType::from(block_type), block_id)
    }
}

impl fmt::Display for UsageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}+{}+{}+type@{}+block@{}",
            USAGE_KEY_PREFIX,
            self.course_key.org(),
            self.course_key.course(),
            self.course_key.run(),
            self.block_type,
            self.block_id
        )
    }
}

impl fmt::Debug for UsageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UsageKey").field(&self.to_string()).finish()
    }
}

impl Serialize for UsageKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UsageKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier of a static course asset.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetKey {
    course_key: CourseKey,
    path: String,
}

impl AssetKey {
    pub fn new(course_key: CourseKey, path: &str) -> Result<Self, KeyError> {
        validate_segment(path, Segment::AssetPath, true)?;

        Ok(Self {
            course_key,
            path: path.to_owned(),
        })
    }

    pub fn course_key(&self) -> &CourseKey {
        &self.course_key
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl FromStr for AssetKey {
    type Err = KeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let rest = value
            .strip_prefix(ASSET_KEY_PREFIX)
            .ok_or_else(|| KeyError::UnrecognisedFormat(value.to_owned()))?;

        let mut parts = rest.split('+');
        let org = parts.next().ok_or(KeyError::MissingSegment(Segment::Org))?;
        let course = parts
            .next()
            .ok_or(KeyError::MissingSegment(Segment::Course))?;
        let run = parts.next().ok_or(KeyError::MissingSegment(Segment::Run))?;

        let marker = parts
            .next()
            .ok_or(KeyError::MissingSegment(Segment::AssetPath))?;
        if marker != "type@asset" {
            return Err(KeyError::UnrecognisedFormat(value.to_owned()));
        }

        let path = parts
            .next()
            .and_then(|part| part.strip_prefix("block@"))
            .ok_or(KeyError::MissingSegment(Segment::AssetPath))?;

        if let Some(extra) = parts.next() {
            return Err(KeyError::TrailingInput(extra.to_owned()));
        }

        let course_key = CourseKey::new(org, course, run)?;
        Self::new(course_key, path)
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}+{}+{}+type@asset+block@{}",
            ASSET_KEY_PREFIX,
            self.course_key.org(),
            self.course_key.course(),
            self.course_key.run(),
            self.path
        )
    }
}

impl fmt::Debug for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AssetKey").field(&self.to_string()).finish()
    }
}

impl Serialize for AssetKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AssetKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}
