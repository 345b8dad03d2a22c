//! Line-oriented text format for learned parameters.
//!
//! ```text
//! OCVCOMP1
//! BUCKETS=16
//! RECOV=4000
//! CHEM=AUTO
//! SAG=-1,0.05,0.06,...
//! DOWN=0.25,0.25,...
//! DCR=0.0000625,0.0001875,...
//! ```
//!
//! Decoding is strict: the version tag and bucket count must match, and any
//! present field that does not parse rejects the whole record. Unknown lines
//! are ignored and absent fields decode to `None` (compiled defaults).

use std::fmt::Write as _;
use std::str::FromStr;

use crate::bucket::BUCKET_COUNT;
use crate::error::CodecError;

pub const RECORD_VERSION: &str = "OCVCOMP1";
/// Written for an undefined sag bucket. Any negative value reads as undefined.
pub const SAG_UNDEFINED: f32 = -1.0;

/// Stored chemistry evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChemistryFlag {
    Auto,
    Standard,
    HighVoltage,
}

impl ChemistryFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::Standard => "STANDARD",
            Self::HighVoltage => "HIGH_VOLTAGE",
        }
    }
}

impl FromStr for ChemistryFlag {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTO" => Ok(Self::Auto),
            "STANDARD" => Ok(Self::Standard),
            "HIGH_VOLTAGE" => Ok(Self::HighVoltage),
            other => Err(CodecError::Field {
                field: "CHEM",
                value: other.to_string(),
            }),
        }
    }
}

/// Learned parameters as stored. Every field is optional; `None` means
/// "use the compiled default".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedRecord {
    pub recovery_delay_ms: Option<f32>,
    pub chemistry: Option<ChemistryFlag>,
    pub sag: Option<[Option<f32>; BUCKET_COUNT]>,
    pub down: Option<[f32; BUCKET_COUNT]>,
    pub decay: Option<[f32; BUCKET_COUNT]>,
}

fn join<I: IntoIterator<Item = f32>>(values: I) -> String {
    let mut out = String::new();
    for (i, v) in values.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{v}");
    }
    out
}

/// Render a record. Fields that are `None` are omitted.
pub fn encode(record: &PersistedRecord) -> String {
    let mut out = String::with_capacity(512);
    let _ = writeln!(out, "{RECORD_VERSION}");
    let _ = writeln!(out, "BUCKETS={BUCKET_COUNT}");
    if let Some(d) = record.recovery_delay_ms {
        let _ = writeln!(out, "RECOV={d}");
    }
    if let Some(c) = record.chemistry {
        let _ = writeln!(out, "CHEM={}", c.as_str());
    }
    if let Some(sag) = &record.sag {
        let _ = writeln!(out, "SAG={}", join(sag.map(|s| s.unwrap_or(SAG_UNDEFINED))));
    }
    if let Some(down) = &record.down {
        let _ = writeln!(out, "DOWN={}", join(*down));
    }
    if let Some(dcr) = &record.decay {
        let _ = writeln!(out, "DCR={}", join(*dcr));
    }
    out
}

fn parse_f32(field: &'static str, raw: &str) -> Result<f32, CodecError> {
    raw.trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CodecError::Field {
            field,
            value: raw.trim().to_string(),
        })
}

fn parse_array(field: &'static str, raw: &str) -> Result<[f32; BUCKET_COUNT], CodecError> {
    let values = raw
        .split(',')
        .map(|v| parse_f32(field, v))
        .collect::<Result<Vec<_>, _>>()?;
    let found = values.len();
    values.try_into().map_err(|_| CodecError::Length {
        field,
        expected: BUCKET_COUNT,
        found,
    })
}

/// Parse a stored record.
pub fn decode(text: &str) -> Result<PersistedRecord, CodecError> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let version = lines.next().ok_or(CodecError::Empty)?;
    if version != RECORD_VERSION {
        return Err(CodecError::Version(version.to_string()));
    }

    let mut buckets = None;
    let mut record = PersistedRecord::default();
    for line in lines {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key.trim() {
            "BUCKETS" => {
                let found = value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| CodecError::Field {
                        field: "BUCKETS",
                        value: value.trim().to_string(),
                    })?;
                buckets = Some(found);
            }
            "RECOV" => record.recovery_delay_ms = Some(parse_f32("RECOV", value)?),
            "CHEM" => record.chemistry = Some(value.trim().parse()?),
            "SAG" => {
                let raw = parse_array("SAG", value)?;
                record.sag = Some(raw.map(|v| (v >= 0.0).then_some(v)));
            }
            "DOWN" => record.down = Some(parse_array("DOWN", value)?),
            "DCR" => record.decay = Some(parse_array("DCR", value)?),
            _ => {}
        }
    }

    match buckets {
        None => Err(CodecError::MissingBucketCount),
        Some(found) if found != BUCKET_COUNT => Err(CodecError::BucketCount {
            expected: BUCKET_COUNT,
            found,
        }),
        Some(_) => Ok(record),
    }
}
