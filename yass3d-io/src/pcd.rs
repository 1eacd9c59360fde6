//! PCD (Point Cloud Data) format support
//!
//! Reads ASCII and binary PCD files into [`SemanticCloud`]s and writes them
//! back. Recognized fields:
//!
//! - `x y z` (required)
//! - packed `rgb` / `rgba` (float or unsigned), or separate `r g b`
//! - `label`
//!
//! Other fields are parsed and ignored. Points without a color channel get
//! [`DEFAULT_COLOR`]. Binary data is little-endian.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use yass3d_core::{Error, Label, LabelPresence, Point3f, Result, SemanticCloud, SemanticPoint, DEFAULT_COLOR};

/// PCD data section encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcdDataFormat {
    Ascii,
    Binary,
    BinaryCompressed,
}

impl PcdDataFormat {
    fn keyword(&self) -> &'static str {
        match self {
            PcdDataFormat::Ascii => "ascii",
            PcdDataFormat::Binary => "binary",
            PcdDataFormat::BinaryCompressed => "binary_compressed",
        }
    }
}

/// Scalar type of a PCD field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcdFieldType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl PcdFieldType {
    fn from_declaration(type_char: &str, size: usize) -> Result<Self> {
        Ok(match (type_char, size) {
            ("I", 1) => PcdFieldType::I8,
            ("I", 2) => PcdFieldType::I16,
            ("I", 4) => PcdFieldType::I32,
            ("U", 1) => PcdFieldType::U8,
            ("U", 2) => PcdFieldType::U16,
            ("U", 4) => PcdFieldType::U32,
            ("F", 4) => PcdFieldType::F32,
            ("F", 8) => PcdFieldType::F64,
            _ => {
                return Err(Error::InvalidData(format!(
                    "Unsupported PCD field type/size combination: {}/{}",
                    type_char, size
                )))
            }
        })
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        match self {
            PcdFieldType::I8 | PcdFieldType::U8 => 1,
            PcdFieldType::I16 | PcdFieldType::U16 => 2,
            PcdFieldType::I32 | PcdFieldType::U32 | PcdFieldType::F32 => 4,
            PcdFieldType::F64 => 8,
        }
    }

    fn type_char(&self) -> &'static str {
        match self {
            PcdFieldType::I8 | PcdFieldType::I16 | PcdFieldType::I32 => "I",
            PcdFieldType::U8 | PcdFieldType::U16 | PcdFieldType::U32 => "U",
            PcdFieldType::F32 | PcdFieldType::F64 => "F",
        }
    }
}

/// One declared field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcdField {
    pub name: String,
    pub field_type: PcdFieldType,
    pub count: usize,
}

impl PcdField {
    fn new(name: &str, field_type: PcdFieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            count: 1,
        }
    }
}

/// Parsed PCD header
#[derive(Debug, Clone, PartialEq)]
pub struct PcdHeader {
    pub version: String,
    pub fields: Vec<PcdField>,
    pub width: usize,
    pub height: usize,
    /// tx, ty, tz, qw, qx, qy, qz
    pub viewpoint: [f64; 7],
    pub data_format: PcdDataFormat,
}

impl PcdHeader {
    pub fn point_count(&self) -> usize {
        self.width * self.height
    }

    /// Scalars per point
    fn scalar_count(&self) -> usize {
        self.fields.iter().map(|f| f.count).sum()
    }

    /// Bytes per point in binary data
    fn record_size(&self) -> usize {
        self.fields.iter().map(|f| f.field_type.size() * f.count).sum()
    }

    /// Reject declarations whose sizes do not fit in `usize`.
    ///
    /// After this succeeds `point_count`, `scalar_count` and `record_size`
    /// cannot overflow, and neither can the total binary payload size.
    fn check_sizes(&self) -> Result<()> {
        let too_large = || Error::InvalidData("PCD header declares more data than can be addressed".to_string());

        let points = self.width.checked_mul(self.height).ok_or_else(too_large)?;
        let mut scalars: usize = 0;
        let mut stride: usize = 0;
        for field in &self.fields {
            scalars = scalars.checked_add(field.count).ok_or_else(too_large)?;
            let bytes = field.field_type.size().checked_mul(field.count).ok_or_else(too_large)?;
            stride = stride.checked_add(bytes).ok_or_else(too_large)?;
        }
        stride.checked_mul(points).ok_or_else(too_large)?;
        Ok(())
    }

    /// Index of the first scalar of `name` in a point record
    fn scalar_offset(&self, name: &str) -> Option<(usize, PcdFieldType)> {
        let mut offset = 0;
        for field in &self.fields {
            if field.name == name {
                return Some((offset, field.field_type));
            }
            offset += field.count;
        }
        None
    }
}

/// A single decoded scalar
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PcdValue {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    F32(f32),
    F64(f64),
}

impl PcdValue {
    fn as_f64(&self) -> f64 {
        match *self {
            PcdValue::I8(v) => v as f64,
            PcdValue::U8(v) => v as f64,
            PcdValue::I16(v) => v as f64,
            PcdValue::U16(v) => v as f64,
            PcdValue::I32(v) => v as f64,
            PcdValue::U32(v) => v as f64,
            PcdValue::F32(v) => v as f64,
            PcdValue::F64(v) => v,
        }
    }

    /// Bit pattern of a packed `0x00RRGGBB` color
    fn packed_bits(&self) -> u32 {
        match *self {
            PcdValue::F32(v) => v.to_bits(),
            PcdValue::U32(v) => v,
            PcdValue::I32(v) => v as u32,
            other => other.as_f64() as u32,
        }
    }

    fn parse(token: &str, field_type: PcdFieldType) -> Result<Self> {
        let invalid = || Error::InvalidData(format!("Invalid {:?} value: {}", field_type, token));
        Ok(match field_type {
            PcdFieldType::I8 => PcdValue::I8(token.parse().map_err(|_| invalid())?),
            PcdFieldType::U8 => PcdValue::U8(token.parse().map_err(|_| invalid())?),
            PcdFieldType::I16 => PcdValue::I16(token.parse().map_err(|_| invalid())?),
            PcdFieldType::U16 => PcdValue::U16(token.parse().map_err(|_| invalid())?),
            PcdFieldType::I32 => PcdValue::I32(token.parse().map_err(|_| invalid())?),
            PcdFieldType::U32 => PcdValue::U32(token.parse().map_err(|_| invalid())?),
            PcdFieldType::F32 => PcdValue::F32(token.parse().map_err(|_| invalid())?),
            PcdFieldType::F64 => PcdValue::F64(token.parse().map_err(|_| invalid())?),
        })
    }

    fn decode(bytes: &[u8], field_type: PcdFieldType) -> Self {
        let mut buf = [0u8; 8];
        buf[..bytes.len()].copy_from_slice(bytes);
        match field_type {
            PcdFieldType::I8 => PcdValue::I8(buf[0] as i8),
            PcdFieldType::U8 => PcdValue::U8(buf[0]),
            PcdFieldType::I16 => PcdValue::I16(i16::from_le_bytes([buf[0], buf[1]])),
            PcdFieldType::U16 => PcdValue::U16(u16::from_le_bytes([buf[0], buf[1]])),
            PcdFieldType::I32 => PcdValue::I32(i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])),
            PcdFieldType::U32 => PcdValue::U32(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])),
            PcdFieldType::F32 => PcdValue::F32(f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])),
            PcdFieldType::F64 => PcdValue::F64(f64::from_le_bytes(buf)),
        }
    }
}

/// Where each semantic attribute lives inside a point record
struct RecordLayout {
    x: usize,
    y: usize,
    z: usize,
    color: ColorSource,
    label: Option<usize>,
}

enum ColorSource {
    Packed(usize),
    Channels(usize, usize, usize),
    Missing,
}

impl RecordLayout {
    fn from_header(header: &PcdHeader) -> Result<Self> {
        let required = |name: &str| {
            header
                .scalar_offset(name)
                .map(|(offset, _)| offset)
                .ok_or_else(|| Error::InvalidData(format!("PCD file has no '{}' field", name)))
        };

        let color = match header.scalar_offset("rgb").or_else(|| header.scalar_offset("rgba")) {
            Some((offset, _)) => ColorSource::Packed(offset),
            None => match (
                header.scalar_offset("r"),
                header.scalar_offset("g"),
                header.scalar_offset("b"),
            ) {
                (Some((r, _)), Some((g, _)), Some((b, _))) => ColorSource::Channels(r, g, b),
                _ => ColorSource::Missing,
            },
        };

        Ok(Self {
            x: required("x")?,
            y: required("y")?,
            z: required("z")?,
            color,
            label: header.scalar_offset("label").map(|(offset, _)| offset),
        })
    }

    fn point(&self, record: &[PcdValue]) -> Result<SemanticPoint> {
        let position = Point3f::new(
            record[self.x].as_f64() as f32,
            record[self.y].as_f64() as f32,
            record[self.z].as_f64() as f32,
        );

        let color = match self.color {
            ColorSource::Packed(offset) => {
                let bits = record[offset].packed_bits();
                [(bits >> 16) as u8, (bits >> 8) as u8, bits as u8]
            }
            ColorSource::Channels(r, g, b) => [channel(&record[r]), channel(&record[g]), channel(&record[b])],
            ColorSource::Missing => DEFAULT_COLOR,
        };

        let label = match self.label {
            Some(offset) => Some(to_label(&record[offset])?),
            None => None,
        };

        Ok(SemanticPoint { position, color, label })
    }
}

fn channel(value: &PcdValue) -> u8 {
    value.as_f64().round().clamp(0.0, 255.0) as u8
}

fn to_label(value: &PcdValue) -> Result<Label> {
    let raw = value.as_f64();
    if !raw.is_finite() || raw < 0.0 || raw > Label::MAX as f64 || raw.fract() != 0.0 {
        return Err(Error::InvalidData(format!("Invalid point label: {}", raw)));
    }
    Ok(raw as Label)
}

/// Upper bound on scalars reserved up front for ASCII data
const PREALLOCATION_LIMIT: usize = 1 << 20;

/// PCD reader producing semantic clouds
pub struct PcdReader;

impl PcdReader {
    /// Read a PCD file
    pub fn read_cloud<P: AsRef<Path>>(path: P) -> Result<SemanticCloud> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Read PCD data from any buffered source
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<SemanticCloud> {
        let header = Self::read_header(reader)?;
        let layout = RecordLayout::from_header(&header)?;
        let records = match header.data_format {
            PcdDataFormat::Ascii => Self::read_ascii_records(reader, &header)?,
            PcdDataFormat::Binary => Self::read_binary_records(reader, &header)?,
            PcdDataFormat::BinaryCompressed => {
                return Err(Error::UnsupportedFormat(
                    "binary_compressed PCD data is not supported".to_string(),
                ))
            }
        };

        let scalars = header.scalar_count();
        records
            .chunks(scalars)
            .map(|record| layout.point(record))
            .collect::<Result<Vec<_>>>()
            .map(SemanticCloud::from_points)
    }

    /// Parse the header up to and including the `DATA` line
    pub fn read_header<R: BufRead>(reader: &mut R) -> Result<PcdHeader> {
        let mut version = None;
        let mut names: Vec<String> = Vec::new();
        let mut sizes: Vec<usize> = Vec::new();
        let mut types: Vec<String> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();
        let mut width = None;
        let mut height = None;
        let mut viewpoint = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let mut points = None;
        let data_format;

        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Err(Error::InvalidData("Unexpected end of file in PCD header".to_string()));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            let values = &parts[1..];
            match parts[0] {
                "VERSION" => version = values.first().map(|v| v.to_string()),
                "FIELDS" => names = values.iter().map(|v| v.to_string()).collect(),
                "SIZE" => sizes = parse_all(values, "SIZE")?,
                "TYPE" => types = values.iter().map(|v| v.to_string()).collect(),
                "COUNT" => counts = parse_all(values, "COUNT")?,
                "WIDTH" => width = Some(parse_one(values, "WIDTH")?),
                "HEIGHT" => height = Some(parse_one(values, "HEIGHT")?),
                "POINTS" => points = Some(parse_one(values, "POINTS")?),
                "VIEWPOINT" => {
                    let parsed: Vec<f64> = parse_all(values, "VIEWPOINT")?;
                    if parsed.len() != 7 {
                        return Err(Error::InvalidData("VIEWPOINT needs 7 values".to_string()));
                    }
                    viewpoint.copy_from_slice(&parsed);
                }
                "DATA" => {
                    data_format = match values.first().copied() {
                        Some("ascii") => PcdDataFormat::Ascii,
                        Some("binary") => PcdDataFormat::Binary,
                        Some("binary_compressed") => PcdDataFormat::BinaryCompressed,
                        other => {
                            return Err(Error::InvalidData(format!("Unknown PCD DATA format: {:?}", other)))
                        }
                    };
                    break;
                }
                _ => {}
            }
        }

        let version = version.ok_or_else(|| Error::InvalidData("Missing VERSION in PCD header".to_string()))?;
        if counts.is_empty() {
            counts = vec![1; names.len()];
        }
        if names.is_empty()
            || sizes.len() != names.len()
            || types.len() != names.len()
            || counts.len() != names.len()
            || counts.contains(&0)
        {
            return Err(Error::InvalidData(
                "Mismatch between FIELDS, SIZE, TYPE and COUNT declarations".to_string(),
            ));
        }

        let fields = names
            .iter()
            .zip(sizes.iter().zip(types.iter()).zip(counts.iter()))
            .map(|(name, ((&size, type_char), &count))| {
                Ok(PcdField {
                    name: name.clone(),
                    field_type: PcdFieldType::from_declaration(type_char, size)?,
                    count,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let width = width.or(points).ok_or_else(|| Error::InvalidData("Missing WIDTH in PCD header".to_string()))?;
        let height = height.unwrap_or(1);

        let header = PcdHeader {
            version,
            fields,
            width,
            height,
            viewpoint,
            data_format,
        };
        header.check_sizes()?;

        if let Some(points) = points {
            if points != header.point_count() {
                return Err(Error::InvalidData(format!(
                    "POINTS ({}) doesn't match WIDTH * HEIGHT ({})",
                    points,
                    header.point_count()
                )));
            }
        }
        Ok(header)
    }

    fn read_ascii_records<R: BufRead>(reader: &mut R, header: &PcdHeader) -> Result<Vec<PcdValue>> {
        let expected = header.point_count();
        let scalars = header.scalar_count();
        let mut values = Vec::with_capacity(expected.saturating_mul(scalars).min(PREALLOCATION_LIMIT));
        let mut read = 0;
        let mut line = String::new();

        while read < expected {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Err(Error::InvalidData(format!(
                    "PCD data ended after {} of {} points",
                    read, expected
                )));
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            if tokens.len() < scalars {
                return Err(Error::InvalidData(format!(
                    "Point {} has {} values, expected {}",
                    read,
                    tokens.len(),
                    scalars
                )));
            }

            let mut token = tokens.iter();
            for field in &header.fields {
                for _ in 0..field.count {
                    if let Some(text) = token.next() {
                        values.push(PcdValue::parse(text, field.field_type)?);
                    }
                }
            }
            read += 1;
        }
        Ok(values)
    }

    fn read_binary_records<R: Read>(reader: &mut R, header: &PcdHeader) -> Result<Vec<PcdValue>> {
        let stride = header.record_size();
        let expected = stride * header.point_count();

        // The header is untrusted: only what the source actually holds is buffered.
        let mut bytes = Vec::new();
        reader.by_ref().take(expected as u64).read_to_end(&mut bytes)?;
        if bytes.len() != expected {
            return Err(Error::InvalidData(format!(
                "PCD data ended after {} of {} bytes",
                bytes.len(),
                expected
            )));
        }

        let mut values = Vec::with_capacity(header.point_count() * header.scalar_count());
        for record in bytes.chunks_exact(stride.max(1)) {
            let mut cursor = 0;
            for field in &header.fields {
                let size = field.field_type.size();
                for _ in 0..field.count {
                    values.push(PcdValue::decode(&record[cursor..cursor + size], field.field_type));
                    cursor += size;
                }
            }
        }
        Ok(values)
    }
}

fn parse_one<T: std::str::FromStr>(values: &[&str], keyword: &str) -> Result<T> {
    values
        .first()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| Error::InvalidData(format!("Invalid {} value in PCD header", keyword)))
}

fn parse_all<T: std::str::FromStr>(values: &[&str], keyword: &str) -> Result<Vec<T>> {
    values
        .iter()
        .map(|v| {
            v.parse()
                .map_err(|_| Error::InvalidData(format!("Invalid {} value in PCD header: {}", keyword, v)))
        })
        .collect()
}

/// PCD write options
#[derive(Debug, Clone)]
pub struct PcdWriteOptions {
    pub data_format: PcdDataFormat,
    pub version: String,
}

impl Default for PcdWriteOptions {
    fn default() -> Self {
        Self {
            data_format: PcdDataFormat::Binary,
            version: "0.7".to_string(),
        }
    }
}

/// PCD writer emitting `x y z rgb` and, for labeled clouds, `label`
pub struct PcdWriter;

impl PcdWriter {
    pub fn write_cloud<P: AsRef<Path>>(cloud: &SemanticCloud, path: P, options: &PcdWriteOptions) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(cloud, &mut writer, options)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_to<W: Write>(cloud: &SemanticCloud, writer: &mut W, options: &PcdWriteOptions) -> Result<()> {
        let labeled = !cloud.is_empty() && cloud.label_presence()? == LabelPresence::All;

        let mut fields = vec![
            PcdField::new("x", PcdFieldType::F32),
            PcdField::new("y", PcdFieldType::F32),
            PcdField::new("z", PcdFieldType::F32),
            PcdField::new("rgb", PcdFieldType::U32),
        ];
        if labeled {
            fields.push(PcdField::new("label", PcdFieldType::U32));
        }

        let header = PcdHeader {
            version: options.version.clone(),
            fields,
            width: cloud.len(),
            height: 1,
            viewpoint: [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
            data_format: options.data_format,
        };
        Self::write_header(writer, &header)?;

        for point in cloud.iter() {
            let [r, g, b] = point.color;
            let rgb = (r as u32) << 16 | (g as u32) << 8 | b as u32;
            let p = point.position;
            match options.data_format {
                PcdDataFormat::Ascii => {
                    write!(writer, "{} {} {} {}", p.x, p.y, p.z, rgb)?;
                    if let Some(label) = point.label.filter(|_| labeled) {
                        write!(writer, " {}", label)?;
                    }
                    writeln!(writer)?;
                }
                PcdDataFormat::Binary => {
                    writer.write_all(&p.x.to_le_bytes())?;
                    writer.write_all(&p.y.to_le_bytes())?;
                    writer.write_all(&p.z.to_le_bytes())?;
                    writer.write_all(&rgb.to_le_bytes())?;
                    if let Some(label) = point.label.filter(|_| labeled) {
                        writer.write_all(&label.to_le_bytes())?;
                    }
                }
                PcdDataFormat::BinaryCompressed => {
                    return Err(Error::UnsupportedFormat(
                        "binary_compressed PCD data is not supported".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }

    fn write_header<W: Write>(writer: &mut W, header: &PcdHeader) -> Result<()> {
        fn column(fields: &[PcdField], value: impl Fn(&PcdField) -> String) -> String {
            fields.iter().map(value).collect::<Vec<_>>().join(" ")
        }

        writeln!(writer, "# .PCD v{} - Point Cloud Data file format", header.version)?;
        writeln!(writer, "VERSION {}", header.version)?;
        writeln!(writer, "FIELDS {}", column(&header.fields, |f| f.name.clone()))?;
        writeln!(writer, "SIZE {}", column(&header.fields, |f| f.field_type.size().to_string()))?;
        writeln!(writer, "TYPE {}", column(&header.fields, |f| f.field_type.type_char().to_string()))?;
        writeln!(writer, "COUNT {}", column(&header.fields, |f| f.count.to_string()))?;
        writeln!(writer, "WIDTH {}", header.width)?;
        writeln!(writer, "HEIGHT {}", header.height)?;
        let vp = header.viewpoint;
        writeln!(writer, "VIEWPOINT {} {} {} {} {} {} {}", vp[0], vp[1], vp[2], vp[3], vp[4], vp[5], vp[6])?;
        writeln!(writer, "POINTS {}", header.point_count())?;
        writeln!(writer, "DATA {}", header.data_format.keyword())?;
        Ok(())
    }
}
