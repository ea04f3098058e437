//! HVMap binary lookup tables: per-pixel UV remap data for lens correction.
//!
//! Layout (little-endian):
//!   magic "HVMAP" (5 bytes)
//!   version u16 (must be 1)
//!   width u32, height u32 (each 1..=10000)
//!   compression u8 (0 = f32 samples, 1 = u16 normalized by 65535)
//!   width * height interleaved (x, y) pairs

use std::path::Path;

use anyhow::{Context, bail, ensure};
use serde::Serialize;

const MAGIC: &[u8; 5] = b"HVMAP";
const SUPPORTED_VERSION: u16 = 1;
const MAX_DIMENSION: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Compression {
    Full,
    Half,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HvMap {
    pub width: u32,
    pub height: u32,
    pub compression: Compression,
    pub map_x: Vec<f32>,
    pub map_y: Vec<f32>,
}

/// Header summary reported to the panel without shipping the sample data.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HvMapInfo {
    pub width: u32,
    pub height: u32,
    pub compression: Compression,
    pub samples: usize,
}

impl HvMap {
    pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("cannot read hvmap {}", path.display()))?;
        Self::parse(&bytes).with_context(|| format!("invalid hvmap {}", path.display()))
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, anyhow::Error> {
        let mut cursor = Cursor { bytes, offset: 0 };

        // Magic and version are rejected before any dimension is touched.
        let magic = cursor.take(5)?;
        if magic != MAGIC {
            bail!(
                "invalid hvmap magic: expected \"HVMAP\", got {:?}",
                String::from_utf8_lossy(magic)
            );
        }
        let version = cursor.u16()?;
        if version != SUPPORTED_VERSION {
            bail!("unsupported hvmap version {} (expected 1)", version);
        }

        let width = cursor.u32()?;
        let height = cursor.u32()?;
        ensure!(
            (1..=MAX_DIMENSION).contains(&width) && (1..=MAX_DIMENSION).contains(&height),
            "invalid hvmap dimensions: {}x{}",
            width,
            height
        );

        let compression = match cursor.u8()? {
            0 => Compression::Full,
            1 => Compression::Half,
            other => bail!("unknown hvmap compression flag {}", other),
        };

        let count = (width as usize) * (height as usize);
        let mut map_x = Vec::with_capacity(count);
        let mut map_y = Vec::with_capacity(count);
        match compression {
            Compression::Half => {
                for _ in 0..count {
                    map_x.push(cursor.u16()? as f32 / 65535.0);
                    map_y.push(cursor.u16()? as f32 / 65535.0);
                }
            }
            Compression::Full => {
                for _ in 0..count {
                    map_x.push(cursor.f32()?);
                    map_y.push(cursor.f32()?);
                }
            }
        }

        Ok(Self {
            width,
            height,
            compression,
            map_x,
            map_y,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let count = (self.width as usize) * (self.height as usize);
        debug_assert_eq!(self.map_x.len(), count);
        debug_assert_eq!(self.map_y.len(), count);

        let sample_size = match self.compression {
            Compression::Half => 4,
            Compression::Full => 8,
        };
        let mut out = Vec::with_capacity(16 + count * sample_size);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&SUPPORTED_VERSION.to_le_bytes());
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.push(match self.compression {
            Compression::Full => 0,
            Compression::Half => 1,
        });
        for i in 0..count {
            match self.compression {
                Compression::Half => {
                    let x = (self.map_x[i].clamp(0.0, 1.0) * 65535.0).round() as u16;
                    let y = (self.map_y[i].clamp(0.0, 1.0) * 65535.0).round() as u16;
                    out.extend_from_slice(&x.to_le_bytes());
                    out.extend_from_slice(&y.to_le_bytes());
                }
                Compression::Full => {
                    out.extend_from_slice(&self.map_x[i].to_le_bytes());
                    out.extend_from_slice(&self.map_y[i].to_le_bytes());
                }
            }
        }
        out
    }

    pub fn info(&self) -> HvMapInfo {
        HvMapInfo {
            width: self.width,
            height: self.height,
            compression: self.compression,
            samples: self.map_x.len(),
        }
    }

    /// Bilinear sample with clamp-to-edge, matching the linear-filtered
    /// clamped textures the preview builds from this data.
    pub fn sample(&self, u: f32, v: f32) -> (f32, f32) {
        let x = (u.clamp(0.0, 1.0) * (self.width - 1) as f32).clamp(0.0, (self.width - 1) as f32);
        let y =
            (v.clamp(0.0, 1.0) * (self.height - 1) as f32).clamp(0.0, (self.height - 1) as f32);

        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width as usize - 1);
        let y1 = (y0 + 1).min(self.height as usize - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let idx = |xi: usize, yi: usize| yi * self.width as usize + xi;
        let lerp2 = |m: &[f32]| {
            let top = m[idx(x0, y0)] * (1.0 - fx) + m[idx(x1, y0)] * fx;
            let bottom = m[idx(x0, y1)] * (1.0 - fx) + m[idx(x1, y1)] * fx;
            top * (1.0 - fy) + bottom * fy
        };
        (lerp2(&self.map_x), lerp2(&self.map_y))
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], anyhow::Error> {
        let end = self.offset + len;
        if end > self.bytes.len() {
            bail!(
                "hvmap truncated: need {} bytes at offset {}, have {}",
                len,
                self.offset,
                self.bytes.len() - self.offset
            );
        }
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, anyhow::Error> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, anyhow::Error> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, anyhow::Error> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32(&mut self) -> Result<f32, anyhow::Error> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}
