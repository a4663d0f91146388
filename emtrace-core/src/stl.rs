use std::fs;
use std::io::Cursor;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use log::info;

use crate::geometry::{Point3, Vector3};
use crate::{Error, Result};

const HEADER_LEN: usize = 80;
const RECORD_LEN: usize = 50;

/// One facet of a binary STL model, promoted to double precision.
#[derive(Debug, Clone)]
pub struct Facet {
    pub normal: Vector3,
    pub vertices: [Point3; 3],
}

/// Reads a binary STL file: an 80-byte header (ignored), a little-endian
/// `u32` facet count, then 50-byte records of 12 `f32`s plus a 2-byte
/// attribute (ignored). Truncated files and counts larger than the file
/// can hold are rejected outright.
pub fn load_binary_stl<P: AsRef<Path>>(path: P) -> Result<Vec<Facet>> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let facets = parse_binary_stl(&bytes).map_err(|reason| Error::Stl {
        path: path.to_path_buf(),
        reason,
    })?;
    info!("loaded {} facets from {}", facets.len(), path.display());
    Ok(facets)
}

pub(crate) fn parse_binary_stl(bytes: &[u8]) -> std::result::Result<Vec<Facet>, &'static str> {
    if bytes.len() < HEADER_LEN + 4 {
        return Err("file shorter than the 84-byte binary STL preamble");
    }
    let mut cursor = Cursor::new(&bytes[HEADER_LEN..]);
    // the count is unsigned; nothing to reject but overflow vs file size
    let count = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| "unreadable facet count")? as usize;
    let available = (bytes.len() - HEADER_LEN - 4) / RECORD_LEN;
    if count > available {
        return Err("facet count exceeds file size");
    }

    let mut facets = Vec::with_capacity(count);
    for _ in 0..count {
        let mut f = [0.0f32; 12];
        for v in f.iter_mut() {
            *v = cursor
                .read_f32::<LittleEndian>()
                .map_err(|_| "truncated facet record")?;
        }
        cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| "truncated facet record")?;
        facets.push(Facet {
            normal: Vector3::new(f[0] as f64, f[1] as f64, f[2] as f64),
            vertices: [
                Point3::new(f[3] as f64, f[4] as f64, f[5] as f64),
                Point3::new(f[6] as f64, f[7] as f64, f[8] as f64),
                Point3::new(f[9] as f64, f[10] as f64, f[11] as f64),
            ],
        });
    }
    Ok(facets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn encode(facets: &[[f32; 12]], count_override: Option<u32>) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes
            .write_u32::<LittleEndian>(count_override.unwrap_or(facets.len() as u32))
            .unwrap();
        for f in facets {
            for v in f {
                bytes.write_f32::<LittleEndian>(*v).unwrap();
            }
            bytes.write_u16::<LittleEndian>(0).unwrap();
        }
        bytes
    }

    #[test]
    fn test_parse_single_facet() {
        let facet = [
            0.0, 0.0, 1.0, // normal
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
        ];
        let facets = parse_binary_stl(&encode(&[facet], None)).unwrap();
        assert_eq!(facets.len(), 1);
        assert_eq!(facets[0].normal, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(facets[0].vertices[1], Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_rejects_short_preamble() {
        assert!(parse_binary_stl(&[0u8; 40]).is_err());
    }

    #[test]
    fn test_rejects_overstated_count() {
        let facet = [0.0; 12];
        let bytes = encode(&[facet], Some(2));
        assert_eq!(
            parse_binary_stl(&bytes).unwrap_err(),
            "facet count exceeds file size"
        );
        // a count that would only fit with signed wrap-around is rejected too
        let bytes = encode(&[facet], Some(u32::MAX));
        assert!(parse_binary_stl(&bytes).is_err());
    }

    #[test]
    fn test_zero_count_ok() {
        assert!(parse_binary_stl(&encode(&[], None)).unwrap().is_empty());
    }
}
