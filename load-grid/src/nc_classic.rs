//! NetCDF classic file format, 64-bit offset flavour (CDF-2).
//!
//! Only what load grids need is supported: fixed-size (non-record)
//! variables, text and numeric attributes. All numbers are big-endian and
//! every header item is padded to a 4-byte boundary.

use std::io::Write;

use crate::error::{GridError, Result};

const MAGIC: &[u8; 3] = b"CDF";
const VERSION_CLASSIC: u8 = 1;
const VERSION_64BIT_OFFSET: u8 = 2;

const NC_DIMENSION: u32 = 0x0A;
const NC_VARIABLE: u32 = 0x0B;
const NC_ATTRIBUTE: u32 = 0x0C;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NcType {
    Byte = 1,
    Char = 2,
    Short = 3,
    Int = 4,
    Float = 5,
    Double = 6,
}

impl NcType {
    fn from_tag(tag: u32) -> Result<Self> {
        Ok(match tag {
            1 => NcType::Byte,
            2 => NcType::Char,
            3 => NcType::Short,
            4 => NcType::Int,
            5 => NcType::Float,
            6 => NcType::Double,
            _ => return Err(GridError::Format(format!("Unknown NetCDF type tag {}", tag))),
        })
    }

    fn size(self) -> usize {
        match self {
            NcType::Byte | NcType::Char => 1,
            NcType::Short => 2,
            NcType::Int | NcType::Float => 4,
            NcType::Double => 8,
        }
    }
}

/// A 1-D double variable to be written along its own, same-named dimension.
#[derive(Debug, Clone, Copy)]
pub struct NcVariable<'a> {
    pub name: &'a str,
    pub units: &'a str,
    pub values: &'a [f64],
}


// --------------------------------------------------------------------------
// Encoding

fn pad4(len: usize) -> usize {
    (4 - len % 4) % 4
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_name(buf: &mut Vec<u8>, name: &str) {
    put_u32(buf, name.len() as u32);
    buf.extend_from_slice(name.as_bytes());
    buf.extend(std::iter::repeat(0u8).take(pad4(name.len())));
}

/// Encode the header. `begins` holds the data offset of each variable.
fn encode_header(vars: &[NcVariable], begins: &[u64]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    buf.push(VERSION_64BIT_OFFSET);
    put_u32(&mut buf, 0); // numrecs

    // One dimension per variable, sharing its name.
    put_u32(&mut buf, NC_DIMENSION);
    put_u32(&mut buf, vars.len() as u32);
    for var in vars {
        put_name(&mut buf, var.name);
        put_u32(&mut buf, var.values.len() as u32);
    }

    // No global attributes
    put_u32(&mut buf, 0);
    put_u32(&mut buf, 0);

    put_u32(&mut buf, NC_VARIABLE);
    put_u32(&mut buf, vars.len() as u32);
    for (dimid, (var, begin)) in vars.iter().zip(begins).enumerate() {
        put_name(&mut buf, var.name);
        put_u32(&mut buf, 1);
        put_u32(&mut buf, dimid as u32);

        put_u32(&mut buf, NC_ATTRIBUTE);
        put_u32(&mut buf, 1);
        put_name(&mut buf, "units");
        put_u32(&mut buf, NcType::Char as u32);
        put_name(&mut buf, var.units);

        put_u32(&mut buf, NcType::Double as u32);
        // vsize saturates for variables over 4 GiB, as the format prescribes
        let vsize = var_size(var);
        put_u32(&mut buf, u32::try_from(vsize).unwrap_or(u32::MAX));
        buf.extend_from_slice(&begin.to_be_bytes());
    }
    buf
}

fn var_size(var: &NcVariable) -> u64 {
    (var.values.len() * NcType::Double.size()) as u64
}

/// Write the variables as a complete CDF-2 file.
pub fn write_classic<W: Write>(out: &mut W, vars: &[NcVariable]) -> Result<()> {
    for var in vars {
        if var.values.is_empty() {
            // A zero-length dimension would be read back as the record dimension.
            return Err(GridError::Format(format!("Variable '{}' has no values", var.name)));
        }
        if var.values.len() > u32::MAX as usize {
            return Err(GridError::Format(format!("Variable '{}' is too long", var.name)));
        }
    }

    let header_len = encode_header(vars, &vec![0; vars.len()]).len() as u64;
    let mut begins = Vec::with_capacity(vars.len());
    let mut offset = header_len;
    for var in vars {
        begins.push(offset);
        offset += var_size(var);
    }

    out.write_all(&encode_header(vars, &begins))?;
    for var in vars {
        for v in var.values {
            out.write_all(&v.to_be_bytes())?;
        }
    }
    out.flush()?;
    Ok(())
}


// --------------------------------------------------------------------------
// Decoding

#[derive(Debug, Clone, PartialEq)]
pub enum NcAttribute {
    Text(String),
    Numbers(Vec<f64>),
}

#[derive(Debug, Clone)]
pub struct NcVarHeader {
    pub name: String,
    pub dim_ids: Vec<usize>,
    pub attributes: Vec<(String, NcAttribute)>,
    pub nc_type: NcType,
    pub begin: u64,
}

/// In-memory classic-format dataset.
#[derive(Debug)]
pub struct NcDataset {
    pub dims: Vec<(String, usize)>,
    pub attributes: Vec<(String, NcAttribute)>,
    pub variables: Vec<NcVarHeader>,
    bytes: Vec<u8>,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.bytes.len()).ok_or_else(|| {
            GridError::Format(format!("Truncated NetCDF header at byte {}", self.pos))
        })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_be_bytes(arr))
    }

    fn padded(&mut self, len: usize) -> Result<&'a [u8]> {
        let data = self.take(len)?;
        self.take(pad4(len))?;
        Ok(data)
    }

    fn name(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let raw = self.padded(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| GridError::Format("NetCDF name is not valid UTF-8".to_string()))
    }

    /// Reads a list tag; returns the element count, or 0 for ABSENT.
    fn list(&mut self, expected: u32) -> Result<usize> {
        let tag = self.u32()?;
        let n = self.u32()? as usize;
        if tag == 0 && n == 0 {
            return Ok(0);
        }
        if tag != expected {
            return Err(GridError::Format(format!(
                "Expected NetCDF list tag {:#x}, found {:#x}",
                expected, tag
            )));
        }
        Ok(n)
    }

    fn attributes(&mut self) -> Result<Vec<(String, NcAttribute)>> {
        let n = self.list(NC_ATTRIBUTE)?;
        let mut attrs = Vec::with_capacity(n);
        for _ in 0..n {
            let name = self.name()?;
            let nc_type = NcType::from_tag(self.u32()?)?;
            let count = self.u32()? as usize;
            let len = count.checked_mul(nc_type.size()).ok_or_else(|| {
                GridError::Format(format!("Attribute '{}' is too large", name))
            })?;
            let raw = self.padded(len)?;
            let value = match nc_type {
                NcType::Char => NcAttribute::Text(
                    String::from_utf8_lossy(raw).trim_end_matches('\0').to_string(),
                ),
                _ => NcAttribute::Numbers(decode_numbers(raw, nc_type)),
            };
            attrs.push((name, value));
        }
        Ok(attrs)
    }
}

fn decode_numbers(raw: &[u8], nc_type: NcType) -> Vec<f64> {
    raw.chunks_exact(nc_type.size())
        .map(|c| match nc_type {
            NcType::Byte => c[0] as i8 as f64,
            NcType::Char => c[0] as f64,
            NcType::Short => i16::from_be_bytes([c[0], c[1]]) as f64,
            NcType::Int => i32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64,
            NcType::Float => f32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64,
            NcType::Double => {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(c);
                f64::from_be_bytes(arr)
            }
        })
        .collect()
}

impl NcDataset {
    /// Parse a classic (CDF-1) or 64-bit offset (CDF-2) file.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut cur = Cursor { bytes: &bytes, pos: 0 };
        let magic = cur.take(4)?;
        if &magic[..3] != MAGIC {
            return Err(GridError::Format("Not a NetCDF classic file".to_string()));
        }
        let version = magic[3];
        if version != VERSION_CLASSIC && version != VERSION_64BIT_OFFSET {
            return Err(GridError::Format(format!(
                "Unsupported NetCDF format version {}",
                version
            )));
        }
        let _numrecs = cur.u32()?;

        let n_dims = cur.list(NC_DIMENSION)?;
        let mut dims = Vec::with_capacity(n_dims);
        for _ in 0..n_dims {
            let name = cur.name()?;
            let len = cur.u32()? as usize;
            dims.push((name, len));
        }

        let attributes = cur.attributes()?;

        let n_vars = cur.list(NC_VARIABLE)?;
        let mut variables = Vec::with_capacity(n_vars);
        for _ in 0..n_vars {
            let name = cur.name()?;
            let rank = cur.u32()? as usize;
            let mut dim_ids = Vec::with_capacity(rank);
            for _ in 0..rank {
                let id = cur.u32()? as usize;
                match dims.get(id) {
                    None => {
                        return Err(GridError::Format(format!(
                            "Variable '{}' refers to missing dimension {}",
                            name, id
                        )))
                    }
                    Some((_, 0)) => {
                        return Err(GridError::Format(format!(
                            "Record variable '{}' is not supported",
                            name
                        )))
                    }
                    Some(_) => dim_ids.push(id),
                }
            }
            let var_attrs = cur.attributes()?;
            let nc_type = NcType::from_tag(cur.u32()?)?;
            let _vsize = cur.u32()?;
            let begin = if version == VERSION_CLASSIC { cur.u32()? as u64 } else { cur.u64()? };
            variables.push(NcVarHeader { name, dim_ids, attributes: var_attrs, nc_type, begin });
        }

        Ok(Self { dims, attributes, variables, bytes })
    }

    pub fn variable(&self, name: &str) -> Option<&NcVarHeader> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// All values of a numeric variable, flattened, converted to f64.
    pub fn values(&self, name: &str) -> Result<Vec<f64>> {
        let var = self
            .variable(name)
            .ok_or_else(|| GridError::Format(format!("Missing NetCDF variable '{}'", name)))?;
        if var.nc_type == NcType::Char {
            return Err(GridError::Format(format!("Variable '{}' is not numeric", name)));
        }
        let truncated = || GridError::Format(format!("Data of variable '{}' is truncated", name));
        let count = var
            .dim_ids
            .iter()
            .try_fold(1usize, |acc, &id| acc.checked_mul(self.dims[id].1))
            .ok_or_else(truncated)?;
        let start = usize::try_from(var.begin).map_err(|_| truncated())?;
        let end = count
            .checked_mul(var.nc_type.size())
            .and_then(|len| start.checked_add(len))
            .ok_or_else(truncated)?;
        let raw = self.bytes.get(start..end).ok_or_else(truncated)?;
        Ok(decode_numbers(raw, var.nc_type))
    }

    pub fn units(&self, name: &str) -> Option<&str> {
        self.variable(name)?.attributes.iter().find_map(|(k, v)| match (k.as_str(), v) {
            ("units", NcAttribute::Text(s)) => Some(s.as_str()),
            _ => None,
        })
    }
}
