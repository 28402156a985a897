//! Fixed-size struct (de)serialization for the archive container format
//! (§4.4). Adapted from the teacher's `bin.rs`: same `read_struct`/
//! `write_struct` pair over `bytemuck::Pod`, but without the teacher's
//! nightly `default impl` specialization — every fixed record below just
//! derives `Pod`/`Zeroable` and gets `read_struct`/`write_struct` directly,
//! since this crate has exactly one binary format to support (not a family
//! of BSA versions needing a blanket impl).

use std::io::{Read, Result, Write};

use bytemuck::Pod;

pub fn read_struct<S: Pod, R: Read>(mut reader: R) -> Result<S> {
    let mut val = S::zeroed();
    let slice = bytemuck::bytes_of_mut(&mut val);
    reader.read_exact(slice)?;
    Ok(val)
}

pub fn write_struct<S: Pod, W: Write>(val: &S, mut writer: W) -> Result<()> {
    let bytes = bytemuck::bytes_of(val);
    writer.write_all(bytes)
}

pub fn read_many<S: Pod, R: Read>(mut reader: R, num: usize) -> Result<Vec<S>> {
    let mut vals = Vec::with_capacity(num);
    for _ in 0..num {
        vals.push(read_struct(&mut reader)?);
    }
    Ok(vals)
}
