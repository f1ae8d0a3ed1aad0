//! Persistence of [`PedersenParams`].
//!
//! Record layout: three little-endian `u32` byte counts for `g`, `h`, `p`,
//! followed by the big-endian magnitudes of `g`, `h`, `p` in that order.
//! Files are named `PED_<bits>.dat`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rand::{CryptoRng, RngCore};
use tracing::{info, warn};

use crate::arith::{from_be_bytes, to_be_bytes};
use crate::error::{Result, SubsetSumError};
use crate::pedersen::PedersenParams;

/// Refuse length fields beyond this; 64 KiB is far above any sane modulus.
const MAX_FIELD_BYTES: u32 = 1 << 16;

/// `PED_<bits>.dat`.
pub fn file_name(bits: u64) -> String {
    format!("PED_{}.dat", bits)
}

pub fn file_path(directory: &Path, bits: u64) -> PathBuf {
    directory.join(file_name(bits))
}

/// Serializes `params` into `writer`.
pub fn write_params<W: Write>(params: &PedersenParams, mut writer: W) -> Result<()> {
    let g = to_be_bytes(&params.g);
    let h = to_be_bytes(&params.h);
    let p = to_be_bytes(&params.p);

    for field in [&g, &h, &p] {
        writer.write_u32::<LittleEndian>(field.len() as u32)?;
    }
    for field in [&g, &h, &p] {
        writer.write_all(field)?;
    }
    writer.flush()?;
    Ok(())
}

/// Parses a record written by [`write_params`] and validates it.
pub fn read_params<R: Read>(mut reader: R) -> Result<PedersenParams> {
    let mut lengths = [0u32; 3];
    for length in lengths.iter_mut() {
        *length = reader.read_u32::<LittleEndian>()?;
        if *length == 0 || *length > MAX_FIELD_BYTES {
            return Err(SubsetSumError::ParameterFile(format!(
                "Field length {} out of range",
                length
            )));
        }
    }

    let mut fields = Vec::with_capacity(3);
    for &length in &lengths {
        let mut buf = vec![0u8; length as usize];
        reader.read_exact(&mut buf)?;
        fields.push(from_be_bytes(&buf));
    }

    let mut trailing = [0u8; 1];
    if reader.read(&mut trailing)? != 0 {
        return Err(SubsetSumError::ParameterFile(
            "Trailing bytes after parameter record".to_string(),
        ));
    }

    let p = fields.pop();
    let h = fields.pop();
    let g = fields.pop();
    match (g, h, p) {
        (Some(g), Some(h), Some(p)) => PedersenParams::from_parts(p, g, h),
        _ => Err(SubsetSumError::ParameterFile("Incomplete record".to_string())),
    }
}

/// Writes `params` to `PED_<bits>.dat` under `directory`.
pub fn save(params: &PedersenParams, directory: &Path) -> Result<PathBuf> {
    let path = file_path(directory, params.bits());
    let file = File::create(&path)?;
    write_params(params, BufWriter::new(file))?;
    info!(path = %path.display(), "Saved commitment parameters");
    Ok(path)
}

/// Reads `PED_<bits>.dat` from `directory`.
pub fn load(directory: &Path, bits: u64) -> Result<PedersenParams> {
    let path = file_path(directory, bits);
    let file = File::open(&path)?;
    let params = read_params(BufReader::new(file))?;
    if params.bits() != bits {
        return Err(SubsetSumError::ParameterFile(format!(
            "{} holds a {}-bit modulus",
            path.display(),
            params.bits()
        )));
    }
    Ok(params)
}

/// Loads the parameters for `bits` if a file exists, otherwise generates and
/// saves them. The result passes a commit/unveil self-test either way.
pub fn load_or_generate<R: RngCore + CryptoRng>(
    directory: &Path,
    bits: u64,
    safe_prime: bool,
    rng: &mut R,
) -> Result<PedersenParams> {
    let path = file_path(directory, bits);
    let params = if path.exists() {
        info!(path = %path.display(), "Loading commitment parameters, skipping generation");
        load(directory, bits)?
    } else {
        let params = PedersenParams::generate(bits, safe_prime, rng)?;
        if let Err(err) = save(&params, directory) {
            warn!(error = %err, "Could not persist commitment parameters");
        }
        params
    };
    params.self_test(rng)?;
    Ok(params)
}

/// Per-test directory under the system temp dir, removed on drop.
#[cfg(test)]
pub(crate) struct ScratchDir(PathBuf);

#[cfg(test)]
impl ScratchDir {
    pub(crate) fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("pss-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    pub(crate) fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn params() -> PedersenParams {
        PedersenParams::generate(64, true, &mut ChaCha20Rng::seed_from_u64(31)).unwrap()
    }

    #[test]
    fn test_record_layout() {
        let params = PedersenParams::from_parts(
            num_bigint::BigUint::from(0x0107u32),
            num_bigint::BigUint::from(2u32),
            num_bigint::BigUint::from(0x0103u32),
        )
        .unwrap();
        let mut buf = Vec::new();
        write_params(&params, &mut buf).unwrap();
        assert_eq!(
            buf,
            vec![1, 0, 0, 0, 2, 0, 0, 0, 2, 0, 0, 0, 2, 1, 3, 1, 7]
        );
        assert_eq!(read_params(buf.as_slice()).unwrap(), params);
    }

    #[test]
    fn test_read_rejects_malformed_records() {
        let mut buf = Vec::new();
        write_params(&params(), &mut buf).unwrap();

        assert!(read_params(&buf[..buf.len() - 1]).is_err());

        let mut extended = buf.clone();
        extended.push(0);
        assert!(matches!(read_params(extended.as_slice()), Err(SubsetSumError::ParameterFile(_))));

        let mut zero_len = buf.clone();
        zero_len[0..4].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(read_params(zero_len.as_slice()), Err(SubsetSumError::ParameterFile(_))));
    }

    #[test]
    fn test_save_and_load() {
        let scratch = ScratchDir::new("save-load");
        let dir = scratch.path();
        let params = params();
        let path = save(&params, dir).unwrap();
        assert!(path.ends_with("PED_64.dat"));
        assert_eq!(load(dir, 64).unwrap(), params);
        assert!(load(dir, 128).is_err());
    }

    #[test]
    fn test_load_or_generate_reuses_file() {
        let scratch = ScratchDir::new("load-or-generate");
        let dir = scratch.path();
        let mut rng = ChaCha20Rng::seed_from_u64(32);
        let first = load_or_generate(dir, 48, true, &mut rng).unwrap();
        assert!(file_path(dir, 48).exists());
        let second = load_or_generate(dir, 48, true, &mut rng).unwrap();
        assert_eq!(first, second);
    }
}
