//! Binary last-state file.
//!
//! Holds the step and every active cell's type, positions and velocities,
//! enough to restart a run. Each save keeps the previous file next to the
//! new one with a `.previous` suffix.

use crate::error::{IoError, Result};
use rkyv::de::deserializers::SharedDeserializeMap;
use rkyv::ser::serializers::AllocSerializer;
use rkyv::ser::Serializer;
use rkyv::Deserialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use superboids_data::{InitialCell, InitialState, PopulationSnapshot};

/// Restartable state of a snapshot.
#[must_use]
pub fn state_of(snapshot: &PopulationSnapshot) -> InitialState {
    InitialState {
        start_step: snapshot.step,
        cells: snapshot
            .cells
            .iter()
            .map(|c| InitialCell {
                cell_type: c.cell_type,
                particles: c.particles.clone(),
            })
            .collect(),
    }
}

/// Where the replaced file goes on the next save.
#[must_use]
pub fn previous_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".previous");
    path.with_file_name(name)
}

pub fn encode(state: &InitialState) -> Result<Vec<u8>> {
    let mut serializer = AllocSerializer::<4096>::default();
    serializer
        .serialize_value(state)
        .map_err(|e| IoError::archive(format!("{e:?}")))?;
    Ok(serializer.into_serializer().into_inner().into_vec())
}

pub fn decode(bytes: &[u8]) -> Result<InitialState> {
    let mut aligned = rkyv::AlignedVec::with_capacity(bytes.len());
    aligned.extend_from_slice(bytes);
    let archived = rkyv::check_archived_root::<InitialState>(&aligned)
        .map_err(|e| IoError::archive(format!("{e:?}")))?;
    let mut deserializer = SharedDeserializeMap::default();
    archived
        .deserialize(&mut deserializer)
        .map_err(|e| IoError::archive(format!("{e:?}")))
}

/// Writes `state` to `path`, first moving an existing file aside.
pub fn save_last_state<P: AsRef<Path>>(state: &InitialState, path: P) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode(state)?;
    if path.exists() {
        std::fs::rename(path, previous_path(path))?;
    }
    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Reads a last-state file written by [`save_last_state`].
pub fn load_last_state<P: AsRef<Path>>(path: P) -> Result<InitialState> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IoError::missing(path.display().to_string()));
    }
    let bytes = std::fs::read(path)?;
    let state = decode(&bytes).map_err(|e| e.with_context(format!("reading {}", path.display())))?;
    if let Some(first) = state.cells.first() {
        let n = first.particles.len();
        if state.cells.iter().any(|c| c.particles.len() != n) {
            return Err(IoError::invalid_state("cells with different particle counts"));
        }
    }
    Ok(state)
}
