//! Heap sizing for the server JVM.

use std::fs;

use tracing::info;

use crate::{AppError, Result};

/// Source of the available-memory figure on Linux.
pub const MEMINFO_PATH: &str = "/proc/meminfo";

/// Share of available memory claimed for the heap when no override is set.
pub const CLAIM_PERCENT: u64 = 80;

/// Read `MemAvailable` from [`MEMINFO_PATH`], in MiB.
///
/// # Errors
///
/// Returns `AppError::Launch` if the file cannot be read or parsed.
pub fn available_mib() -> Result<u64> {
    let meminfo = fs::read_to_string(MEMINFO_PATH)
        .map_err(|err| AppError::Launch(format!("cannot read {MEMINFO_PATH}: {err}")))?;
    parse_available_mib(&meminfo)
}

/// Extract `MemAvailable` from the contents of `/proc/meminfo`, in MiB.
///
/// # Errors
///
/// Returns `AppError::Launch` if the entry is missing, is not expressed in
/// `kB`, or is not a number.
pub fn parse_available_mib(meminfo: &str) -> Result<u64> {
    let value = meminfo
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim() == "MemAvailable")
        .map(|(_, value)| value.trim())
        .ok_or_else(|| AppError::Launch("MemAvailable missing from meminfo".into()))?;

    let (number, unit) = value
        .split_once(' ')
        .map_or((value, ""), |(number, unit)| (number, unit.trim()));

    if unit != "kB" {
        return Err(AppError::Launch(format!(
            "unexpected MemAvailable unit: {unit:?}"
        )));
    }

    let kib: u64 = number
        .parse()
        .map_err(|err| AppError::Launch(format!("invalid MemAvailable value {number:?}: {err}")))?;

    Ok(kib / 1024)
}

/// Heap size claimed out of `available_mib`.
#[must_use]
pub fn claim_mib(available_mib: u64) -> u64 {
    available_mib * CLAIM_PERCENT / 100
}

/// Heap size for this launch: the override when set, otherwise
/// [`CLAIM_PERCENT`] of available memory.
///
/// # Errors
///
/// Returns `AppError::Launch` if available memory cannot be determined or
/// the computed claim is zero.
pub fn resolve_memory_mib(memory_override: Option<u64>) -> Result<u64> {
    if let Some(mib) = memory_override {
        info!(memory_mib = mib, "using configured heap size");
        return Ok(mib);
    }

    let available = available_mib()?;
    let claim = claim_mib(available);
    if claim == 0 {
        return Err(AppError::Launch(format!(
            "not enough memory available to launch: {available} MiB"
        )));
    }

    info!(available_mib = available, memory_mib = claim, "computed heap size");
    Ok(claim)
}
