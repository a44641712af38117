// Copyright 2025 rmodel developers
// SPDX-License-Identifier: Apache-2.0

/*!
Flows through the umbrella crate.

These tests validate:
- A multi-step flow passes data between neurons through memory
- A brain built from configuration uses the configured memory backend
- File-backed memory is removed on drop unless it is kept
*/

use std::time::Duration;

use rmodel::config::{MemoryBackend, RmodelConfig};
use rmodel::prelude::*;
use tempfile::tempdir;

fn greeting_flow() -> (Blueprint, String, String) {
    let mut bp = Blueprint::new();
    let first = bp.add_neuron_fn(|ctx| {
        let first = ctx
            .get_memory("first_name")?
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        ctx.set_memory("full_name", first)?;
        Ok(())
    });
    let last = bp.add_neuron_fn(|ctx| {
        let full = ctx
            .get_memory("full_name")?
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| ProcessorError::msg("full_name missing"))?;
        let last = ctx
            .get_memory("last_name")?
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        ctx.set_memory("full_name", format!("{} {}", full, last))?;
        Ok(())
    });
    bp.add_entry_link_to(&first).unwrap();
    bp.add_link(&first, &last).unwrap();
    bp.add_end_link_from(&last).unwrap();
    (bp, first, last)
}

#[test]
fn test_memory_carries_data_between_neurons() {
    let (bp, first, last) = greeting_flow();
    let brain = Brain::new(&bp).unwrap();

    brain
        .entry_with_memory([("first_name", "Clay"), ("last_name", "Zhang")])
        .unwrap();
    assert!(brain.wait_timeout(Duration::from_secs(10)));

    let full = brain.get_memory("full_name").unwrap().unwrap();
    assert_eq!(full.as_str(), Some("Clay Zhang"));
    for id in [&first, &last] {
        assert_eq!(brain.neuron_status(id).unwrap().counters.succeeded, 1);
    }
}

#[test]
fn test_file_memory_is_kept_when_requested() {
    let dir = tempdir().unwrap();
    let mut config = RmodelConfig::default();
    config.memory.backend = MemoryBackend::File;
    config.memory.data_dir = dir.path().to_path_buf();
    config.memory.keep_memory = true;

    let (bp, _, _) = greeting_flow();
    let brain = Brain::from_config(&bp, &config).unwrap();
    let path = dir.path().join(format!("{}.json", brain.id()));

    brain
        .entry_with_memory([("first_name", "Clay"), ("last_name", "Zhang")])
        .unwrap();
    assert!(brain.wait_timeout(Duration::from_secs(10)));
    assert!(path.exists());
    drop(brain);

    let snapshot = std::fs::read_to_string(&path).unwrap();
    assert!(snapshot.contains("Clay Zhang"));
}

#[test]
fn test_file_memory_is_removed_on_drop() {
    let dir = tempdir().unwrap();
    let mut config = RmodelConfig::default();
    config.memory.backend = MemoryBackend::File;
    config.memory.data_dir = dir.path().to_path_buf();

    let (bp, _, _) = greeting_flow();
    let brain = Brain::from_config(&bp, &config).unwrap();
    let path = dir.path().join(format!("{}.json", brain.id()));
    brain.set_memory("first_name", "Clay").unwrap();
    assert!(path.exists());

    drop(brain);
    assert!(!path.exists());
}
