//! Tests for the KD-partition tree.
//!
//! Unit tests are organized into per-concern modules; `helpers` holds the
//! shared dataset builders, brute-force oracles, and the recording sink.

mod helpers;

mod edge_cases;
