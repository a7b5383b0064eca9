// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod controller;
pub mod record;
pub mod session;

pub use record::{load_satellites_file, parse_satellites, SatelliteFileError};
