// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod bcd;

pub use bcd::{decode_freq_bcd, encode_bcd4, encode_freq_bcd, MAX_CIV_FREQ_HZ};
