// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use crate::DynResult;

/// Largest frequency representable in 10 BCD digits.
pub const MAX_CIV_FREQ_HZ: u64 = 9_999_999_999;

/// Encode frequency in Hz into 5 BCD bytes (1 Hz resolution) used by Icom CI-V.
///
/// The least significant digit pair comes first: 145.900 MHz encodes as
/// `00 00 90 45 01`.
pub fn encode_freq_bcd(freq_hz: u64) -> DynResult<[u8; 5]> {
    if freq_hz > MAX_CIV_FREQ_HZ {
        return Err("frequency out of range for CI-V BCD encoding".into());
    }

    let mut n = freq_hz;
    let mut out = [0u8; 5];
    for byte in out.iter_mut() {
        let low = (n % 10) as u8;
        n /= 10;
        let high = (n % 10) as u8;
        n /= 10;
        *byte = (high << 4) | low;
    }

    Ok(out)
}

/// Decode 5 CI-V BCD bytes (least significant pair first) into Hz.
pub fn decode_freq_bcd(bytes: [u8; 5]) -> DynResult<u64> {
    let mut value = 0u64;

    for b in bytes.iter().rev() {
        let high = (b >> 4) & 0x0F;
        let low = b & 0x0F;
        if high >= 10 || low >= 10 {
            return Err("invalid BCD digit in frequency".into());
        }

        value = value * 10 + u64::from(high);
        value = value * 10 + u64::from(low);
    }

    Ok(value)
}

/// Encode `0..=9999` as two BCD bytes, most significant pair first.
///
/// Used for levels (`0128`), CTCSS tones in tenths of Hz (`0670`) and, with
/// the bytes swapped by the caller, RIT offsets.
pub fn encode_bcd4(value: u16) -> DynResult<[u8; 2]> {
    if value > 9999 {
        return Err("value out of range for 4-digit BCD encoding".into());
    }
    let digits = [value / 1000, (value / 100) % 10, (value / 10) % 10, value % 10];
    Ok([
        ((digits[0] << 4) | digits[1]) as u8,
        ((digits[2] << 4) | digits[3]) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_2m_frequency() {
        let bytes = encode_freq_bcd(145_900_000).unwrap();
        assert_eq!(bytes, [0x00, 0x00, 0x90, 0x45, 0x01]);
    }

    #[test]
    fn test_encode_23cm_frequency() {
        let bytes = encode_freq_bcd(1_295_123_456).unwrap();
        assert_eq!(bytes, [0x56, 0x34, 0x12, 0x95, 0x12]);
    }

    #[test]
    fn test_decode_matches_encode_across_digit_range() {
        for hz in [0, 1, 9, 10, 435_000_050, 1_295_000_000, MAX_CIV_FREQ_HZ] {
            let bytes = encode_freq_bcd(hz).unwrap();
            assert_eq!(decode_freq_bcd(bytes).unwrap(), hz);
        }
    }

    #[test]
    fn test_encode_rejects_out_of_range() {
        assert!(encode_freq_bcd(MAX_CIV_FREQ_HZ + 1).is_err());
    }

    #[test]
    fn test_decode_rejects_invalid_digit() {
        assert!(decode_freq_bcd([0x00, 0x0A, 0x00, 0x00, 0x00]).is_err());
        assert!(decode_freq_bcd([0x00, 0x00, 0x00, 0xF0, 0x00]).is_err());
    }

    #[test]
    fn test_encode_bcd4() {
        assert_eq!(encode_bcd4(670).unwrap(), [0x06, 0x70]);
        assert_eq!(encode_bcd4(128).unwrap(), [0x01, 0x28]);
        assert_eq!(encode_bcd4(9999).unwrap(), [0x99, 0x99]);
        assert!(encode_bcd4(10_000).is_err());
    }
}
