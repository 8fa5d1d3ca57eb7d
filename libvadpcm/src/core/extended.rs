//! 80-bit IEEE 754 extended precision numbers, as used for the sample rate in
//! AIFF `COMM` chunks.

const EXPONENT_BIAS: i32 = 16383;
const EXPONENT_MAX: u16 = 0x7fff;
const INTEGER_BIT: u64 = 1 << 63;

/// An 80-bit extended float: sign and 15-bit exponent, then a 64-bit
/// significand with an explicit integer bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extended {
    pub sign_exponent: u16,
    pub fraction: u64,
}

impl Extended {
    /// read from the 10-byte big-endian encoding
    pub fn from_be_bytes(bytes: [u8; 10]) -> Self {
        let mut fraction = [0u8; 8];
        fraction.copy_from_slice(&bytes[2..]);
        Extended {
            sign_exponent: u16::from_be_bytes([bytes[0], bytes[1]]),
            fraction: u64::from_be_bytes(fraction),
        }
    }

    /// 10-byte big-endian encoding
    pub fn to_be_bytes(self) -> [u8; 10] {
        let mut out = [0u8; 10];
        out[..2].copy_from_slice(&self.sign_exponent.to_be_bytes());
        out[2..].copy_from_slice(&self.fraction.to_be_bytes());
        out
    }

    pub fn from_u32(value: u32) -> Self {
        Self::from_f64(value as f64)
    }

    pub fn from_f64(value: f64) -> Self {
        let sign: u16 = if value.is_sign_negative() { 0x8000 } else { 0 };
        if value.is_nan() {
            return Extended {
                sign_exponent: sign | EXPONENT_MAX,
                fraction: INTEGER_BIT | (1 << 62),
            };
        }
        if value.is_infinite() {
            return Extended {
                sign_exponent: sign | EXPONENT_MAX,
                fraction: INTEGER_BIT,
            };
        }
        if value == 0.0 {
            return Extended {
                sign_exponent: sign,
                fraction: 0,
            };
        }

        let bits = value.to_bits();
        let biased = ((bits >> 52) & 0x7ff) as i32;
        let mantissa = bits & ((1 << 52) - 1);
        let (exponent, fraction) = if biased == 0 {
            // subnormal double, normalize it
            let lz = mantissa.leading_zeros() as i32;
            (-1011 - lz, mantissa << lz)
        } else {
            (biased - 1023, INTEGER_BIT | (mantissa << 11))
        };
        Extended {
            sign_exponent: sign | (exponent + EXPONENT_BIAS) as u16,
            fraction,
        }
    }

    /// Convert to f64. Precision beyond 53 bits is lost; values outside the
    /// f64 range become infinity or zero.
    pub fn to_f64(self) -> f64 {
        let exponent = self.sign_exponent & EXPONENT_MAX;
        let negative = self.sign_exponent & 0x8000 != 0;

        if exponent == EXPONENT_MAX {
            // the integer bit is ignored for infinities
            if self.fraction << 1 == 0 {
                return if negative {
                    f64::NEG_INFINITY
                } else {
                    f64::INFINITY
                };
            }
            return f64::NAN;
        }
        if self.fraction == 0 {
            return 0.0;
        }

        let e = exponent as i32 - EXPONENT_BIAS - 63;
        // two steps so the scale factor itself does not overflow
        let half = e / 2;
        let value = self.fraction as f64 * 2f64.powi(half) * 2f64.powi(e - half);
        if negative {
            -value
        } else {
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_sample_rates() {
        for rate in [8000u32, 22050, 32000, 44100, 48000, 96000] {
            let ext = Extended::from_u32(rate);
            assert_eq!(ext.to_f64(), rate as f64);
        }
    }

    #[test]
    fn test_known_encoding() {
        // 44100 Hz as written by most AIFF tools
        let bytes = [0x40, 0x0e, 0xac, 0x44, 0, 0, 0, 0, 0, 0];
        let ext = Extended::from_be_bytes(bytes);
        assert_eq!(ext.to_f64(), 44100.0);
        assert_eq!(Extended::from_u32(44100).to_be_bytes(), bytes);
    }

    #[test]
    fn test_special_values() {
        assert_eq!(Extended::from_u32(0).to_f64(), 0.0);
        assert_eq!(Extended::from_f64(f64::INFINITY).to_f64(), f64::INFINITY);
        assert_eq!(
            Extended::from_f64(f64::NEG_INFINITY).to_f64(),
            f64::NEG_INFINITY
        );
        assert!(Extended::from_f64(f64::NAN).to_f64().is_nan());
        assert_eq!(Extended::from_f64(-0.5).to_f64(), -0.5);
    }

    #[test]
    fn test_subnormal() {
        let tiny = f64::from_bits(1);
        assert_eq!(Extended::from_f64(tiny).to_f64(), tiny);
    }
}
