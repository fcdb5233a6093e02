// Copyright 2024 XiEmu Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

/// Full deflection of a stick axis.
pub const AXIS_MAX: i16 = 32767;

/// Converts value in [-1, 1] to stick axis value, rounding to nearest.
pub fn axis_from_unit(val: f32) -> i16 {
    if val.is_nan() {
        return 0;
    }

    let scaled = (val.clamp(-1.0, 1.0) * f32::from(AXIS_MAX)).round();
    scaled as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_axis_from_unit() {
        assert_eq!(axis_from_unit(0.0), 0);
        assert_eq!(axis_from_unit(0.5), 16384);
        assert_eq!(axis_from_unit(-0.5), -16384);
        assert_eq!(axis_from_unit(1.0), 32767);
        assert_eq!(axis_from_unit(-1.0), -32767);
        assert_eq!(axis_from_unit(7.0), 32767);
        assert_eq!(axis_from_unit(f32::NAN), 0);
    }
}
