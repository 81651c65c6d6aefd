// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

#[cfg(test)]
mod tests {
    use overlay_plane::coefficients::update_coefficients;
    use overlay_plane::coefficients::MAX_TAPS;
    use overlay_plane::coefficients::N_HORIZ_Y_TAPS;
    use overlay_plane::coefficients::N_PHASES;

    fn cutoffs() -> impl Iterator<Item = f64> {
        (0..=200).map(|step| 1.0 + step as f64 * 0.01)
    }

    #[test]
    fn phases_sum_to_one() {
        for taps in 1..=MAX_TAPS {
            for (is_horizontal, is_luma) in
                [(true, true), (true, false), (false, true), (false, false)]
            {
                for cutoff in cutoffs() {
                    let coeffs =
                        update_coefficients(taps, cutoff, is_horizontal, is_luma).unwrap();
                    for phase in 0..N_PHASES {
                        assert_eq!(
                            coeffs.phase_sum(phase),
                            1.0,
                            "taps {} cutoff {} horizontal {} luma {} phase {}",
                            taps,
                            cutoff,
                            is_horizontal,
                            is_luma,
                            phase
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn deterministic() {
        for cutoff in [1.0, 1.5, 2.25, 3.0] {
            assert_eq!(
                update_coefficients(N_HORIZ_Y_TAPS, cutoff, true, true).unwrap(),
                update_coefficients(N_HORIZ_Y_TAPS, cutoff, true, true).unwrap()
            );
        }
    }

    #[test]
    fn register_fields_in_range() {
        let coeffs = update_coefficients(N_HORIZ_Y_TAPS, 1.5, true, true).unwrap();
        assert_eq!(coeffs.iter().count(), N_HORIZ_Y_TAPS * N_PHASES);
        for coeff in coeffs.iter() {
            assert!(coeff.sign <= 1);
            assert!(coeff.exponent <= 3);
            assert!(coeff.mantissa < 1 << 12);
            assert_eq!(coeff.to_register() >> 15, coeff.sign);
        }
    }
}
