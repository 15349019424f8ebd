//! Preset limits
//!
//! The dispenser display shows six digits of amount and volume, so a preset
//! must stay inside what the display can count up to at the given price.
//! The manager's start operations do not enforce these; the operator
//! console checks them before starting a transaction.

/// Largest volume preset (900 L in centiliters)
pub const MAX_PRESET_VOLUME_CL: u32 = 90_000;

/// Largest amount preset (minor units)
pub const MAX_PRESET_AMOUNT: u32 = 999_900;

/// Preset rejection reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PresetError {
    /// Preset of zero
    Zero,
    /// Preset above what the display can show at this price
    ExceedsLimit { limit: u32 },
}

/// Largest volume preset at `price` per liter
pub fn max_volume_for(price: u32) -> u32 {
    if price == 0 {
        return MAX_PRESET_VOLUME_CL;
    }
    let by_amount = u64::from(MAX_PRESET_AMOUNT) * 100 / u64::from(price);
    by_amount.min(u64::from(MAX_PRESET_VOLUME_CL)) as u32
}

/// Largest amount preset at `price` per liter
pub fn max_amount_for(price: u32) -> u32 {
    let by_volume = u64::from(MAX_PRESET_VOLUME_CL) * u64::from(price) / 100;
    by_volume.min(u64::from(MAX_PRESET_AMOUNT)) as u32
}

/// Check a volume preset (centiliters)
pub fn check_volume_preset(volume_cl: u32, price: u32) -> Result<(), PresetError> {
    check(volume_cl, max_volume_for(price))
}

/// Check an amount preset (minor units)
pub fn check_amount_preset(amount: u32, price: u32) -> Result<(), PresetError> {
    check(amount, max_amount_for(price))
}

fn check(value: u32, limit: u32) -> Result<(), PresetError> {
    if value == 0 {
        Err(PresetError::Zero)
    } else if value > limit {
        Err(PresetError::ExceedsLimit { limit })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_limit_at_default_price() {
        // 999900 * 100 / 1100 = 90900, capped by the volume display
        assert_eq!(max_volume_for(1100), MAX_PRESET_VOLUME_CL);
        assert_eq!(MAX_PRESET_VOLUME_CL / 100, 900);
        // 999900 * 100 / 2000 = 49995
        assert_eq!(max_volume_for(2000), 49_995);
    }

    #[test]
    fn test_amount_limit() {
        assert_eq!(max_amount_for(1100), 990_000);
        assert_eq!(max_amount_for(9999), MAX_PRESET_AMOUNT);
        assert_eq!(max_amount_for(0), 0);
    }

    #[test]
    fn test_zero_price_volume() {
        assert_eq!(max_volume_for(0), MAX_PRESET_VOLUME_CL);
    }

    #[test]
    fn test_check_presets() {
        assert_eq!(check_volume_preset(0, 1100), Err(PresetError::Zero));
        assert_eq!(check_volume_preset(5000, 1100), Ok(()));
        assert_eq!(
            check_volume_preset(60_000, 2000),
            Err(PresetError::ExceedsLimit { limit: 49_995 })
        );
        assert_eq!(check_amount_preset(990_000, 1100), Ok(()));
        assert_eq!(
            check_amount_preset(990_001, 1100),
            Err(PresetError::ExceedsLimit { limit: 990_000 })
        );
    }
}
