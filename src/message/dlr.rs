//! Delivery report mask helpers.
//!
//! A short message asks the gateway for delivery reports by setting bits in
//! its `dlr_mask`. Device bits report the handset's outcome; SMSC bits report
//! the outcome at the message centre.

use super::PARAM_UNDEFINED;

/// Delivery report request mask.
///
/// # Examples
///
/// ```
/// use bearerbox::message::DlrMask;
///
/// let mask = DlrMask::SUCCESS | DlrMask::FAIL;
/// assert!(mask.is_enabled_device());
/// assert!(!mask.is_enabled_smsc());
/// assert!(!DlrMask::UNDEFINED.is_enabled());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DlrMask(i32);

impl DlrMask {
    /// No mask set on the message.
    pub const UNDEFINED: Self = Self(PARAM_UNDEFINED);
    /// No reports requested.
    pub const NOTHING: Self = Self(0x00);
    /// Delivered to the handset.
    pub const SUCCESS: Self = Self(0x01);
    /// Delivery to the handset failed.
    pub const FAIL: Self = Self(0x02);
    /// Queued for later delivery.
    pub const BUFFERED: Self = Self(0x04);
    /// Accepted by the message centre.
    pub const SMSC_SUCCESS: Self = Self(0x08);
    /// Rejected by the message centre.
    pub const SMSC_FAIL: Self = Self(0x10);

    const DEVICE: i32 = Self::SUCCESS.0 | Self::FAIL.0 | Self::BUFFERED.0;
    const SMSC: i32 = Self::SMSC_SUCCESS.0 | Self::SMSC_FAIL.0;

    /// Wrap a raw mask value.
    #[must_use]
    pub const fn from_bits(bits: i32) -> Self { Self(bits) }

    /// Return the raw mask value.
    #[must_use]
    pub const fn bits(self) -> i32 { self.0 }

    #[must_use]
    pub const fn is_defined(self) -> bool { self.0 != PARAM_UNDEFINED }

    const fn any(self, bits: i32) -> bool { self.is_defined() && self.0 & bits != 0 }

    /// Any report requested.
    #[must_use]
    pub const fn is_enabled(self) -> bool { self.any(Self::DEVICE | Self::SMSC) }

    /// A handset report requested.
    #[must_use]
    pub const fn is_enabled_device(self) -> bool { self.any(Self::DEVICE) }

    /// A message centre report requested.
    #[must_use]
    pub const fn is_enabled_smsc(self) -> bool { self.any(Self::SMSC) }

    /// The report is intermediate and a final one will follow.
    #[must_use]
    pub const fn is_not_final(self) -> bool {
        self.any(Self::BUFFERED.0 | Self::SMSC_SUCCESS.0)
    }

    #[must_use]
    pub const fn is_success_or_fail(self) -> bool { self.any(Self::SUCCESS.0 | Self::FAIL.0) }

    #[must_use]
    pub const fn is_success(self) -> bool { self.any(Self::SUCCESS.0) }

    #[must_use]
    pub const fn is_fail(self) -> bool { self.any(Self::FAIL.0) }

    #[must_use]
    pub const fn is_buffered(self) -> bool { self.any(Self::BUFFERED.0) }

    #[must_use]
    pub const fn is_smsc_success(self) -> bool { self.any(Self::SMSC_SUCCESS.0) }

    #[must_use]
    pub const fn is_smsc_fail(self) -> bool { self.any(Self::SMSC_FAIL.0) }
}

impl Default for DlrMask {
    fn default() -> Self { Self::UNDEFINED }
}

impl std::ops::BitOr for DlrMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        if !self.is_defined() {
            return rhs;
        }
        if !rhs.is_defined() {
            return self;
        }
        Self(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::DlrMask;

    #[rstest]
    #[case::buffered(DlrMask::BUFFERED, true)]
    #[case::smsc_success(DlrMask::SMSC_SUCCESS, true)]
    #[case::success(DlrMask::SUCCESS, false)]
    #[case::smsc_fail(DlrMask::SMSC_FAIL, false)]
    #[case::undefined(DlrMask::UNDEFINED, false)]
    fn not_final_reports(#[case] mask: DlrMask, #[case] expected: bool) {
        assert_eq!(mask.is_not_final(), expected);
    }

    #[test]
    fn undefined_mask_enables_nothing() {
        let mask = DlrMask::UNDEFINED;
        assert!(!mask.is_enabled());
        assert!(!mask.is_success());
        assert!(!mask.is_smsc_fail());
    }

    #[test]
    fn all_bits_set_enable_every_report() {
        let mask = DlrMask::from_bits(0x1f);
        assert!(mask.is_enabled_device());
        assert!(mask.is_enabled_smsc());
        assert!(mask.is_success_or_fail());
        assert!(mask.is_buffered());
        assert!(mask.is_smsc_success());
    }

    #[test]
    fn union_ignores_undefined_operand() {
        assert_eq!(DlrMask::UNDEFINED | DlrMask::FAIL, DlrMask::FAIL);
        assert_eq!((DlrMask::SUCCESS | DlrMask::SMSC_FAIL).bits(), 0x11);
    }
}
