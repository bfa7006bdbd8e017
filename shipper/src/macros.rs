//! Macros for shipper error handling.
//!
//! Provides convenience macros for creating and returning
//! [`crate::error::ShipperError`] instances with reduced boilerplate for
//! common error handling patterns.

/// Creates a [`crate::error::ShipperError`] from error kind and description.
///
/// This macro provides a concise way to create [`crate::error::ShipperError`]
/// instances with static descriptions, optional dynamic detail, and optional
/// source errors.
#[macro_export]
macro_rules! shipper_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::ShipperError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::ShipperError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::ShipperError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::ShipperError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Creates and returns a [`crate::error::ShipperError`] from the current function.
///
/// This macro combines error creation with early return, reducing
/// boilerplate when handling error conditions that should immediately
/// terminate execution. Supports the same optional detail and source
/// arguments as [`shipper_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return ::core::result::Result::Err($crate::shipper_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::shipper_error!($kind, $desc, source: $source))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::shipper_error!($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::shipper_error!(
            $kind,
            $desc,
            $detail,
            source: $source
        ))
    };
}
