//! Error construction macros.
//!
//! Every form starts with an [`ErrorKind`](crate::error::ErrorKind) and a static description:
//!
//! - `etl_error!(kind, "description")`
//! - `etl_error!(kind, "description", detail)`, where `detail` implements [`std::fmt::Display`]
//! - `etl_error!(kind, "description", detail, source: err)`, which also keeps `err` as the source
//!
//! [`bail!`] accepts the same forms and returns the error from the enclosing function.

/// Builds an [`EtlError`](crate::error::EtlError) located at the call site.
#[macro_export]
macro_rules! etl_error {
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr $(,)?) => {
        $crate::etl_error!($kind, $desc, $detail).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr $(,)?) => {
        $crate::error::EtlError::from((
            $kind,
            $desc,
            ::std::string::ToString::to_string(&$detail),
        ))
    };
    ($kind:expr, $desc:expr $(,)?) => {
        $crate::error::EtlError::from(($kind, $desc))
    };
}

/// Returns an [`EtlError`](crate::error::EtlError) built by [`etl_error!`] from the enclosing
/// function.
#[macro_export]
macro_rules! bail {
    ($($args:tt)+) => {
        return ::core::result::Result::Err($crate::etl_error!($($args)+))
    };
}
