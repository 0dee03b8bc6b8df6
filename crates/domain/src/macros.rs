//! Macro for label-style enums
//!
//! Outcome and field enums are logged, serialized into the execution summary
//! and parsed back from configuration. This macro gives each of them one
//! canonical lowercase label with matching `as_str`, `Display` and `FromStr`.
//!
//! # Example
//!
//! ```rust
//! use changecast_domain::impl_domain_labels;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Delivery {
//!     Queued,
//!     Sent,
//! }
//!
//! impl_domain_labels!(Delivery {
//!     Queued => "queued",
//!     Sent => "sent",
//! });
//!
//! assert_eq!(Delivery::Sent.as_str(), "sent");
//! assert_eq!("QUEUED".parse::<Delivery>().unwrap(), Delivery::Queued);
//! ```

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum
///
/// Parsing is case-insensitive and ignores surrounding whitespace; unknown
/// labels produce `ChangecastError::InvalidInput` naming the enum.
#[macro_export]
macro_rules! impl_domain_labels {
    ($enum_name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical lowercase label
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl ::core::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $enum_name {
            type Err = $crate::errors::ChangecastError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($label => ::core::result::Result::Ok(Self::$variant),)+
                    other => ::core::result::Result::Err(
                        $crate::errors::ChangecastError::InvalidInput(::std::format!(
                            "Invalid {}: {}",
                            stringify!($enum_name),
                            other
                        )),
                    ),
                }
            }
        }
    };
}
