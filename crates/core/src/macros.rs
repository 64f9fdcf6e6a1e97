// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Macros shared by the workspace crates.
//!
//! [`simple_display!`] renders status-like enums as their wire names, and
//! [`builder!`] generates fixture builders for tests.

/// Implement `Display` by writing one fixed name per enum variant.
///
/// Variants with fields are written as `Variant(..)`.
///
/// ```ignore
/// crate::simple_display! {
///     ExecutionStatus {
///         Scheduled => "scheduled",
///         Running => "running",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($ignore:tt)* ))? => $str:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant $(( $($ignore)* ))? => $str, )+
                })
            }
        }
    };
}

/// Fixture builder for a plain struct, compiled only for tests and the
/// `test-support` feature.
///
/// Every field has a default. Fields listed under `into` get setters taking
/// `impl Into<T>`; fields under `set` take `T` as is. The target gains a
/// `builder()` constructor.
///
/// ```ignore
/// crate::builder! {
///     pub struct ArtifactBuilder => Artifact {
///         into { content_hash: String = "hash" }
///         set { manifest: PackageManifest = PackageManifest::named("a") }
///     }
/// }
/// ```
#[macro_export]
macro_rules! builder {
    (
        pub struct $builder:ident => $target:ident {
            $(into {
                $( $into_field:ident : $into_ty:ty = $into_default:expr ),* $(,)?
            })?
            $(set {
                $( $set_field:ident : $set_ty:ty = $set_default:expr ),* $(,)?
            })?
        }
    ) => {
        #[cfg(any(test, feature = "test-support"))]
        pub struct $builder {
            $($( $into_field: $into_ty, )*)?
            $($( $set_field: $set_ty, )*)?
        }

        #[cfg(any(test, feature = "test-support"))]
        impl Default for $builder {
            fn default() -> Self {
                Self {
                    $($( $into_field: $into_default.into(), )*)?
                    $($( $set_field: $set_default, )*)?
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $builder {
            $($(
                pub fn $into_field(self, value: impl Into<$into_ty>) -> Self {
                    Self { $into_field: value.into(), ..self }
                }
            )*)?

            $($(
                pub fn $set_field(self, value: $set_ty) -> Self {
                    Self { $set_field: value, ..self }
                }
            )*)?

            pub fn build(self) -> $target {
                $target {
                    $($( $into_field: self.$into_field, )*)?
                    $($( $set_field: self.$set_field, )*)?
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $target {
            /// Builder seeded with fixture defaults.
            pub fn builder() -> $builder {
                $builder::default()
            }
        }
    };
}
